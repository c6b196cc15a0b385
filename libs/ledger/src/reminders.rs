//! Payment reminder cadence and wording

use chrono::{DateTime, Duration, Timelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::money::{Cents, format_major};

/// Hours between a payment request and its first reminder
pub const FIRST_REMINDER_DELAY_HOURS: i64 = 24;

/// Hours of the day (UTC) during which no reminder is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start_hour: 22,
            end_hour: 8,
        }
    }
}

impl QuietHours {
    /// Handles ranges that wrap past midnight
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let hour = at.hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Ids of synthetic participants (free-text names) cannot receive messages
pub fn is_deliverable(user_id: &str) -> bool {
    static USER_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USER_ID_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Failed to compile user id regex"));
    regex.is_match(user_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub subject: String,
    pub text: String,
}

/// Render the reminder for the given number of reminders already sent
pub fn render(
    reminders_sent: i32,
    group_name: &str,
    amount: Cents,
    creditor_name: &str,
) -> ReminderMessage {
    let amount = format!("${}", format_major(amount));
    match reminders_sent {
        0 => ReminderMessage {
            subject: format!("Payment reminder - {}", group_name),
            text: format!(
                "hey, quick note\n\nGroup: {}\nAmount: {} to {}\n\nStill open from last night. You're doing great btw",
                group_name, amount, creditor_name
            ),
        },
        1 => ReminderMessage {
            subject: format!("Friendly checkpoint - {}", group_name),
            text: format!(
                "friendly checkpoint\n\nGroup: {}\n{} to {}\n\nStill seeing it open.",
                group_name, amount, creditor_name
            ),
        },
        _ => ReminderMessage {
            subject: format!("Final nudge - {}", group_name),
            text: format!(
                "final nudge, promise\n\nGroup: {}\n{} to {}\n\nIf there's an issue, reply 'help'. Otherwise, one tap and we're square.",
                group_name, amount, creditor_name
            ),
        },
    }
}

/// What happens to a reminder after one more message went out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextReminder {
    At(DateTime<Utc>),
    Exhausted,
}

pub fn next_reminder(reminders_sent: i32, now: DateTime<Utc>) -> NextReminder {
    match reminders_sent {
        1 => NextReminder::At(now + Duration::hours(24)),
        2 => NextReminder::At(now + Duration::days(5)),
        _ => NextReminder::Exhausted,
    }
}
