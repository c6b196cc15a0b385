//! Payment reminder models

use chrono::{DateTime, Utc};
use ledger::Cents;
use serde::Serialize;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_EXHAUSTED: &str = "exhausted";

/// A scheduled nudge for an unpaid payment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub group_id: String,
    pub group_name: String,
    pub debtor_user_id: String,
    pub debtor_user_name: String,
    pub creditor_user_name: String,
    pub amount_cents: Cents,
    pub reminder_count: i32,
    pub next_reminder_at: DateTime<Utc>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub group_id: String,
    pub group_name: String,
    pub debtor_user_id: String,
    pub debtor_user_name: String,
    pub creditor_user_name: String,
    pub amount_cents: Cents,
    pub next_reminder_at: DateTime<Utc>,
}
