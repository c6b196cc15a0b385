//! Badge rules
//!
//! The rules only decide. Loading the data and writing the award is the
//! caller's job; awards are unique per (user, group, badge type, month).

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::balances::BalanceSheet;
use crate::error::LedgerError;
use crate::expense::{ExpenseEntry, RemainderPolicy};
use crate::money::Cents;

/// Days after an expense during which its payer can earn Table Hero
pub const TABLE_HERO_WINDOW_DAYS: i64 = 7;

/// Share of the owed amount that must be collected for Table Hero
pub const TABLE_HERO_COLLECTION_RATE: f64 = 0.9;

/// Hours after an expense within which a payment counts as quick
pub const QUICK_PAY_WINDOW_HOURS: i64 = 24;

/// Days after an expense within which the whole group must settle
pub const EVEN_STEVEN_WINDOW_DAYS: i64 = 3;

/// Closed set of badges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    /// Payer collected most of what they were owed within a week
    TableHero,
    /// Debtor paid within a day of the expense
    PayItForward,
    /// Whole group settled within three days
    EvenSteven,
}

impl BadgeType {
    pub const ALL: [BadgeType; 3] = [
        BadgeType::TableHero,
        BadgeType::PayItForward,
        BadgeType::EvenSteven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::TableHero => "table_hero",
            BadgeType::PayItForward => "pay_it_forward",
            BadgeType::EvenSteven => "even_steven",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeType::ALL
            .into_iter()
            .find(|badge| badge.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownBadgeType(s.to_string()))
    }
}

/// Calendar month an award belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AwardPeriod {
    pub year: i32,
    pub month: u32,
}

impl AwardPeriod {
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }
}

/// True while `now` is no later than `window` after `since`
pub fn within_window(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(since) <= window
}

/// Elapsed days rounded to one decimal, for badge metadata
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = now.signed_duration_since(since).num_seconds() as f64 / 86_400.0;
    (days * 10.0).round() / 10.0
}

/// Pay It Forward: paid within 24 hours of the originating expense
pub fn is_quick_pay(expense_created_at: DateTime<Utc>, paid_at: DateTime<Utc>) -> bool {
    within_window(
        expense_created_at,
        paid_at,
        Duration::hours(QUICK_PAY_WINDOW_HOURS),
    )
}

/// How much a creditor was owed and how much came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionProgress {
    pub owed_cents: Cents,
    pub collected_cents: Cents,
}

impl CollectionProgress {
    /// Owed amount is what others owe the payer: the total minus the
    /// payer's own share of each expense.
    pub fn for_payer<'a>(
        payer_id: &str,
        expenses: impl IntoIterator<Item = &'a ExpenseEntry>,
        collected_cents: Cents,
        policy: RemainderPolicy,
    ) -> Self {
        let owed_cents = expenses
            .into_iter()
            .filter(|e| e.payer_id == payer_id)
            .map(|e| e.amount_cents - e.share_of(payer_id, policy))
            .sum();

        Self {
            owed_cents,
            collected_cents,
        }
    }

    pub fn rate(&self) -> f64 {
        if self.owed_cents > 0 {
            self.collected_cents as f64 / self.owed_cents as f64
        } else {
            0.0
        }
    }

    pub fn percent(&self) -> i64 {
        (self.rate() * 100.0).round() as i64
    }

    pub fn qualifies_for_table_hero(&self) -> bool {
        self.owed_cents > 0 && self.rate() >= TABLE_HERO_COLLECTION_RATE
    }
}

/// Even Steven: every net balance, after paid payments, is rounding noise
pub fn group_fully_settled(sheet: &BalanceSheet) -> bool {
    sheet.is_settled()
}

/// Rolling payment counters kept per user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentStreak {
    pub payments_on_time: i32,
    pub consecutive_quick_pays: i32,
    pub total_settled_cents: Cents,
}

impl PaymentStreak {
    /// Counters after one more payment; a slow payment breaks the streak
    pub fn record(self, quick: bool, amount_cents: Cents) -> Self {
        Self {
            payments_on_time: self.payments_on_time + i32::from(quick),
            consecutive_quick_pays: if quick { self.consecutive_quick_pays + 1 } else { 0 },
            total_settled_cents: self.total_settled_cents + amount_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_badge_type_round_trip() {
        for badge in BadgeType::ALL {
            assert_eq!(badge.as_str().parse::<BadgeType>(), Ok(badge));
        }
        assert!("gold_star".parse::<BadgeType>().is_err());
        assert_eq!(
            serde_json::to_string(&BadgeType::PayItForward).unwrap(),
            "\"pay_it_forward\""
        );
    }

    #[test]
    fn test_award_period() {
        let period = AwardPeriod::containing(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(period, AwardPeriod { year: 2026, month: 12 });
    }

    #[test]
    fn test_quick_pay_window() {
        assert!(is_quick_pay(at(1, 10), at(2, 10)));
        assert!(!is_quick_pay(at(1, 10), at(2, 11)));
    }

    #[test]
    fn test_table_hero_threshold() {
        let expenses = vec![
            ExpenseEntry::simple("p1", 6000, &["p1", "p2", "p3"]),
            ExpenseEntry::simple("p2", 900, &["p1", "p2", "p3"]),
        ];

        let progress = CollectionProgress::for_payer("p1", &expenses, 3600, RemainderPolicy::Payer);
        assert_eq!(progress.owed_cents, 4000);
        assert_eq!(progress.percent(), 90);
        assert!(progress.qualifies_for_table_hero());

        let short = CollectionProgress::for_payer("p1", &expenses, 3599, RemainderPolicy::Payer);
        assert!(!short.qualifies_for_table_hero());

        let nothing_owed = CollectionProgress::for_payer("p9", &expenses, 0, RemainderPolicy::Payer);
        assert!(!nothing_owed.qualifies_for_table_hero());
    }

    #[test]
    fn test_payer_outside_participants_is_owed_everything() {
        let expense = ExpenseEntry::simple("host", 3000, &["a", "b"]);
        let progress = CollectionProgress::for_payer("host", [&expense], 0, RemainderPolicy::Payer);
        assert_eq!(progress.owed_cents, 3000);
    }

    #[test]
    fn test_windows() {
        let window = Duration::days(TABLE_HERO_WINDOW_DAYS);
        assert!(within_window(at(1, 0), at(8, 0), window));
        assert!(!within_window(at(1, 0), at(8, 1), window));
        assert_eq!(elapsed_days(at(1, 0), at(2, 12)), 1.5);
    }

    #[test]
    fn test_group_fully_settled() {
        let expense = ExpenseEntry::simple("p1", 6000, &["p1", "p2", "p3"]);
        let mut sheet = BalanceSheet::from_expenses([&expense], RemainderPolicy::Payer);
        sheet.apply_payment("p2", "p1", 2000);
        assert!(!group_fully_settled(&sheet));
        sheet.apply_payment("p3", "p1", 2000);
        assert!(group_fully_settled(&sheet));
    }

    #[test]
    fn test_streak() {
        let streak = PaymentStreak::default()
            .record(true, 100)
            .record(true, 200);
        assert_eq!(streak.consecutive_quick_pays, 2);
        assert_eq!(streak.payments_on_time, 2);

        let broken = streak.record(false, 50);
        assert_eq!(broken.consecutive_quick_pays, 0);
        assert_eq!(broken.payments_on_time, 2);
        assert_eq!(broken.total_settled_cents, 350);
    }
}
