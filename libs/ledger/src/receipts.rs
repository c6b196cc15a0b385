//! Pending receipt lifetime and review thresholds

use chrono::{DateTime, Duration, Utc};

use crate::money::Cents;

/// Pending receipts live for five minutes after creation
pub const PENDING_RECEIPT_TTL_SECS: i64 = 5 * 60;

/// Results below this confidence must be confirmed by the user
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Totals above this many major units are flagged for manual review
pub const SUSPICIOUS_AMOUNT_MAJOR: i64 = 5000;

/// Totals above this many major units are treated as misreads
pub const EXTREME_AMOUNT_MAJOR: f64 = 99_999.0;

pub fn expires_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::seconds(PENDING_RECEIPT_TTL_SECS)
}

/// A pending receipt is usable strictly before its expiry instant
pub fn is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

/// Thresholds used to decide whether an AI result needs a human
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewPolicy {
    pub confidence_threshold: f64,
    pub suspicious_total_cents: Cents,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            suspicious_total_cents: SUSPICIOUS_AMOUNT_MAJOR * 100,
        }
    }
}

impl ReviewPolicy {
    pub fn needs_confirmation(&self, confidence: f64) -> bool {
        confidence < self.confidence_threshold
    }

    pub fn is_suspicious(&self, total_cents: Option<Cents>) -> bool {
        total_cents.is_some_and(|total| total > self.suspicious_total_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ttl_boundaries() {
        let created = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let expiry = expires_at(created);

        assert!(is_live(expiry, created + Duration::seconds(4 * 60 + 59)));
        assert!(!is_live(expiry, created + Duration::seconds(5 * 60)));
        assert!(!is_live(expiry, created + Duration::seconds(5 * 60 + 1)));
    }

    #[test]
    fn test_low_confidence_needs_confirmation() {
        let policy = ReviewPolicy::default();
        assert!(policy.needs_confirmation(0.55));
        assert!(!policy.needs_confirmation(0.7));
        assert!(!policy.needs_confirmation(0.95));
    }

    #[test]
    fn test_suspicious_totals() {
        let policy = ReviewPolicy::default();
        assert!(!policy.is_suspicious(None));
        assert!(!policy.is_suspicious(Some(500_000)));
        assert!(policy.is_suspicious(Some(500_001)));
    }
}
