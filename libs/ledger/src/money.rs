//! Minor-unit money helpers
//!
//! Amounts are always integer counts of the smallest currency unit (cents
//! for USD). Floating point only shows up at the edges, where external
//! services hand us major units, and is converted immediately.

/// Integer amount in minor currency units
pub type Cents = i64;

/// Balances within this many minor units of zero count as settled
pub const ROUNDING_TOLERANCE: Cents = 1;

/// Largest amount a single expense or payment may carry (99,999.00)
pub const MAX_AMOUNT_CENTS: Cents = 99_999 * 100;

/// True when an amount is rounding noise rather than a real debt
pub fn is_negligible(amount: Cents) -> bool {
    amount.abs() <= ROUNDING_TOLERANCE
}

/// Convert a major-unit amount (e.g. `24.50`) into minor units
pub fn major_to_cents(major: f64) -> Cents {
    (major * 100.0).round() as Cents
}

/// Format minor units as a plain major-unit string (`2000` -> `"20.00"`)
pub fn format_major(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_major() {
        assert_eq!(format_major(2000), "20.00");
        assert_eq!(format_major(2450), "24.50");
        assert_eq!(format_major(5), "0.05");
        assert_eq!(format_major(-350), "-3.50");
        assert_eq!(format_major(0), "0.00");
    }

    #[test]
    fn test_major_to_cents_rounds_float_noise() {
        assert_eq!(major_to_cents(24.50), 2450);
        assert_eq!(major_to_cents(0.1 + 0.2), 30);
        assert_eq!(major_to_cents(2377.54), 237754);
    }

    #[test]
    fn test_max_amount_fits_many_expenses() {
        assert_eq!(format_major(MAX_AMOUNT_CENTS), "99999.00");
        assert!(MAX_AMOUNT_CENTS.checked_mul(1_000_000_000).is_some());
    }

    #[test]
    fn test_is_negligible() {
        assert!(is_negligible(0));
        assert!(is_negligible(1));
        assert!(is_negligible(-1));
        assert!(!is_negligible(2));
        assert!(!is_negligible(-2));
    }
}
