//! Venmo and PayPal deep links

use serde::Serialize;

use crate::money::{Cents, format_major};

const VENMO_NOTE: &str = "Group%20expense%20settlement";

/// A generated payment link
///
/// `verified` is false when the handle was guessed from the display name
/// because the creditor never stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLink {
    pub url: String,
    pub verified: bool,
}

/// Keep only the characters Venmo and PayPal allow in a handle, so the
/// result is safe to use as a URL path segment
pub fn sanitize_handle(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn resolve_handle(stored: Option<&str>, display_name: &str) -> (String, bool) {
    match stored.map(sanitize_handle) {
        Some(handle) if !handle.is_empty() => (handle, true),
        _ => (sanitize_handle(display_name), false),
    }
}

pub fn venmo_link(handle: Option<&str>, display_name: &str, amount: Cents) -> PaymentLink {
    let (handle, verified) = resolve_handle(handle, display_name);
    PaymentLink {
        url: format!(
            "https://venmo.com/{}?txn=pay&amount={}&note={}",
            handle,
            format_major(amount),
            VENMO_NOTE
        ),
        verified,
    }
}

pub fn paypal_link(handle: Option<&str>, display_name: &str, amount: Cents) -> PaymentLink {
    let (handle, verified) = resolve_handle(handle, display_name);
    PaymentLink {
        url: format!("https://paypal.me/{}/{}", handle, format_major(amount)),
        verified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_handle_is_verified() {
        let link = venmo_link(Some("@alice-w"), "Alice W", 2000);
        assert_eq!(
            link.url,
            "https://venmo.com/alice-w?txn=pay&amount=20.00&note=Group%20expense%20settlement"
        );
        assert!(link.verified);
    }

    #[test]
    fn test_missing_handle_falls_back_unverified() {
        let link = paypal_link(None, "Mary Jane  Watson", 1234);
        assert_eq!(link.url, "https://paypal.me/MaryJaneWatson/12.34");
        assert!(!link.verified);

        let blank = paypal_link(Some("   "), "Bob", 100);
        assert_eq!(blank.url, "https://paypal.me/Bob/1.00");
        assert!(!blank.verified);
    }

    #[test]
    fn test_fallback_handle_is_url_safe() {
        assert_eq!(sanitize_handle("A&B/C?"), "ABC");
        assert_eq!(sanitize_handle("  jo_ann-b "), "jo_ann-b");

        let link = venmo_link(None, "A&B/C?", 500);
        assert_eq!(
            link.url,
            "https://venmo.com/ABC?txn=pay&amount=5.00&note=Group%20expense%20settlement"
        );

        let stored = paypal_link(Some("@pay/me?x=1"), "Bob", 100);
        assert_eq!(stored.url, "https://paypal.me/paymex1/1.00");
        assert!(stored.verified);
    }
}
