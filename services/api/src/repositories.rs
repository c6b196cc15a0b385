//! Repositories for database operations

pub mod badges;
pub mod expenses;
pub mod payments;
pub mod receipts;
pub mod reminders;
pub mod users;

pub use badges::BadgeRepository;
pub use expenses::ExpenseRepository;
pub use payments::PaymentRepository;
pub use receipts::ReceiptRepository;
pub use reminders::ReminderRepository;
pub use users::UserRepository;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode an optional JSONB column, falling back to the default on bad data
pub(crate) fn decode_json<T: DeserializeOwned + Default>(value: Option<Value>) -> T {
    value
        .and_then(|v| match serde_json::from_value(v) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring malformed JSON column: {}", e);
                None
            }
        })
        .unwrap_or_default()
}
