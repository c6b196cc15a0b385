//! Pending receipt models

use chrono::{DateTime, Utc};
use ledger::{Cents, SplitGroup, SplitType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{required, required_text};
use crate::error::ApiError;

pub const DEFAULT_GROUP_ID: &str = "default";
pub const ANONYMOUS_USER_ID: &str = "anonymous";
pub const DEFAULT_USER_NAME: &str = "User";
pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

/// A receipt waiting for the uploader to confirm it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReceipt {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub group_id: String,
    pub message_id: i64,
    pub image_url: String,
    pub ocr_result: serde_json::Value,
    pub total_cents: Cents,
    pub merchant: String,
    pub caption: Option<String>,
    pub participants: Vec<String>,
    pub participant_names: Option<HashMap<String, String>>,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Fields of a pending receipt before it is stored
#[derive(Debug, Clone)]
pub struct NewPendingReceipt {
    pub user_id: String,
    pub user_name: String,
    pub group_id: String,
    pub message_id: i64,
    pub image_url: String,
    pub ocr_result: serde_json::Value,
    pub total_cents: Cents,
    pub merchant: String,
    pub caption: Option<String>,
    pub participants: Vec<String>,
    pub participant_names: Option<HashMap<String, String>>,
    pub flagged_for_review: bool,
}

/// Request to run OCR on a receipt image
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequest {
    pub image_url: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub group_id: Option<String>,
}

/// Request to store an already processed receipt
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePendingReceiptRequest {
    pub user_name: Option<String>,
    pub group_id: Option<String>,
    pub message_id: Option<i64>,
    pub image_url: Option<String>,
    pub ocr_result: Option<serde_json::Value>,
    pub total_cents: Option<Cents>,
    pub merchant: Option<String>,
    pub caption: Option<String>,
    pub participants: Option<Vec<String>>,
    pub participant_names: Option<HashMap<String, String>>,
}

impl StorePendingReceiptRequest {
    /// Validate the body; `flag` decides whether the total needs review
    pub fn into_new(
        self,
        user_id: String,
        flag: impl Fn(Cents) -> bool,
    ) -> Result<NewPendingReceipt, ApiError> {
        let image_url = required_text(self.image_url, "imageUrl")?;
        let ocr_result = required(self.ocr_result, "ocrResult")?;
        let total_cents = required(self.total_cents, "totalCents")?;

        if total_cents <= 0 {
            return Err(ApiError::BadRequest("totalCents must be positive".to_string()));
        }

        Ok(NewPendingReceipt {
            user_id,
            user_name: self.user_name.unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            group_id: self.group_id.unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            message_id: self.message_id.unwrap_or(0),
            image_url,
            ocr_result,
            total_cents,
            merchant: self.merchant.unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            caption: self.caption,
            participants: self.participants.unwrap_or_default(),
            participant_names: self.participant_names,
            flagged_for_review: flag(total_cents),
        })
    }
}

/// Query parameters for the pending receipt lookup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReceiptQuery {
    pub group_id: Option<String>,
}

/// Request to turn a pending receipt into an expense
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceiptRequest {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub participants: Option<Vec<String>>,
    pub participant_names: Option<HashMap<String, String>>,
    pub split_type: Option<SplitType>,
    pub split_groups: Option<Vec<SplitGroup>>,
    pub amount_cents: Option<Cents>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_request_defaults() {
        let request = StorePendingReceiptRequest {
            image_url: Some("https://img/1.jpg".into()),
            ocr_result: Some(json!({"total": 24.5})),
            total_cents: Some(2450),
            ..Default::default()
        };

        let receipt = request.into_new("u1".into(), |total| total > 500_000).unwrap();
        assert_eq!(receipt.group_id, DEFAULT_GROUP_ID);
        assert_eq!(receipt.merchant, UNKNOWN_MERCHANT);
        assert_eq!(receipt.user_name, DEFAULT_USER_NAME);
        assert!(!receipt.flagged_for_review);
    }

    #[test]
    fn test_store_request_requires_total() {
        let request = StorePendingReceiptRequest {
            image_url: Some("https://img/1.jpg".into()),
            ocr_result: Some(json!({})),
            ..Default::default()
        };
        assert!(matches!(
            request.into_new("u1".into(), |_| false),
            Err(ApiError::BadRequest(msg)) if msg == "totalCents is required"
        ));
    }

    #[test]
    fn test_large_total_is_flagged() {
        let request = StorePendingReceiptRequest {
            image_url: Some("https://img/2.jpg".into()),
            ocr_result: Some(json!({})),
            total_cents: Some(750_000),
            ..Default::default()
        };
        let receipt = request.into_new("u1".into(), |total| total > 500_000).unwrap();
        assert!(receipt.flagged_for_review);
    }
}
