//! Expense models

use chrono::{DateTime, Utc};
use ledger::splits::fill_missing_totals;
use ledger::{Cents, ExpenseEntry, SplitGroup, SplitType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{required, required_text};
use crate::error::ApiError;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DELETED: &str = "deleted";

/// A stored expense
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    pub merchant: Option<String>,
    pub description: String,
    pub amount_cents: Cents,
    pub currency: String,
    pub split_type: SplitType,
    pub split_groups: Vec<SplitGroup>,
    pub participants: Vec<String>,
    pub participant_names: Option<HashMap<String, String>>,
    pub receipt_image_url: Option<String>,
    pub ocr_data: Option<serde_json::Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// The balance-relevant part of this expense
    pub fn to_entry(&self) -> ExpenseEntry {
        ExpenseEntry {
            payer_id: self.payer_id.clone(),
            amount_cents: self.amount_cents,
            participants: self.participants.clone(),
            split_type: self.split_type,
            split_groups: self.split_groups.clone(),
        }
    }

    /// Payer first, then participants, without duplicates
    pub fn members(&self) -> Vec<String> {
        let mut members = vec![self.payer_id.clone()];
        for participant in &self.participants {
            if !members.contains(participant) {
                members.push(participant.clone());
            }
        }
        members
    }

    /// Apply an edit and check the result still describes a valid expense
    pub fn apply(&mut self, update: UpdateExpenseRequest) -> Result<(), ApiError> {
        if let Some(merchant) = update.merchant {
            self.merchant = Some(merchant);
        }
        if let Some(description) = update.description {
            if description.trim().is_empty() {
                return Err(ApiError::BadRequest("description cannot be empty".to_string()));
            }
            self.description = description;
        }
        if let Some(amount_cents) = update.amount_cents {
            self.amount_cents = amount_cents;
        }
        if let Some(participants) = update.participants {
            self.participants = participants;
        }
        if let Some(names) = update.participant_names {
            self.participant_names = Some(names);
        }
        if let Some(split_type) = update.split_type {
            self.split_type = split_type;
        }
        if let Some(split_groups) = update.split_groups {
            self.split_groups = split_groups;
        }
        let split_groups = std::mem::take(&mut self.split_groups);
        self.split_groups = fill_missing_totals(self.amount_cents, split_groups);

        self.to_entry()
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

/// Request to create an expense
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub group_id: Option<String>,
    pub payer_id: Option<String>,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
    pub currency: Option<String>,
    pub split_type: Option<SplitType>,
    pub split_groups: Option<Vec<SplitGroup>>,
    pub participants: Option<Vec<String>>,
    pub participant_names: Option<HashMap<String, String>>,
    pub receipt_image_url: Option<String>,
    pub ocr_data: Option<serde_json::Value>,
}

/// A validated expense ready to be stored
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub group_id: String,
    pub payer_id: String,
    pub merchant: Option<String>,
    pub description: String,
    pub amount_cents: Cents,
    pub currency: String,
    pub split_type: SplitType,
    pub split_groups: Vec<SplitGroup>,
    pub participants: Vec<String>,
    pub participant_names: Option<HashMap<String, String>>,
    pub receipt_image_url: Option<String>,
    pub ocr_data: Option<serde_json::Value>,
}

impl NewExpense {
    pub fn to_entry(&self) -> ExpenseEntry {
        ExpenseEntry {
            payer_id: self.payer_id.clone(),
            amount_cents: self.amount_cents,
            participants: self.participants.clone(),
            split_type: self.split_type,
            split_groups: self.split_groups.clone(),
        }
    }

    /// Reject amounts of zero and anything the ledger would refuse
    pub fn validate(self) -> Result<Self, ApiError> {
        if self.amount_cents == 0 {
            return Err(ApiError::BadRequest("amountCents must be positive".to_string()));
        }
        self.to_entry()
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(self)
    }
}

impl TryFrom<CreateExpenseRequest> for NewExpense {
    type Error = ApiError;

    fn try_from(request: CreateExpenseRequest) -> Result<Self, Self::Error> {
        let group_id = required_text(request.group_id, "groupId")?;
        let payer_id = required_text(request.payer_id, "payerId")?;
        let description = required_text(request.description, "description")?;
        let amount_cents = required(request.amount_cents, "amountCents")?;
        let split_type = request.split_type.unwrap_or_default();
        let split_groups =
            fill_missing_totals(amount_cents, request.split_groups.unwrap_or_default());

        // Overlapping expenses may list their participants only in the groups
        let participants = match request.participants {
            Some(participants) => participants,
            None if !split_groups.is_empty() => {
                ExpenseEntry::overlapping(payer_id.as_str(), amount_cents, split_groups.clone())
                    .participants
            }
            None => return Err(ApiError::BadRequest("participants is required".to_string())),
        };

        NewExpense {
            group_id,
            payer_id,
            merchant: request.merchant,
            description,
            amount_cents,
            currency: request.currency.unwrap_or_else(|| "USD".to_string()),
            split_type,
            split_groups,
            participants,
            participant_names: request.participant_names,
            receipt_image_url: request.receipt_image_url,
            ocr_data: request.ocr_data,
        }
        .validate()
    }
}

/// Request to edit an expense; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
    pub participants: Option<Vec<String>>,
    pub participant_names: Option<HashMap<String, String>>,
    pub split_type: Option<SplitType>,
    pub split_groups: Option<Vec<SplitGroup>>,
}

/// Query parameters for listing expenses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub group_id: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Body of the bulk clear request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearExpensesRequest {
    pub group_id: Option<String>,
}

/// Body of the text parsing requests
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseExpenseRequest {
    pub text: Option<String>,
    pub total_cents: Option<Cents>,
}
