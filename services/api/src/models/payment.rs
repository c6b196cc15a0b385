//! Payment models

use chrono::{DateTime, Utc};
use ledger::Cents;
use ledger::money::MAX_AMOUNT_CENTS;
use ledger::settlement::PaidPayment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{required, required_text};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Venmo,
    Paypal,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Venmo => "venmo",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "venmo" => Ok(PaymentMethod::Venmo),
            "paypal" => Ok(PaymentMethod::Paypal),
            "cash" => Ok(PaymentMethod::Cash),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Processing,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "processing" => Ok(PaymentStatus::Processing),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// A stored payment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_cents: Cents,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub settlement_id: Option<String>,
    pub venmo_link: String,
    pub paypal_link: String,
    pub links_verified: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn to_paid(&self) -> PaidPayment {
        PaidPayment {
            settlement_id: self.settlement_id.clone(),
            from_user_id: self.from_user_id.clone(),
            to_user_id: self.to_user_id.clone(),
            amount_cents: self.amount_cents,
        }
    }
}

/// Request to create a payment
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub expense_id: Option<Uuid>,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount_cents: Option<Cents>,
    pub method: Option<PaymentMethod>,
    pub settlement_id: Option<String>,
}

/// A validated payment request, before links are generated
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub expense_id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_cents: Cents,
    pub method: PaymentMethod,
    pub settlement_id: Option<String>,
}

impl TryFrom<CreatePaymentRequest> for PaymentRequest {
    type Error = ApiError;

    fn try_from(request: CreatePaymentRequest) -> Result<Self, Self::Error> {
        let expense_id = required(request.expense_id, "expenseId")?;
        let from_user_id = required_text(request.from_user_id, "fromUserId")?;
        let to_user_id = required_text(request.to_user_id, "toUserId")?;
        let amount_cents = required(request.amount_cents, "amountCents")?;

        if amount_cents <= 0 {
            return Err(ApiError::BadRequest("amountCents must be positive".to_string()));
        }
        if amount_cents > MAX_AMOUNT_CENTS {
            return Err(ApiError::BadRequest(format!(
                "amountCents must not exceed {}",
                MAX_AMOUNT_CENTS
            )));
        }
        if from_user_id == to_user_id {
            return Err(ApiError::BadRequest(
                "fromUserId and toUserId must differ".to_string(),
            ));
        }

        Ok(Self {
            expense_id,
            from_user_id,
            to_user_id,
            amount_cents,
            method: request.method.unwrap_or_default(),
            settlement_id: request
                .settlement_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        })
    }
}

/// Everything needed to insert a payment row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub request: PaymentRequest,
    pub venmo_link: String,
    pub paypal_link: String,
    pub links_verified: bool,
}

/// Body of the payment status transitions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub payment_id: Option<Uuid>,
    pub marked_by: Option<String>,
}
