//! Receipt handlers
//!
//! An uploaded receipt waits as a pending receipt for five minutes. A later
//! upload by the same user in the same group replaces it, and confirming it
//! turns it into an expense.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::receipts::is_live;
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    ai::process_receipt_ocr,
    error::{ApiError, ApiResult, internal},
    models::expense::{CreateExpenseRequest, NewExpense},
    models::receipt::{
        ANONYMOUS_USER_ID, ConfirmReceiptRequest, DEFAULT_GROUP_ID, DEFAULT_USER_NAME,
        NewPendingReceipt, OcrRequest, PendingReceiptQuery, StorePendingReceiptRequest,
        UNKNOWN_MERCHANT,
    },
    models::{required, required_text},
};

fn expired() -> ApiError {
    ApiError::NotFound("Pending receipt has expired".to_string())
}

/// Read a receipt image and keep the result as a pending receipt
pub async fn process_receipt(
    State(state): State<AppState>,
    Json(payload): Json<OcrRequest>,
) -> ApiResult<impl IntoResponse> {
    let image_url = required_text(payload.image_url, "imageUrl")?;
    let user_id = payload.user_id.unwrap_or_else(|| ANONYMOUS_USER_ID.to_string());

    info!("Processing receipt OCR for user {}", user_id);

    let ocr = process_receipt_ocr(state.language_model.as_ref(), &image_url, &state.review_policy).await;

    let receipt = NewPendingReceipt {
        user_id,
        user_name: payload.user_name.unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        group_id: payload.group_id.unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
        message_id: 0,
        image_url,
        ocr_result: json!(ocr),
        total_cents: ocr.total_cents.unwrap_or(0),
        merchant: ocr.merchant.clone().unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
        caption: None,
        participants: Vec::new(),
        participant_names: None,
        flagged_for_review: ocr.flagged_for_review,
    };

    let stored = state
        .receipt_repository
        .store(&receipt, Utc::now())
        .await
        .map_err(internal("Failed to store pending receipt"))?;

    info!("Pending receipt {} stored", stored.id);

    Ok(Json(json!({
        "success": true,
        "receiptId": stored.id,
        "ocrResult": ocr,
        "expiresAt": stored.expires_at,
    })))
}

/// Store a receipt that was already processed elsewhere
pub async fn store_pending_receipt(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<StorePendingReceiptRequest>,
) -> ApiResult<impl IntoResponse> {
    let policy = state.review_policy;
    let receipt = payload.into_new(user_id, |total| policy.is_suspicious(Some(total)))?;

    let stored = state
        .receipt_repository
        .store(&receipt, Utc::now())
        .await
        .map_err(internal("Failed to store pending receipt"))?;

    info!("Pending receipt {} stored for user {}", stored.id, stored.user_id);

    Ok(Json(json!({
        "success": true,
        "receiptId": stored.id,
        "expiresAt": stored.expires_at,
    })))
}

/// The live pending receipt of a user in a group
pub async fn get_pending_receipt(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PendingReceiptQuery>,
) -> ApiResult<impl IntoResponse> {
    let group_id = query.group_id.unwrap_or_else(|| DEFAULT_GROUP_ID.to_string());

    let receipt = state
        .receipt_repository
        .find_live(&user_id, &group_id, Utc::now())
        .await
        .map_err(internal("Failed to get pending receipt"))?
        .ok_or_else(|| ApiError::NotFound("No pending receipt found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "receipt": receipt,
    })))
}

/// Turn a live pending receipt into an expense paid by its uploader
pub async fn confirm_receipt(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmReceiptRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = required_text(payload.user_id, "userId")?;
    let group_id = required_text(payload.group_id, "groupId")?;
    let receipt_id = required(payload.receipt_id, "receiptId")?;

    let receipt = state
        .receipt_repository
        .find_by_id(receipt_id)
        .await
        .map_err(internal("Failed to load pending receipt"))?
        .ok_or_else(|| ApiError::NotFound("Pending receipt not found".to_string()))?;

    if receipt.user_id != user_id {
        return Err(ApiError::NotFound("Pending receipt not found".to_string()));
    }

    let now = Utc::now();
    if !is_live(receipt.expires_at, now) {
        return Err(expired());
    }

    let participants = payload
        .participants
        .or_else(|| (!receipt.participants.is_empty()).then(|| receipt.participants.clone()));

    let expense = NewExpense::try_from(CreateExpenseRequest {
        group_id: Some(group_id),
        payer_id: Some(user_id),
        merchant: Some(receipt.merchant.clone()),
        description: Some(format!("{} - Receipt", receipt.merchant)),
        amount_cents: Some(payload.amount_cents.unwrap_or(receipt.total_cents)),
        currency: None,
        split_type: payload.split_type,
        split_groups: payload.split_groups,
        participants,
        participant_names: payload.participant_names.or(receipt.participant_names),
        receipt_image_url: Some(receipt.image_url),
        ocr_data: Some(receipt.ocr_result),
    })?;

    let created = state
        .receipt_repository
        .confirm(receipt_id, &expense, now)
        .await
        .map_err(internal("Failed to confirm pending receipt"))?
        .ok_or_else(expired)?;

    info!("Expense {} created from pending receipt {}", created.id, receipt_id);

    Ok(Json(json!({
        "success": true,
        "expense": created,
    })))
}
