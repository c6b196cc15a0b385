//! Payment handlers

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use ledger::links::{paypal_link, venmo_link};
use ledger::reminders::FIRST_REMINDER_DELAY_HOURS;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    error::{ApiError, ApiResult, internal},
    models::payment::{
        CreatePaymentRequest, NewPayment, PaymentRequest, PaymentStatus, PaymentStatusRequest,
    },
    models::reminder::NewReminder,
    models::required,
};

/// Create a payment request with Venmo and PayPal links
///
/// The first reminder for the debtor is scheduled with it.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = PaymentRequest::try_from(payload)?;

    let expense = state
        .expense_repository
        .find_by_id(request.expense_id)
        .await
        .map_err(internal("Failed to load expense"))?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    let creditor = state
        .user_repository
        .find_by_id(&request.to_user_id)
        .await
        .map_err(internal("Failed to load creditor"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let debtor = state
        .user_repository
        .find_by_id(&request.from_user_id)
        .await
        .map_err(internal("Failed to load debtor"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let group_name = state
        .expense_repository
        .group_name(&expense.group_id)
        .await
        .map_err(internal("Failed to load group"))?;

    info!(
        "Creating payment request {} -> {} for {} cents",
        request.from_user_id, request.to_user_id, request.amount_cents
    );

    let venmo = venmo_link(
        creditor.venmo.as_deref(),
        &creditor.display_name,
        request.amount_cents,
    );
    let paypal = paypal_link(
        creditor.paypal.as_deref(),
        &creditor.display_name,
        request.amount_cents,
    );

    let reminder = NewReminder {
        group_id: expense.group_id.clone(),
        group_name,
        debtor_user_id: debtor.id,
        debtor_user_name: debtor.display_name,
        creditor_user_name: creditor.display_name,
        amount_cents: request.amount_cents,
        next_reminder_at: Utc::now() + Duration::hours(FIRST_REMINDER_DELAY_HOURS),
    };

    let payment = NewPayment {
        links_verified: venmo.verified && paypal.verified,
        venmo_link: venmo.url,
        paypal_link: paypal.url,
        request,
    };

    let payment = state
        .payment_repository
        .create(&payment, &reminder)
        .await
        .map_err(internal("Failed to create payment"))?;

    Ok(Json(json!({
        "success": true,
        "payment": payment,
    })))
}

/// Move an unpaid payment to processing
pub async fn mark_processing(
    State(state): State<AppState>,
    Json(payload): Json<PaymentStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let payment_id = required(payload.payment_id, "paymentId")?;

    let current = state
        .payment_repository
        .find_by_id(payment_id)
        .await
        .map_err(internal("Failed to load payment"))?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    let payment = state
        .payment_repository
        .mark_processing(payment_id)
        .await
        .map_err(internal("Failed to update payment"))?
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Payment cannot move to processing from {}",
                current.status
            ))
        })?;

    info!("Payment {} is processing", payment_id);

    Ok(Json(json!({
        "success": true,
        "payment": payment,
    })))
}

/// Mark a payment paid, then update stats and badges
///
/// Marking an already paid payment changes nothing and awards nothing.
/// Badge failures are logged and do not fail the request.
pub async fn mark_paid(
    State(state): State<AppState>,
    Json(payload): Json<PaymentStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let payment_id = required(payload.payment_id, "paymentId")?;

    let current = state
        .payment_repository
        .find_by_id(payment_id)
        .await
        .map_err(internal("Failed to load payment"))?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    let now = Utc::now();
    let updated = if current.status == PaymentStatus::Paid {
        None
    } else {
        state
            .payment_repository
            .mark_paid(payment_id, now)
            .await
            .map_err(internal("Failed to mark payment as paid"))?
    };

    let Some(payment) = updated else {
        info!("Payment {} was already paid", payment_id);
        return Ok(Json(json!({
            "success": true,
            "payment": current,
            "badgesAwarded": [],
        })));
    };

    info!(
        "Payment {} marked paid by {}",
        payment_id,
        payload.marked_by.as_deref().unwrap_or(&payment.from_user_id)
    );

    let mut awarded = Vec::new();
    match state.expense_repository.find_by_id(payment.expense_id).await {
        Ok(Some(expense)) => {
            match state
                .badge_evaluator
                .on_payment_paid(&payment, &expense, now)
                .await
            {
                Ok(badges) => awarded = badges,
                Err(e) => warn!("Badge evaluation failed for payment {}: {}", payment_id, e),
            }
        }
        Ok(None) => warn!("Expense {} of payment {} is gone", payment.expense_id, payment_id),
        Err(e) => warn!("Failed to load expense for badge evaluation: {}", e),
    }

    let awarded: Vec<_> = awarded
        .into_iter()
        .map(|(user_id, badge_type)| json!({ "userId": user_id, "badgeType": badge_type }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "badgesAwarded": awarded,
    })))
}
