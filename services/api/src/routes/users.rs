//! Profile handlers

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult, internal},
    models::required_text,
    models::user::{
        PaymentProfileResponse, ProfileResponse, ProfileUpdate, UpdatePaymentProfileRequest,
        UpdateProfileRequest,
    },
};

/// Create or update a user profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = required_text(payload.user_id.clone(), "userId")?;
    let update = ProfileUpdate::new(user_id, payload);

    info!("Updating profile for user {}", update.user_id);

    let user = state
        .user_repository
        .upsert_profile(&update)
        .await
        .map_err(internal("Failed to update profile"))?;

    Ok(Json(json!({
        "success": true,
        "user": ProfileResponse::from(user),
    })))
}

/// Get the payment handles of a user
pub async fn get_payment_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(&user_id)
        .await
        .map_err(internal("Failed to get payment profile"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "profile": PaymentProfileResponse::from(user),
    })))
}

/// Replace the payment handles of a user
pub async fn update_payment_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdatePaymentProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let venmo = payload.venmo.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let paypal = payload.paypal.as_deref().map(str::trim).filter(|v| !v.is_empty());

    let user = state
        .user_repository
        .update_payment_profile(&user_id, venmo, paypal)
        .await
        .map_err(internal("Failed to update payment profile"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!("Updated payment profile for user {}", user_id);

    Ok(Json(json!({
        "success": true,
        "profile": PaymentProfileResponse::from(user),
    })))
}
