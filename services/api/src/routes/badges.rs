//! Badge handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::badges::{AwardPeriod, BadgeType};
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult, internal},
    models::badge::{AwardBadgeRequest, BadgeQuery},
    models::required_text,
};

/// Badges of a user, newest first
pub async fn list_badges(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<BadgeQuery>,
) -> ApiResult<impl IntoResponse> {
    let period = query.this_month.then(|| AwardPeriod::containing(Utc::now()));

    let badges = state
        .badge_repository
        .list_for_user(&user_id, query.group_id.as_deref(), period)
        .await
        .map_err(internal("Failed to get badges"))?;

    Ok(Json(json!({
        "success": true,
        "badges": badges,
    })))
}

/// Award a badge by hand
pub async fn award_badge(
    State(state): State<AppState>,
    Json(payload): Json<AwardBadgeRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = required_text(payload.user_id, "userId")?;
    let group_id = required_text(payload.group_id, "groupId")?;
    let badge_type: BadgeType = required_text(payload.badge_type, "badgeType")?
        .parse()
        .map_err(|e: ledger::LedgerError| ApiError::BadRequest(e.to_string()))?;

    state
        .user_repository
        .find_by_id(&user_id)
        .await
        .map_err(internal("Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let metadata = payload.metadata.unwrap_or_else(|| json!({}));
    let awarded = state
        .badge_repository
        .award(&user_id, &group_id, badge_type, &metadata, Utc::now())
        .await
        .map_err(internal("Failed to award badge"))?;

    if !awarded {
        return Ok(Json(json!({
            "success": false,
            "message": "Badge already awarded this month",
        })));
    }

    info!("Awarded {} to {} in group {}", badge_type, user_id, group_id);

    Ok(Json(json!({
        "success": true,
        "message": "Badge awarded successfully",
    })))
}
