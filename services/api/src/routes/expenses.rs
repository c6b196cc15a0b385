//! Expense handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use ledger::splits::participant_breakdown;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    ai::{parse_expense_text, parse_overlapping_split_text},
    error::{ApiError, ApiResult, internal},
    models::expense::{
        ClearExpensesRequest, CreateExpenseRequest, ExpenseQuery, NewExpense, ParseExpenseRequest,
        STATUS_DELETED, UpdateExpenseRequest,
    },
    models::{required, required_text},
};

/// Create an expense, registering any unknown users and the group
pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_expense = NewExpense::try_from(payload)?;

    info!(
        "Creating expense '{}' of {} cents in group {}",
        new_expense.description, new_expense.amount_cents, new_expense.group_id
    );

    let expense = state
        .expense_repository
        .create(&new_expense)
        .await
        .map_err(internal("Failed to create expense"))?;

    Ok(Json(json!({
        "success": true,
        "expense": expense,
    })))
}

/// List the expenses of a group, newest first
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<impl IntoResponse> {
    let group_id = required_text(query.group_id, "groupId")?;

    let expenses = state
        .expense_repository
        .list_by_group(&group_id, query.include_deleted)
        .await
        .map_err(internal("Failed to get expenses"))?;

    Ok(Json(json!({
        "success": true,
        "expenses": expenses,
    })))
}

/// Edit an expense
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut expense = state
        .expense_repository
        .find_by_id(id)
        .await
        .map_err(internal("Failed to get expense"))?
        .filter(|e| e.status != STATUS_DELETED)
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    expense.apply(payload)?;

    let expense = state
        .expense_repository
        .update(&expense)
        .await
        .map_err(internal("Failed to update expense"))?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    info!("Updated expense {}", expense.id);

    Ok(Json(json!({
        "success": true,
        "expense": expense,
    })))
}

/// Soft delete an expense
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state
        .expense_repository
        .soft_delete(id)
        .await
        .map_err(internal("Failed to delete expense"))?;

    if !deleted {
        return Err(ApiError::NotFound("Expense not found".to_string()));
    }

    info!("Soft deleted expense {}", id);

    Ok(Json(json!({
        "success": true,
        "message": "Expense deleted successfully",
    })))
}

async fn clear_group(state: &AppState, group_id: Option<String>) -> ApiResult<Json<serde_json::Value>> {
    let group_id = required_text(group_id, "groupId")?;

    let deleted = state
        .expense_repository
        .clear_group(&group_id)
        .await
        .map_err(internal("Failed to clear expenses"))?;

    info!("Cleared {} expenses from group {}", deleted, group_id);

    Ok(Json(json!({
        "success": true,
        "deletedCount": deleted,
    })))
}

/// Remove every expense of a group, with the group in the body
pub async fn clear_expenses(
    State(state): State<AppState>,
    Json(payload): Json<ClearExpensesRequest>,
) -> ApiResult<impl IntoResponse> {
    clear_group(&state, payload.group_id).await
}

/// Remove every expense of a group, with the group in the query string
pub async fn clear_expenses_by_query(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<impl IntoResponse> {
    clear_group(&state, query.group_id).await
}

/// Parse a chat message into expense fields
///
/// When a total is supplied the message is also checked for an
/// overlapping split.
pub async fn parse_expense(
    State(state): State<AppState>,
    Json(payload): Json<ParseExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = required_text(payload.text, "text")?;
    let model = state.language_model.as_ref();

    let parsed = parse_expense_text(model, &text, &state.review_policy).await;
    let overlapping = match payload.total_cents.filter(|total| *total > 0) {
        Some(total) => Some(parse_overlapping_split_text(model, &text, total).await),
        None => None,
    };

    Ok(Json(json!({
        "success": true,
        "parsed": parsed,
        "overlapping": overlapping,
    })))
}

/// Resolve an overlapping split and show what each person owes
pub async fn overlapping_split(
    State(state): State<AppState>,
    Json(payload): Json<ParseExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = required_text(payload.text, "text")?;
    let total_cents = required(payload.total_cents, "totalCents")?;
    if total_cents <= 0 {
        return Err(ApiError::BadRequest("totalCents must be positive".to_string()));
    }

    let split = parse_overlapping_split_text(state.language_model.as_ref(), &text, total_cents).await;

    if !split.is_overlapping {
        return Ok(Json(json!({
            "success": true,
            "isOverlapping": false,
            "message": "No overlapping split pattern detected",
        })));
    }

    let breakdown = participant_breakdown(&split.split_groups);

    Ok(Json(json!({
        "success": true,
        "isOverlapping": true,
        "splitGroups": split.split_groups,
        "overlappingUsers": breakdown,
        "summary": {
            "totalGroups": split.split_groups.len(),
            "overlappingCount": breakdown.len(),
            "totalAmount": total_cents,
        },
    })))
}
