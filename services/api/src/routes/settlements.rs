//! Settlement handler

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use ledger::settlement::{PaidIndex, PaidPayment, SettlementSummary, annotate, reduce};
use ledger::{BalanceSheet, ExpenseEntry};
use serde_json::json;
use tracing::debug;

use crate::{
    AppState,
    error::{ApiResult, internal},
    models::payment::Payment,
};

/// Balances, the reduced list of transfers and their paid status
pub async fn get_settlements(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let expenses = state
        .expense_repository
        .list_active(&group_id)
        .await
        .map_err(internal("Failed to load expenses"))?;

    let entries: Vec<ExpenseEntry> = expenses.iter().map(|e| e.to_entry()).collect();
    let sheet = BalanceSheet::from_expenses(&entries, state.remainder_policy);

    let user_ids = sheet.user_ids().to_vec();
    let names = state
        .user_repository
        .display_names(&user_ids)
        .await
        .map_err(internal("Failed to load user names"))?;
    let balances = sheet.into_balances(&names);

    let transfers = reduce(&balances);
    let creditors: Vec<String> = transfers.iter().map(|t| t.to.clone()).collect();
    let profiles = state
        .user_repository
        .payment_profiles(&creditors)
        .await
        .map_err(internal("Failed to load payment profiles"))?;

    let paid: Vec<PaidPayment> = state
        .payment_repository
        .list_paid_by_group(&group_id)
        .await
        .map_err(internal("Failed to load payments"))?
        .iter()
        .map(Payment::to_paid)
        .collect();

    let settlements = annotate(
        &group_id,
        transfers,
        &balances,
        &profiles,
        &PaidIndex::from_payments(&paid),
    );
    let summary = SettlementSummary::new(&balances, &settlements);

    debug!(
        "Group {}: {} balances, {} settlements",
        group_id,
        balances.len(),
        settlements.len()
    );

    Ok(Json(json!({
        "success": true,
        "balances": balances,
        "settlements": settlements,
        "summary": summary,
    })))
}
