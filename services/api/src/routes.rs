//! API service routes

mod badges;
mod expenses;
mod payments;
mod receipts;
mod settlements;
mod users;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users/profile", post(users::update_profile))
        .route(
            "/payments/profile/:user_id",
            get(users::get_payment_profile).put(users::update_payment_profile),
        )
        .route(
            "/expenses",
            post(expenses::create_expense)
                .get(expenses::list_expenses)
                .delete(expenses::clear_expenses_by_query),
        )
        .route(
            "/expenses/:id",
            put(expenses::update_expense).delete(expenses::delete_expense),
        )
        .route("/expenses/clear", post(expenses::clear_expenses))
        .route("/expenses/parse", post(expenses::parse_expense))
        .route("/expenses/overlapping", post(expenses::overlapping_split))
        .route("/settlements/:group_id", get(settlements::get_settlements))
        .route("/payments/create", post(payments::create_payment))
        .route("/payments/mark-processing", post(payments::mark_processing))
        .route("/payments/mark-paid", post(payments::mark_paid))
        .route("/badges/award", post(badges::award_badge))
        .route("/badges/:user_id", get(badges::list_badges))
        .route("/receipts/ocr", post(receipts::process_receipt))
        .route(
            "/receipts/pending/:user_id",
            post(receipts::store_pending_receipt).get(receipts::get_pending_receipt),
        )
        .route("/receipts/confirm", post(receipts::confirm_receipt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
