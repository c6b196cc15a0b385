//! HTTP service for shared group expenses
//!
//! Exposes expenses, settlements, payments, badges and pending receipts
//! over JSON, backed by PostgreSQL and a chat-completions model for the
//! parsing endpoints.

pub mod ai;
pub mod badges;
pub mod error;
pub mod models;
pub mod reminders;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
