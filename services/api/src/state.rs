//! Application state for the API service

use ledger::RemainderPolicy;
use ledger::receipts::ReviewPolicy;
use sqlx::PgPool;
use std::sync::Arc;

use crate::ai::LanguageModel;
use crate::badges::BadgeEvaluator;
use crate::repositories::{
    BadgeRepository, ExpenseRepository, PaymentRepository, ReceiptRepository, ReminderRepository,
    UserRepository,
};
use crate::settings::Settings;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub expense_repository: ExpenseRepository,
    pub payment_repository: PaymentRepository,
    pub badge_repository: BadgeRepository,
    pub receipt_repository: ReceiptRepository,
    pub reminder_repository: ReminderRepository,
    pub badge_evaluator: BadgeEvaluator,
    /// Text and vision model used by the parsing endpoints
    pub language_model: Arc<dyn LanguageModel>,
    pub remainder_policy: RemainderPolicy,
    pub review_policy: ReviewPolicy,
}

impl AppState {
    pub fn new(db_pool: PgPool, language_model: Arc<dyn LanguageModel>, settings: &Settings) -> Self {
        let user_repository = UserRepository::new(db_pool.clone());
        let expense_repository = ExpenseRepository::new(db_pool.clone());
        let payment_repository = PaymentRepository::new(db_pool.clone());
        let badge_repository = BadgeRepository::new(db_pool.clone());
        let remainder_policy = settings.ledger.remainder_policy;

        let badge_evaluator = BadgeEvaluator::new(
            user_repository.clone(),
            expense_repository.clone(),
            payment_repository.clone(),
            badge_repository.clone(),
            remainder_policy,
        );

        Self {
            receipt_repository: ReceiptRepository::new(db_pool.clone()),
            reminder_repository: ReminderRepository::new(db_pool.clone()),
            db_pool,
            user_repository,
            expense_repository,
            payment_repository,
            badge_repository,
            badge_evaluator,
            language_model,
            remainder_policy,
            review_policy: settings.ledger.review_policy(),
        }
    }
}
