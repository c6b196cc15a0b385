//! Badge evaluation after a payment is settled

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use ledger::badges::{
    CollectionProgress, EVEN_STEVEN_WINDOW_DAYS, TABLE_HERO_WINDOW_DAYS, BadgeType,
    elapsed_days, group_fully_settled, is_quick_pay, within_window,
};
use ledger::{BalanceSheet, ExpenseEntry, RemainderPolicy};
use serde_json::json;
use tracing::info;

use crate::models::expense::Expense;
use crate::models::payment::Payment;
use crate::repositories::{BadgeRepository, ExpenseRepository, PaymentRepository, UserRepository};

/// Net balances of a group after its paid payments
pub fn net_balances(expenses: &[Expense], paid: &[Payment], policy: RemainderPolicy) -> BalanceSheet {
    let entries: Vec<ExpenseEntry> = expenses.iter().map(Expense::to_entry).collect();
    let mut sheet = BalanceSheet::from_expenses(&entries, policy);
    for payment in paid {
        sheet.apply_payment(&payment.from_user_id, &payment.to_user_id, payment.amount_cents);
    }
    sheet
}

/// Every payer and participant of the given expenses, first appearance first
pub fn group_members(expenses: &[Expense]) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    for member in expenses.iter().flat_map(Expense::members) {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    members
}

fn hours_between(since: DateTime<Utc>, until: DateTime<Utc>) -> f64 {
    let hours = until.signed_duration_since(since).num_seconds() as f64 / 3600.0;
    (hours * 10.0).round() / 10.0
}

/// Awards badges in reaction to a payment reaching `paid`
#[derive(Clone)]
pub struct BadgeEvaluator {
    users: UserRepository,
    expenses: ExpenseRepository,
    payments: PaymentRepository,
    badges: BadgeRepository,
    policy: RemainderPolicy,
}

impl BadgeEvaluator {
    pub fn new(
        users: UserRepository,
        expenses: ExpenseRepository,
        payments: PaymentRepository,
        badges: BadgeRepository,
        policy: RemainderPolicy,
    ) -> Self {
        Self {
            users,
            expenses,
            payments,
            badges,
            policy,
        }
    }

    /// Update the debtor's stats and award whatever badges the payment earned
    ///
    /// Returns the badges newly awarded by this call.
    pub async fn on_payment_paid(
        &self,
        payment: &Payment,
        expense: &Expense,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, BadgeType)>> {
        let mut awarded = Vec::new();
        let paid_at = payment.paid_at.unwrap_or(now);
        let group_id = expense.group_id.as_str();

        let quick = is_quick_pay(expense.created_at, paid_at);
        let streak = self
            .users
            .record_payment(&payment.from_user_id, quick, payment.amount_cents, paid_at)
            .await?;

        if quick {
            let metadata = json!({
                "hoursToPay": hours_between(expense.created_at, paid_at),
                "consecutiveQuickPays": streak.consecutive_quick_pays,
                "expenseId": expense.id,
            });
            if self
                .badges
                .award(&payment.from_user_id, group_id, BadgeType::PayItForward, &metadata, now)
                .await?
            {
                awarded.push((payment.from_user_id.clone(), BadgeType::PayItForward));
            }
        }

        if within_window(expense.created_at, now, Duration::days(TABLE_HERO_WINDOW_DAYS)) {
            let creditor = payment.to_user_id.as_str();
            let recent = self
                .expenses
                .list_paid_by_since(group_id, creditor, now - Duration::days(TABLE_HERO_WINDOW_DAYS))
                .await?;
            let collected = self.payments.sum_paid_to(group_id, creditor).await?;
            let entries: Vec<ExpenseEntry> = recent.iter().map(Expense::to_entry).collect();
            let progress = CollectionProgress::for_payer(creditor, &entries, collected, self.policy);

            if progress.qualifies_for_table_hero() {
                let metadata = json!({
                    "collectionRate": progress.percent(),
                    "daysToCollect": elapsed_days(expense.created_at, now),
                });
                if self
                    .badges
                    .award(creditor, group_id, BadgeType::TableHero, &metadata, now)
                    .await?
                {
                    awarded.push((creditor.to_string(), BadgeType::TableHero));
                }
            }
        }

        if within_window(expense.created_at, now, Duration::days(EVEN_STEVEN_WINDOW_DAYS)) {
            let expenses = self.expenses.list_active(group_id).await?;
            let paid = self.payments.list_paid_by_group(group_id).await?;

            if group_fully_settled(&net_balances(&expenses, &paid, self.policy)) {
                let metadata = json!({ "daysToSettle": elapsed_days(expense.created_at, now) });
                for member in group_members(&expenses) {
                    if self
                        .badges
                        .award(&member, group_id, BadgeType::EvenSteven, &metadata, now)
                        .await?
                    {
                        awarded.push((member, BadgeType::EvenSteven));
                    }
                }
            }
        }

        for (user_id, badge) in &awarded {
            info!("Awarded {} to {} in group {}", badge, user_id, group_id);
        }

        Ok(awarded)
    }
}
