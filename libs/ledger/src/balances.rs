//! Net balance aggregation
//!
//! Positive balances are owed money, negative balances owe money. The sheet
//! remembers the order in which users first appear so that the settlement
//! reducer can break ties deterministically.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::expense::{ExpenseEntry, RemainderPolicy};
use crate::money::{Cents, is_negligible};

/// Net balance of a single user within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: String,
    pub user_name: String,
    pub balance: Cents,
}

/// Running per-user totals
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    order: Vec<String>,
    totals: HashMap<String, Cents>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sheet from a group's live expenses
    pub fn from_expenses<'a>(
        expenses: impl IntoIterator<Item = &'a ExpenseEntry>,
        policy: RemainderPolicy,
    ) -> Self {
        let mut sheet = Self::new();
        for expense in expenses {
            sheet.apply_expense(expense, policy);
        }
        sheet
    }

    fn entry(&mut self, user_id: &str) -> &mut Cents {
        if !self.totals.contains_key(user_id) {
            self.order.push(user_id.to_string());
        }
        self.totals.entry(user_id.to_string()).or_insert(0)
    }

    /// Totals saturate at the `Cents` bounds instead of wrapping
    pub fn credit(&mut self, user_id: &str, amount: Cents) {
        let total = self.entry(user_id);
        *total = total.saturating_add(amount);
    }

    pub fn debit(&mut self, user_id: &str, amount: Cents) {
        let total = self.entry(user_id);
        *total = total.saturating_sub(amount);
    }

    /// Debit every participant their share and credit the payer in full
    pub fn apply_expense(&mut self, expense: &ExpenseEntry, policy: RemainderPolicy) {
        for (participant, share) in expense.debits(policy) {
            self.debit(participant, share);
        }
        self.credit(&expense.payer_id, expense.amount_cents);
    }

    /// Account for money that already changed hands
    pub fn apply_payment(&mut self, from_user_id: &str, to_user_id: &str, amount: Cents) {
        self.credit(from_user_id, amount);
        self.debit(to_user_id, amount);
    }

    pub fn get(&self, user_id: &str) -> Cents {
        self.totals.get(user_id).copied().unwrap_or(0)
    }

    /// User ids in first-appearance order
    pub fn user_ids(&self) -> &[String] {
        &self.order
    }

    /// True when nobody owes or is owed more than the rounding tolerance
    pub fn is_settled(&self) -> bool {
        self.totals.values().all(|b| is_negligible(*b))
    }

    /// Sum of all balances; equals the accumulated rounding remainder
    pub fn total(&self) -> Cents {
        self.totals.values().fold(0, |sum, b| sum.saturating_add(*b))
    }

    /// Non-negligible balances with resolved display names
    ///
    /// Users missing from `names` keep their raw id as display name.
    pub fn into_balances(self, names: &HashMap<String, String>) -> Vec<Balance> {
        let BalanceSheet { order, totals } = self;

        order
            .into_iter()
            .filter_map(|user_id| {
                let balance = totals.get(&user_id).copied().unwrap_or(0);
                if is_negligible(balance) {
                    return None;
                }
                let user_name = names.get(&user_id).cloned().unwrap_or_else(|| user_id.clone());
                Some(Balance {
                    user_id,
                    user_name,
                    balance,
                })
            })
            .collect()
    }
}
