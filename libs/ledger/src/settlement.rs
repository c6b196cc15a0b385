//! Settlement reduction
//!
//! Turns net balances into a short list of pairwise transfers with a greedy
//! two-pointer match of the largest creditor against the largest debtor.
//! The result is not always the minimum number of transfers, but it is
//! bounded by `creditors + debtors - 1` and fully deterministic: both sides
//! are stable-sorted, so equal balances keep their input order.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::balances::Balance;
use crate::links::{paypal_link, venmo_link};
use crate::money::{Cents, ROUNDING_TOLERANCE};

/// A proposed transfer between two users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount_cents: Cents,
}

/// Reduce balances to a list of transfers from debtors to creditors
pub fn reduce(balances: &[Balance]) -> Vec<Transfer> {
    let mut creditors: Vec<(&str, Cents)> = balances
        .iter()
        .filter(|b| b.balance > 0)
        .map(|b| (b.user_id.as_str(), b.balance))
        .collect();
    let mut debtors: Vec<(&str, Cents)> = balances
        .iter()
        .filter(|b| b.balance < 0)
        .map(|b| (b.user_id.as_str(), b.balance))
        .collect();

    // sort_by is stable
    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| a.1.cmp(&b.1));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < creditors.len() && j < debtors.len() {
        let (creditor, credit) = creditors[i];
        let (debtor, debt) = debtors[j];
        let amount = credit.min(debt.abs());

        if amount > ROUNDING_TOLERANCE {
            transfers.push(Transfer {
                from: debtor.to_string(),
                to: creditor.to_string(),
                amount_cents: amount,
            });
        }

        creditors[i].1 -= amount;
        debtors[j].1 += amount;

        if creditors[i].1 <= ROUNDING_TOLERANCE {
            i += 1;
        }
        if debtors[j].1.abs() <= ROUNDING_TOLERANCE {
            j += 1;
        }
    }

    transfers
}

/// Identifier carried from a computed settlement to the payment that pays it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SettlementId(String);

impl SettlementId {
    pub fn new(group_id: &str, transfer: &Transfer) -> Self {
        Self(format!(
            "{}:{}:{}:{}",
            group_id, transfer.from, transfer.to, transfer.amount_cents
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment already marked as paid
#[derive(Debug, Clone)]
pub struct PaidPayment {
    pub settlement_id: Option<String>,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_cents: Cents,
}

/// Lookup of which settlements are already paid
///
/// Payments that carry a settlement id match on it. Older payments without
/// one fall back to the (debtor, creditor, amount) triple.
#[derive(Debug, Default)]
pub struct PaidIndex {
    ids: HashSet<String>,
    triples: HashSet<(String, String, Cents)>,
}

impl PaidIndex {
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a PaidPayment>) -> Self {
        let mut index = Self::default();
        for payment in payments {
            match &payment.settlement_id {
                Some(id) => {
                    index.ids.insert(id.clone());
                }
                None => {
                    index.triples.insert((
                        payment.from_user_id.clone(),
                        payment.to_user_id.clone(),
                        payment.amount_cents,
                    ));
                }
            }
        }
        index
    }

    pub fn is_paid(&self, id: &SettlementId, transfer: &Transfer) -> bool {
        self.ids.contains(id.as_str())
            || self.triples.contains(&(
                transfer.from.clone(),
                transfer.to.clone(),
                transfer.amount_cents,
            ))
    }
}

/// Stored payment handles of a user
#[derive(Debug, Clone, Default)]
pub struct PaymentProfile {
    pub venmo: Option<String>,
    pub paypal: Option<String>,
}

/// A settlement as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub settlement_id: SettlementId,
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
    pub amount_cents: Cents,
    pub venmo_link: String,
    pub paypal_link: String,
    pub venmo_link_verified: bool,
    pub paypal_link_verified: bool,
    pub is_paid: bool,
}

/// Attach names, payment links and paid status to raw transfers
pub fn annotate(
    group_id: &str,
    transfers: Vec<Transfer>,
    balances: &[Balance],
    profiles: &HashMap<String, PaymentProfile>,
    paid: &PaidIndex,
) -> Vec<Settlement> {
    let names: HashMap<&str, &str> = balances
        .iter()
        .map(|b| (b.user_id.as_str(), b.user_name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).map(|n| n.to_string()).unwrap_or_else(|| id.to_string());
    let empty = PaymentProfile::default();

    transfers
        .into_iter()
        .map(|transfer| {
            let settlement_id = SettlementId::new(group_id, &transfer);
            let is_paid = paid.is_paid(&settlement_id, &transfer);
            let to_name = name_of(&transfer.to);
            let profile = profiles.get(&transfer.to).unwrap_or(&empty);
            let venmo = venmo_link(profile.venmo.as_deref(), &to_name, transfer.amount_cents);
            let paypal = paypal_link(profile.paypal.as_deref(), &to_name, transfer.amount_cents);

            Settlement {
                settlement_id,
                from_name: name_of(&transfer.from),
                to_name,
                from: transfer.from,
                to: transfer.to,
                amount_cents: transfer.amount_cents,
                venmo_link: venmo.url,
                paypal_link: paypal.url,
                venmo_link_verified: venmo.verified,
                paypal_link_verified: paypal.verified,
                is_paid,
            }
        })
        .collect()
}

/// Totals shown next to the settlement list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub total_owed: Cents,
    pub total_debt: Cents,
    pub total_settlements: usize,
    pub unpaid_settlements: usize,
    pub paid_settlements: usize,
    pub total_unpaid_amount: Cents,
}

impl SettlementSummary {
    pub fn new(balances: &[Balance], settlements: &[Settlement]) -> Self {
        let unpaid: Vec<&Settlement> = settlements.iter().filter(|s| !s.is_paid).collect();

        Self {
            total_owed: balances.iter().filter(|b| b.balance > 0).map(|b| b.balance).sum(),
            total_debt: balances.iter().filter(|b| b.balance < 0).map(|b| -b.balance).sum(),
            total_settlements: settlements.len(),
            unpaid_settlements: unpaid.len(),
            paid_settlements: settlements.len() - unpaid.len(),
            total_unpaid_amount: unpaid.iter().map(|s| s.amount_cents).sum(),
        }
    }
}
