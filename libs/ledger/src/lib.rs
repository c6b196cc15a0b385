//! Domain logic for the group expense ledger
//!
//! Everything in this crate is pure: it takes expenses, payments and
//! profiles that were already loaded by a service and turns them into
//! balances, settlements, badge decisions and reminder schedules. No I/O
//! happens here, which keeps the rules testable without a database.

pub mod badges;
pub mod balances;
pub mod error;
pub mod expense;
pub mod links;
pub mod money;
pub mod receipts;
pub mod reminders;
pub mod settlement;
pub mod splits;

pub use balances::{Balance, BalanceSheet};
pub use error::{LedgerError, LedgerResult};
pub use expense::{ExpenseEntry, RemainderPolicy, SplitGroup, SplitType};
pub use money::Cents;
pub use settlement::{Settlement, SettlementId, Transfer};
