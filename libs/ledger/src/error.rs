//! Error types for invalid ledger input

use thiserror::Error;

use crate::money::Cents;

/// Domain validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Expense amounts are counted in minor units and cannot go below zero
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Cents),

    #[error("Amount exceeds the maximum of {max}: {amount}")]
    AmountTooLarge { amount: Cents, max: Cents },

    /// A split needs someone to split with
    #[error("Expense needs at least one participant")]
    NoParticipants,

    /// An overlapping split was requested without any split groups
    #[error("Overlapping split requires split groups")]
    MissingSplitGroups,

    /// A split group that would leave its members owing nothing
    #[error("Split group {0} has no participants or no share")]
    EmptySplitGroup(String),

    #[error("Unknown split type: {0}")]
    UnknownSplitType(String),

    #[error("Unknown badge type: {0}")]
    UnknownBadgeType(String),

    #[error("Unknown remainder policy: {0}")]
    UnknownRemainderPolicy(String),
}

/// Type alias for Result with LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;
