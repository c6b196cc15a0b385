//! Expense split model
//!
//! An expense is paid by one user and shared by a list of participants,
//! either evenly (`simple`) or through named split groups whose members may
//! overlap (`overlapping`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};
use crate::money::{Cents, MAX_AMOUNT_CENTS};

/// How an expense is divided among its participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Even division among all participants
    #[default]
    Simple,
    /// Named sub-groups, each with its own per-person share
    Overlapping,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Simple => "simple",
            SplitType::Overlapping => "overlapping",
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(SplitType::Simple),
            "overlapping" => Ok(SplitType::Overlapping),
            other => Err(LedgerError::UnknownSplitType(other.to_string())),
        }
    }
}

/// Who absorbs the remainder of an uneven simple split
///
/// With `Payer`, participants are debited the floor share and the payer is
/// credited the full amount, so the payer keeps `amount % count` minor
/// units. With `RoundRobin`, the first `amount % count` participants pay
/// one extra minor unit each and the debits add up to the amount exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    #[default]
    Payer,
    RoundRobin,
}

impl FromStr for RemainderPolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payer" => Ok(RemainderPolicy::Payer),
            "round_robin" => Ok(RemainderPolicy::RoundRobin),
            other => Err(LedgerError::UnknownRemainderPolicy(other.to_string())),
        }
    }
}

/// A named subset of participants sharing part of an overlapping expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitGroup {
    pub name: String,
    pub participants: Vec<String>,
    #[serde(default)]
    pub total_cents: Cents,
    #[serde(default)]
    pub per_person_cents: Cents,
}

impl SplitGroup {
    /// True when neither a group total nor a per-person share was given
    pub fn is_unpriced(&self) -> bool {
        self.total_cents == 0 && self.per_person_cents == 0
    }

    /// Amount each member of this group owes
    ///
    /// Uses the stored per-person share, or derives it from the group total
    /// when the share was never computed.
    pub fn share(&self) -> Cents {
        if self.per_person_cents > 0 {
            self.per_person_cents
        } else if self.participants.is_empty() {
            0
        } else {
            self.total_cents / self.participants.len() as Cents
        }
    }
}

/// The parts of an expense that matter for balances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseEntry {
    pub payer_id: String,
    pub amount_cents: Cents,
    pub participants: Vec<String>,
    pub split_type: SplitType,
    pub split_groups: Vec<SplitGroup>,
}

impl ExpenseEntry {
    /// Build a simple, evenly split expense
    pub fn simple(payer_id: impl Into<String>, amount_cents: Cents, participants: &[&str]) -> Self {
        Self {
            payer_id: payer_id.into(),
            amount_cents,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            split_type: SplitType::Simple,
            split_groups: Vec::new(),
        }
    }

    /// Build an overlapping expense from already divided split groups
    pub fn overlapping(
        payer_id: impl Into<String>,
        amount_cents: Cents,
        split_groups: Vec<SplitGroup>,
    ) -> Self {
        let mut participants: Vec<String> = Vec::new();
        for group in &split_groups {
            for participant in &group.participants {
                if !participants.contains(participant) {
                    participants.push(participant.clone());
                }
            }
        }

        Self {
            payer_id: payer_id.into(),
            amount_cents,
            participants,
            split_type: SplitType::Overlapping,
            split_groups,
        }
    }

    /// Check the invariants an expense must hold before it is stored
    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount_cents < 0 {
            return Err(LedgerError::NegativeAmount(self.amount_cents));
        }

        if self.amount_cents > MAX_AMOUNT_CENTS {
            return Err(LedgerError::AmountTooLarge {
                amount: self.amount_cents,
                max: MAX_AMOUNT_CENTS,
            });
        }

        if self.participants.is_empty() {
            return Err(LedgerError::NoParticipants);
        }

        if self.split_type == SplitType::Overlapping && self.split_groups.is_empty() {
            return Err(LedgerError::MissingSplitGroups);
        }

        if self.split_type == SplitType::Overlapping && self.amount_cents > 0 {
            if let Some(group) = self
                .split_groups
                .iter()
                .find(|g| g.participants.is_empty() || g.share() <= 0)
            {
                return Err(LedgerError::EmptySplitGroup(group.name.clone()));
            }
        }

        Ok(())
    }

    /// Per-participant debits in split order
    ///
    /// For overlapping splits a participant appears once per split group it
    /// belongs to. An overlapping expense without split groups is treated as
    /// a simple split.
    pub fn debits(&self, policy: RemainderPolicy) -> Vec<(&str, Cents)> {
        if self.split_type == SplitType::Overlapping && !self.split_groups.is_empty() {
            return self
                .split_groups
                .iter()
                .flat_map(|group| {
                    let share = group.share();
                    group.participants.iter().map(move |p| (p.as_str(), share))
                })
                .collect();
        }

        if self.participants.is_empty() {
            return Vec::new();
        }

        let count = self.participants.len() as Cents;
        let share = self.amount_cents / count;
        let remainder = self.amount_cents % count;

        self.participants
            .iter()
            .enumerate()
            .map(|(index, participant)| {
                let extra = match policy {
                    RemainderPolicy::RoundRobin if (index as Cents) < remainder => 1,
                    _ => 0,
                };
                (participant.as_str(), share + extra)
            })
            .collect()
    }

    /// Total a given user owes on this expense
    pub fn share_of(&self, user_id: &str, policy: RemainderPolicy) -> Cents {
        self.debits(policy)
            .into_iter()
            .filter(|(participant, _)| *participant == user_id)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Everybody involved in the expense, payer first, without duplicates
    pub fn members(&self) -> Vec<&str> {
        let mut members = vec![self.payer_id.as_str()];
        for participant in self.debits(RemainderPolicy::Payer).into_iter().map(|(p, _)| p) {
            if !members.contains(&participant) {
                members.push(participant);
            }
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_debits_floor_share() {
        let expense = ExpenseEntry::simple("p1", 1000, &["p1", "p2", "p3"]);
        let debits = expense.debits(RemainderPolicy::Payer);

        assert_eq!(debits, vec![("p1", 333), ("p2", 333), ("p3", 333)]);
    }

    #[test]
    fn test_round_robin_debits_sum_to_amount() {
        let expense = ExpenseEntry::simple("p1", 1001, &["p1", "p2", "p3"]);
        let debits = expense.debits(RemainderPolicy::RoundRobin);

        assert_eq!(debits, vec![("p1", 334), ("p2", 334), ("p3", 333)]);
        assert_eq!(debits.iter().map(|(_, a)| a).sum::<Cents>(), 1001);
    }

    #[test]
    fn test_overlapping_debits_repeat_shared_member() {
        let groups = vec![
            SplitGroup {
                name: "Half 1".to_string(),
                participants: vec!["boom".into(), "ken".into(), "jessi".into()],
                total_cents: 4500,
                per_person_cents: 1500,
            },
            SplitGroup {
                name: "Half 2".to_string(),
                participants: vec!["boom".into(), "ann".into(), "gil".into()],
                total_cents: 4500,
                per_person_cents: 1500,
            },
        ];
        let expense = ExpenseEntry::overlapping("boom", 9000, groups);

        assert_eq!(expense.share_of("boom", RemainderPolicy::Payer), 3000);
        assert_eq!(expense.share_of("ken", RemainderPolicy::Payer), 1500);
        assert_eq!(expense.participants.len(), 5);
    }

    #[test]
    fn test_split_group_share_derived_from_total() {
        let group = SplitGroup {
            name: "table".to_string(),
            participants: vec!["a".into(), "b".into()],
            total_cents: 1001,
            per_person_cents: 0,
        };
        assert_eq!(group.share(), 500);
    }

    #[test]
    fn test_validate_rejects_bad_expenses() {
        let mut expense = ExpenseEntry::simple("p1", -5, &["p1"]);
        assert_eq!(expense.validate(), Err(LedgerError::NegativeAmount(-5)));

        expense.amount_cents = 100;
        expense.participants.clear();
        assert_eq!(expense.validate(), Err(LedgerError::NoParticipants));

        let overlapping = ExpenseEntry {
            split_type: SplitType::Overlapping,
            ..ExpenseEntry::simple("p1", 100, &["p1"])
        };
        assert_eq!(overlapping.validate(), Err(LedgerError::MissingSplitGroups));
    }

    #[test]
    fn test_validate_rejects_unpriced_split_groups() {
        let groups: Vec<SplitGroup> = serde_json::from_str(
            r#"[{"name":"Half 1","participants":["a","b","c"]},{"name":"Half 2","participants":["a","d","e"]}]"#,
        )
        .unwrap();
        let expense = ExpenseEntry::overlapping("payer", 9000, groups);

        assert_eq!(
            expense.validate(),
            Err(LedgerError::EmptySplitGroup("Half 1".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_amounts_above_maximum() {
        let expense = ExpenseEntry::simple("p", i64::MAX, &["q"]);
        assert_eq!(
            expense.validate(),
            Err(LedgerError::AmountTooLarge {
                amount: i64::MAX,
                max: MAX_AMOUNT_CENTS
            })
        );

        let largest = ExpenseEntry::simple("p", MAX_AMOUNT_CENTS, &["q"]);
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_split_type_round_trips_through_str() {
        assert_eq!("simple".parse::<SplitType>(), Ok(SplitType::Simple));
        assert_eq!(SplitType::Overlapping.as_str(), "overlapping");
        assert!("weighted".parse::<SplitType>().is_err());
    }

    #[test]
    fn test_members_lists_payer_first() {
        let expense = ExpenseEntry::simple("p3", 900, &["p1", "p2", "p3"]);
        assert_eq!(expense.members(), vec!["p3", "p1", "p2"]);
    }
}
