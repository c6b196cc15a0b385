//! Overlapping split helpers
//!
//! Detecting an overlapping split is a cheap regex pre-filter that runs
//! before any language-model call. Dividing the total across the extracted
//! groups is deterministic: every group gets the floor share and the
//! remainder goes entirely to the first group.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::expense::SplitGroup;
use crate::money::Cents;

/// Minimum number of groups for a split to count as overlapping
pub const MIN_SPLIT_GROUPS: usize = 2;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile overlapping split regex")
}

/// Heuristic check for phrasing like "split into two halves" or "h1 ... h2"
pub fn looks_overlapping(text: &str) -> bool {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    static MARKERS: OnceLock<Regex> = OnceLock::new();

    let patterns = PATTERNS.get_or_init(|| {
        vec![
            compile(r"(?i)split\s+(?:this|the|into)?\s*(?:into|in)?\s+(?:two|2|three|3)\s+(?:halves?|groups?|ways?)"),
            compile(r"(?i)(?:divided?|split)\s+in\s+half"),
            compile(r"(?i)(?:half|group)\s*(?:1|2|one|two|first|second|a|b)"),
            compile(r"(?i)\bh[12]\b"),
        ]
    });

    if patterns.iter().any(|p| p.is_match(text)) {
        return true;
    }

    let markers = MARKERS.get_or_init(|| compile(r"(?i)(?:half|group|h\d)"));
    markers.find_iter(text).count() >= 2
}

/// A group as extracted from free text, before any money is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedGroup {
    pub name: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Assign each group its part of the total
///
/// Groups without participants are dropped first. Returns an empty list
/// when fewer than two groups remain, meaning the split is not overlapping.
pub fn divide_among_groups(total_cents: Cents, groups: Vec<NamedGroup>) -> Vec<SplitGroup> {
    let groups: Vec<NamedGroup> = groups
        .into_iter()
        .filter(|g| !g.participants.is_empty())
        .collect();

    if groups.len() < MIN_SPLIT_GROUPS {
        return Vec::new();
    }

    let mut groups: Vec<SplitGroup> = groups
        .into_iter()
        .map(|group| SplitGroup {
            name: group.name,
            participants: group.participants,
            total_cents: 0,
            per_person_cents: 0,
        })
        .collect();
    assign_totals(total_cents, &mut groups);
    groups
}

/// Price split groups that arrived with names and members only
///
/// When every group lacks both a total and a per-person share, the expense
/// total is divided among them the same way as [`divide_among_groups`].
/// Groups that already carry amounts are returned untouched.
pub fn fill_missing_totals(total_cents: Cents, mut groups: Vec<SplitGroup>) -> Vec<SplitGroup> {
    if !groups.is_empty() && groups.iter().all(SplitGroup::is_unpriced) {
        assign_totals(total_cents, &mut groups);
    }
    groups
}

fn assign_totals(total_cents: Cents, groups: &mut [SplitGroup]) {
    let count = groups.len() as Cents;
    let per_group = total_cents / count;
    let remainder = total_cents - per_group * count;

    for (index, group) in groups.iter_mut().enumerate() {
        group.total_cents = per_group + if index == 0 { remainder } else { 0 };
        group.per_person_cents = match group.participants.len() as Cents {
            0 => 0,
            members => group.total_cents / members,
        };
    }
}

/// What one participant owes across all the groups they belong to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantShare {
    pub groups: Vec<String>,
    pub total_cents: Cents,
}

pub fn participant_breakdown(groups: &[SplitGroup]) -> BTreeMap<String, ParticipantShare> {
    let mut breakdown: BTreeMap<String, ParticipantShare> = BTreeMap::new();
    for group in groups {
        for participant in &group.participants {
            let share = breakdown.entry(participant.clone()).or_default();
            share.groups.push(group.name.clone());
            share.total_cents += group.share();
        }
    }
    breakdown
}
