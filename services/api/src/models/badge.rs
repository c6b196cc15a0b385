//! Badge models

use chrono::{DateTime, Utc};
use ledger::badges::BadgeType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An awarded badge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: Uuid,
    pub user_id: String,
    pub group_id: String,
    pub badge_type: BadgeType,
    pub year: i32,
    pub month: i32,
    pub metadata: serde_json::Value,
    pub awarded_at: DateTime<Utc>,
}

/// Query parameters for badge listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeQuery {
    pub group_id: Option<String>,
    #[serde(default)]
    pub this_month: bool,
}

/// Request to award a badge by hand
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardBadgeRequest {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub badge_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
