//! Badge repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use ledger::badges::{AwardPeriod, BadgeType};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::badge::Badge;

/// Badge repository for database operations
#[derive(Clone)]
pub struct BadgeRepository {
    pool: PgPool,
}

impl BadgeRepository {
    /// Create a new badge repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Award a badge for the month containing `awarded_at`
    ///
    /// Returns false when the user already holds this badge in the group for
    /// that month. The unique index decides, so concurrent awards insert once.
    pub async fn award(
        &self,
        user_id: &str,
        group_id: &str,
        badge_type: BadgeType,
        metadata: &serde_json::Value,
        awarded_at: DateTime<Utc>,
    ) -> Result<bool> {
        let period = AwardPeriod::containing(awarded_at);

        let result = sqlx::query(
            r#"
            INSERT INTO badges (id, user_id, group_id, badge_type, year, month, metadata, awarded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, group_id, badge_type, year, month) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(group_id)
        .bind(badge_type.as_str())
        .bind(period.year)
        .bind(period.month as i32)
        .bind(metadata)
        .bind(awarded_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Badges of a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        period: Option<AwardPeriod>,
    ) -> Result<Vec<Badge>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, group_id, badge_type, year, month, metadata, awarded_at
            FROM badges
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR group_id = $2)
              AND ($3::INT IS NULL OR (year = $3 AND month = $4))
            ORDER BY awarded_at DESC
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(period.map(|p| p.year))
        .bind(period.map(|p| p.month as i32))
        .fetch_all(&self.pool)
        .await?;

        let mut badges = Vec::with_capacity(rows.len());
        for row in rows {
            let badge_type: String = row.get("badge_type");
            badges.push(Badge {
                id: row.get("id"),
                user_id: row.get("user_id"),
                group_id: row.get("group_id"),
                badge_type: badge_type.parse()?,
                year: row.get("year"),
                month: row.get("month"),
                metadata: row.get("metadata"),
                awarded_at: row.get("awarded_at"),
            });
        }

        Ok(badges)
    }
}
