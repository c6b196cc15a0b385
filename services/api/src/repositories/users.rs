//! User repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use ledger::badges::PaymentStreak;
use ledger::settlement::PaymentProfile;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;

use crate::models::user::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, username, display_name, email, venmo, paypal, avatar_url, rep_score, created_at, updated_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        venmo: row.get("venmo"),
        paypal: row.get("paypal"),
        avatar_url: row.get("avatar_url"),
        rep_score: row.get("rep_score"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Create a user if the id is unknown; existing users are left untouched
pub(crate) async fn ensure_user(tx: &mut Transaction<'_, Postgres>, user: &NewUser) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, display_name, email, avatar_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(&user.email)
    .bind(&user.avatar_url)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the user or update the provided fields
    pub async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, username, display_name, email, venmo, paypal, avatar_url)
            VALUES ($1, COALESCE($2, $1), COALESCE($3, $1), $1 || '@temp.com', $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                username = COALESCE($2, users.username),
                display_name = COALESCE($3, users.display_name),
                venmo = COALESCE($4, users.venmo),
                paypal = COALESCE($5, users.paypal),
                avatar_url = COALESCE($6, users.avatar_url),
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&update.user_id)
        .bind(&update.username)
        .bind(&update.display_name)
        .bind(&update.venmo)
        .bind(&update.paypal)
        .bind(&update.avatar_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Replace the stored payment handles
    pub async fn update_payment_profile(
        &self,
        id: &str,
        venmo: Option<&str>,
        paypal: Option<&str>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET venmo = $2, paypal = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(venmo)
        .bind(paypal)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Display names keyed by user id; unknown ids are absent
    pub async fn display_names(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT id, display_name FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("id"), row.get("display_name")))
            .collect())
    }

    /// Stored Venmo and PayPal handles keyed by user id
    pub async fn payment_profiles(&self, ids: &[String]) -> Result<HashMap<String, PaymentProfile>> {
        let rows = sqlx::query("SELECT id, venmo, paypal FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.get("id"),
                    PaymentProfile {
                        venmo: row.get("venmo"),
                        paypal: row.get("paypal"),
                    },
                )
            })
            .collect())
    }

    /// Count one more settled payment and return the updated streak
    pub async fn record_payment(
        &self,
        user_id: &str,
        quick: bool,
        amount_cents: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<PaymentStreak> {
        let first = PaymentStreak::default().record(quick, amount_cents);

        let row = sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, payments_on_time, consecutive_quick_pays, total_settled_cents, last_payment_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                payments_on_time = user_stats.payments_on_time + EXCLUDED.payments_on_time,
                consecutive_quick_pays = CASE WHEN $6 THEN user_stats.consecutive_quick_pays + 1 ELSE 0 END,
                total_settled_cents = user_stats.total_settled_cents + EXCLUDED.total_settled_cents,
                last_payment_at = EXCLUDED.last_payment_at
            RETURNING payments_on_time, consecutive_quick_pays, total_settled_cents
            "#,
        )
        .bind(user_id)
        .bind(first.payments_on_time)
        .bind(first.consecutive_quick_pays)
        .bind(first.total_settled_cents)
        .bind(paid_at)
        .bind(quick)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaymentStreak {
            payments_on_time: row.get("payments_on_time"),
            consecutive_quick_pays: row.get("consecutive_quick_pays"),
            total_settled_cents: row.get("total_settled_cents"),
        })
    }
}
