//! Reminder repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::reminder::{
    NewReminder, Reminder, STATUS_EXHAUSTED, STATUS_PENDING, STATUS_RESOLVED,
};

const REMINDER_COLUMNS: &str = r#"
    id, payment_id, group_id, group_name, debtor_user_id, debtor_user_name,
    creditor_user_name, amount_cents, reminder_count, next_reminder_at,
    last_reminder_sent_at, status, created_at, updated_at
"#;

fn reminder_from_row(row: &PgRow) -> Reminder {
    Reminder {
        id: row.get("id"),
        payment_id: row.get("payment_id"),
        group_id: row.get("group_id"),
        group_name: row.get("group_name"),
        debtor_user_id: row.get("debtor_user_id"),
        debtor_user_name: row.get("debtor_user_name"),
        creditor_user_name: row.get("creditor_user_name"),
        amount_cents: row.get("amount_cents"),
        reminder_count: row.get("reminder_count"),
        next_reminder_at: row.get("next_reminder_at"),
        last_reminder_sent_at: row.get("last_reminder_sent_at"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(crate) async fn insert_reminder(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Option<Uuid>,
    reminder: &NewReminder,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO reminders (
            id, payment_id, group_id, group_name, debtor_user_id, debtor_user_name,
            creditor_user_name, amount_cents, next_reminder_at, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(payment_id)
    .bind(&reminder.group_id)
    .bind(&reminder.group_name)
    .bind(&reminder.debtor_user_id)
    .bind(&reminder.debtor_user_name)
    .bind(&reminder.creditor_user_name)
    .bind(reminder.amount_cents)
    .bind(reminder.next_reminder_at)
    .bind(STATUS_PENDING)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

pub(crate) async fn resolve_for_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reminders
        SET status = $2, updated_at = NOW()
        WHERE payment_id = $1 AND status = $3
        "#,
    )
    .bind(payment_id)
    .bind(STATUS_RESOLVED)
    .bind(STATUS_PENDING)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Reminder repository for database operations
#[derive(Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    /// Create a new reminder repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pending reminders whose next send time has passed, oldest first
    pub async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Reminder>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM reminders
            WHERE status = $1 AND next_reminder_at <= $2
            ORDER BY next_reminder_at ASC
            LIMIT $3
            "#,
            REMINDER_COLUMNS
        ))
        .bind(STATUS_PENDING)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(reminder_from_row).collect())
    }

    /// Record a delivered reminder
    ///
    /// `next_at` of `None` means no further reminder will be sent.
    pub async fn record_sent(
        &self,
        id: Uuid,
        reminder_count: i32,
        next_at: Option<DateTime<Utc>>,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let status = if next_at.is_some() {
            STATUS_PENDING
        } else {
            STATUS_EXHAUSTED
        };

        sqlx::query(
            r#"
            UPDATE reminders
            SET reminder_count = $2,
                next_reminder_at = COALESCE($3, next_reminder_at),
                last_reminder_sent_at = $4,
                status = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reminder_count)
        .bind(next_at)
        .bind(sent_at)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
