//! Pending receipt repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use ledger::receipts::expires_at;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::decode_json;
use super::expenses::insert_expense;
use crate::models::expense::{Expense, NewExpense};
use crate::models::receipt::{NewPendingReceipt, PendingReceipt};

const RECEIPT_COLUMNS: &str = r#"
    id, user_id, user_name, group_id, message_id, image_url, ocr_result, total_cents,
    merchant, caption, participants, participant_names, flagged_for_review, created_at,
    expires_at
"#;

fn receipt_from_row(row: &PgRow) -> PendingReceipt {
    PendingReceipt {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        group_id: row.get("group_id"),
        message_id: row.get("message_id"),
        image_url: row.get("image_url"),
        ocr_result: row.get("ocr_result"),
        total_cents: row.get("total_cents"),
        merchant: row.get("merchant"),
        caption: row.get("caption"),
        participants: row.get("participants"),
        participant_names: row
            .get::<Option<serde_json::Value>, _>("participant_names")
            .map(|v| decode_json(Some(v))),
        flagged_for_review: row.get("flagged_for_review"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

/// Pending receipt repository for database operations
#[derive(Clone)]
pub struct ReceiptRepository {
    pool: PgPool,
}

impl ReceiptRepository {
    /// Create a new pending receipt repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a receipt, replacing any earlier one of the same user and group
    ///
    /// Expired receipts of every user are purged first.
    pub async fn store(&self, receipt: &NewPendingReceipt, now: DateTime<Utc>) -> Result<PendingReceipt> {
        let purged = self.purge_expired(now).await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired pending receipts", purged);
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO pending_receipts (
                id, user_id, user_name, group_id, message_id, image_url, ocr_result, total_cents,
                merchant, caption, participants, participant_names, flagged_for_review,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (user_id, group_id) DO UPDATE SET
                id = EXCLUDED.id,
                user_name = EXCLUDED.user_name,
                message_id = EXCLUDED.message_id,
                image_url = EXCLUDED.image_url,
                ocr_result = EXCLUDED.ocr_result,
                total_cents = EXCLUDED.total_cents,
                merchant = EXCLUDED.merchant,
                caption = EXCLUDED.caption,
                participants = EXCLUDED.participants,
                participant_names = EXCLUDED.participant_names,
                flagged_for_review = EXCLUDED.flagged_for_review,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            RETURNING {}
            "#,
            RECEIPT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&receipt.user_id)
        .bind(&receipt.user_name)
        .bind(&receipt.group_id)
        .bind(receipt.message_id)
        .bind(&receipt.image_url)
        .bind(&receipt.ocr_result)
        .bind(receipt.total_cents)
        .bind(&receipt.merchant)
        .bind(&receipt.caption)
        .bind(&receipt.participants)
        .bind(receipt.participant_names.as_ref().map(Json))
        .bind(receipt.flagged_for_review)
        .bind(now)
        .bind(expires_at(now))
        .fetch_one(&self.pool)
        .await?;

        Ok(receipt_from_row(&row))
    }

    /// The live receipt of a user in a group, if any
    pub async fn find_live(
        &self,
        user_id: &str,
        group_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingReceipt>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM pending_receipts
            WHERE user_id = $1 AND group_id = $2 AND expires_at > $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            RECEIPT_COLUMNS
        ))
        .bind(user_id)
        .bind(group_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(receipt_from_row))
    }

    /// Get a receipt by ID regardless of expiry
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PendingReceipt>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pending_receipts WHERE id = $1",
            RECEIPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(receipt_from_row))
    }

    /// Create the expense and drop the receipt in one transaction
    ///
    /// Returns `None` when the receipt was already consumed or expired by
    /// the time the transaction ran.
    pub async fn confirm(
        &self,
        receipt_id: Uuid,
        expense: &NewExpense,
        now: DateTime<Utc>,
    ) -> Result<Option<Expense>> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM pending_receipts WHERE id = $1 AND expires_at > $2")
            .bind(receipt_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let created = insert_expense(&mut tx, expense).await?;
        tx.commit().await?;

        Ok(Some(created))
    }

    /// Delete receipts past their expiry
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_receipts WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
