//! Payment repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::reminders::{insert_reminder, resolve_for_payment};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};
use crate::models::reminder::NewReminder;

const PAYMENT_COLUMNS: &str = r#"
    id, expense_id, from_user_id, to_user_id, amount_cents, method, status, settlement_id,
    venmo_link, paypal_link, links_verified, paid_at, created_at, updated_at
"#;

fn payment_from_row(row: &PgRow) -> Payment {
    let method: String = row.get("method");
    let status: String = row.get("status");

    Payment {
        id: row.get("id"),
        expense_id: row.get("expense_id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        amount_cents: row.get("amount_cents"),
        method: method.parse().unwrap_or_default(),
        status: status.parse().unwrap_or(PaymentStatus::Unpaid),
        settlement_id: row.get("settlement_id"),
        venmo_link: row.get("venmo_link"),
        paypal_link: row.get("paypal_link"),
        links_verified: row.get("links_verified"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Payment repository for database operations
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a payment request and schedule its first reminder
    pub async fn create(&self, payment: &NewPayment, reminder: &NewReminder) -> Result<Payment> {
        let mut tx = self.pool.begin().await?;
        let request = &payment.request;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (
                id, expense_id, from_user_id, to_user_id, amount_cents, method, status,
                settlement_id, venmo_link, paypal_link, links_verified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(request.expense_id)
        .bind(&request.from_user_id)
        .bind(&request.to_user_id)
        .bind(request.amount_cents)
        .bind(request.method.as_str())
        .bind(PaymentStatus::Unpaid.as_str())
        .bind(&request.settlement_id)
        .bind(&payment.venmo_link)
        .bind(&payment.paypal_link)
        .bind(payment.links_verified)
        .fetch_one(&mut *tx)
        .await?;

        let created = payment_from_row(&row);
        insert_reminder(&mut tx, Some(created.id), reminder).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Get a payment by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(payment_from_row))
    }

    /// Move an unpaid payment to processing
    ///
    /// Returns `None` when the payment is unknown or no longer unpaid.
    pub async fn mark_processing(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .bind(PaymentStatus::Processing.as_str())
        .bind(PaymentStatus::Unpaid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(payment_from_row))
    }

    /// Mark a payment paid and resolve its reminders
    ///
    /// Returns `None` when the payment is unknown or was already paid, so a
    /// repeated call never counts the same payment twice.
    pub async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<Option<Payment>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET status = $2, paid_at = $3, updated_at = NOW()
            WHERE id = $1 AND status <> $2
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(paid_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        resolve_for_payment(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(payment_from_row(&row)))
    }

    /// Paid payments on the live expenses of a group
    pub async fn list_paid_by_group(&self, group_id: &str) -> Result<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE status = $2
              AND expense_id IN (SELECT id FROM expenses WHERE group_id = $1 AND status <> 'deleted')
            ORDER BY paid_at ASC, id ASC
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(group_id)
        .bind(PaymentStatus::Paid.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(payment_from_row).collect())
    }

    /// Total a creditor has received through paid payments in a group
    pub async fn sum_paid_to(&self, group_id: &str, user_id: &str) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT
            FROM payments
            WHERE to_user_id = $2
              AND status = $3
              AND expense_id IN (SELECT id FROM expenses WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(PaymentStatus::Paid.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
