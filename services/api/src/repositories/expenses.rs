//! Expense repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::decode_json;
use super::users::ensure_user;
use crate::models::expense::{Expense, NewExpense, STATUS_DELETED, STATUS_PENDING};
use crate::models::user::NewUser;

const EXPENSE_COLUMNS: &str = r#"
    id, group_id, payer_id, merchant, description, amount_cents, currency, split_type,
    split_groups, participants, participant_names, receipt_image_url, ocr_data, status,
    created_at, updated_at
"#;

pub(crate) fn expense_from_row(row: &PgRow) -> Expense {
    let split_type: String = row.get("split_type");

    Expense {
        id: row.get("id"),
        group_id: row.get("group_id"),
        payer_id: row.get("payer_id"),
        merchant: row.get("merchant"),
        description: row.get("description"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        split_type: split_type.parse().unwrap_or_default(),
        split_groups: decode_json(row.get("split_groups")),
        participants: row.get("participants"),
        participant_names: row
            .get::<Option<serde_json::Value>, _>("participant_names")
            .map(|v| decode_json(Some(v))),
        receipt_image_url: row.get("receipt_image_url"),
        ocr_data: row.get("ocr_data"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert an expense together with its users, group and memberships
///
/// Everything happens on the caller's transaction so that a failure leaves
/// no half-created group behind.
pub(crate) async fn insert_expense(
    tx: &mut Transaction<'_, Postgres>,
    expense: &NewExpense,
) -> Result<Expense> {
    let names = expense.participant_names.clone().unwrap_or_default();

    for member in std::iter::once(&expense.payer_id).chain(expense.participants.iter()) {
        let user = NewUser::placeholder(member, names.get(member).map(String::as_str));
        ensure_user(tx, &user).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO groups (id, name)
        VALUES ($1, $1)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&expense.group_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id, role)
        SELECT $1, member, 'member' FROM UNNEST($2::TEXT[]) AS member
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(&expense.group_id)
    .bind(
        std::iter::once(expense.payer_id.clone())
            .chain(expense.participants.iter().cloned())
            .collect::<Vec<String>>(),
    )
    .execute(&mut **tx)
    .await?;

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO expenses (
            id, group_id, payer_id, merchant, description, amount_cents, currency, split_type,
            split_groups, participants, participant_names, receipt_image_url, ocr_data, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        EXPENSE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&expense.group_id)
    .bind(&expense.payer_id)
    .bind(&expense.merchant)
    .bind(&expense.description)
    .bind(expense.amount_cents)
    .bind(&expense.currency)
    .bind(expense.split_type.as_str())
    .bind((!expense.split_groups.is_empty()).then(|| Json(&expense.split_groups)))
    .bind(&expense.participants)
    .bind(expense.participant_names.as_ref().map(Json))
    .bind(&expense.receipt_image_url)
    .bind(&expense.ocr_data)
    .bind(STATUS_PENDING)
    .fetch_one(&mut **tx)
    .await?;

    Ok(expense_from_row(&row))
}

/// Expense repository for database operations
#[derive(Clone)]
pub struct ExpenseRepository {
    pool: PgPool,
}

impl ExpenseRepository {
    /// Create a new expense repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated expense
    pub async fn create(&self, expense: &NewExpense) -> Result<Expense> {
        let mut tx = self.pool.begin().await?;
        let created = insert_expense(&mut tx, expense).await?;
        tx.commit().await?;

        Ok(created)
    }

    /// Get an expense by ID, deleted or not
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!("SELECT {} FROM expenses WHERE id = $1", EXPENSE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(expense_from_row))
    }

    /// Expenses of a group, newest first
    pub async fn list_by_group(&self, group_id: &str, include_deleted: bool) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM expenses
            WHERE group_id = $1 AND ($2 OR status <> $3)
            ORDER BY created_at DESC, id DESC
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(group_id)
        .bind(include_deleted)
        .bind(STATUS_DELETED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(expense_from_row).collect())
    }

    /// Live expenses of a group in creation order, as balances need them
    pub async fn list_active(&self, group_id: &str) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM expenses
            WHERE group_id = $1 AND status <> $2
            ORDER BY created_at ASC, id ASC
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(group_id)
        .bind(STATUS_DELETED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(expense_from_row).collect())
    }

    /// Live expenses a user paid for in a group since the given instant
    pub async fn list_paid_by_since(
        &self,
        group_id: &str,
        payer_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM expenses
            WHERE group_id = $1 AND payer_id = $2 AND created_at >= $3 AND status <> $4
            ORDER BY created_at ASC, id ASC
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(group_id)
        .bind(payer_id)
        .bind(since)
        .bind(STATUS_DELETED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(expense_from_row).collect())
    }

    /// Persist an edited expense
    pub async fn update(&self, expense: &Expense) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE expenses
            SET merchant = $2, description = $3, amount_cents = $4, participants = $5,
                participant_names = $6, split_type = $7, split_groups = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense.id)
        .bind(&expense.merchant)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(&expense.participants)
        .bind(expense.participant_names.as_ref().map(Json))
        .bind(expense.split_type.as_str())
        .bind((!expense.split_groups.is_empty()).then(|| Json(&expense.split_groups)))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(expense_from_row))
    }

    /// Mark an expense deleted; returns false when the id is unknown
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(STATUS_DELETED)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Physically remove every expense of a group and the payments on them
    pub async fn clear_group(&self, group_id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM payments
            WHERE expense_id IN (SELECT id FROM expenses WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM expenses WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Display name of a group, falling back to its id
    pub async fn group_name(&self, group_id: &str) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(name.unwrap_or_else(|| group_id.to_string()))
    }
}
