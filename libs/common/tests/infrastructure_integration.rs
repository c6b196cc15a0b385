//! Integration tests for the infrastructure components
//!
//! These tests verify that PostgreSQL is reachable and that the embedded
//! migrations produce the schema the services expect.

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use serial_test::serial;
use sqlx::Row;

/// Test that verifies PostgreSQL is accessible and can run a query
#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    Ok(())
}

/// Migrations are idempotent and create every table
#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_migrations_create_schema() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    run_migrations(&pool).await?;
    run_migrations(&pool).await?;

    for table in [
        "users",
        "groups",
        "group_members",
        "expenses",
        "payments",
        "badges",
        "pending_receipts",
        "user_stats",
        "reminders",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await?;
        assert!(exists, "table {} is missing", table);
    }

    Ok(())
}
