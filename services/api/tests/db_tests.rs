//! End-to-end tests against a real PostgreSQL instance
//!
//! Run with `DATABASE_URL` pointing at a scratch database and
//! `--ignored`. Every test works in its own freshly named group.

mod support;

use api::models::expense::{CreateExpenseRequest, NewExpense};
use api::models::user::ProfileUpdate;
use api::repositories::{BadgeRepository, ReceiptRepository, UserRepository};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::database::{DatabaseConfig, init_pool, run_migrations};
use ledger::badges::BadgeType;
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::PgPool;
use support::{StubModel, extract_json, json_request, setup_app, test_request};
use tower::util::ServiceExt;
use uuid::Uuid;

async fn setup_db() -> PgPool {
    let config = DatabaseConfig::from_env().expect("Failed to load database config");
    let pool = init_pool(&config).await.expect("Failed to connect to database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

async fn call(app: &axum::Router, request: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_settlement_flow_marks_settlements_paid() {
    let pool = setup_db().await;
    let app = setup_app(pool, StubModel::default());
    let group = unique("g");
    let (p1, p2, p3) = (unique("p1"), unique("p2"), unique("p3"));

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/expenses",
            json!({
                "groupId": group,
                "payerId": p1,
                "description": "Dinner",
                "amountCents": 6000,
                "participants": [p1, p2, p3]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let expense_id = body["expense"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, test_request("GET", &format!("/settlements/{}", group))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balances"][0]["userId"], p1.as_str());
    assert_eq!(body["balances"][0]["balance"], 4000);
    assert_eq!(body["balances"][1]["balance"], -2000);
    assert_eq!(body["balances"][2]["balance"], -2000);

    let settlements = body["settlements"].as_array().unwrap().clone();
    assert_eq!(settlements.len(), 2);
    assert_eq!(settlements[0]["from"], p2.as_str());
    assert_eq!(settlements[0]["to"], p1.as_str());
    assert_eq!(settlements[0]["amountCents"], 2000);
    assert_eq!(settlements[0]["venmoLinkVerified"], false);
    assert_eq!(body["summary"]["unpaidSettlements"], 2);

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/payments/create",
            json!({
                "expenseId": expense_id,
                "fromUserId": p2,
                "toUserId": p1,
                "amountCents": 2000,
                "settlementId": settlements[0]["settlementId"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "unpaid");
    let payment_id = body["payment"]["id"].clone();

    let (status, body) = call(
        &app,
        json_request("POST", "/payments/mark-paid", json!({ "paymentId": payment_id, "markedBy": p1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "paid");
    assert_eq!(
        body["badgesAwarded"],
        json!([{ "userId": p2, "badgeType": "pay_it_forward" }])
    );

    // A second mark-paid is a no-op
    let (status, body) = call(
        &app,
        json_request("POST", "/payments/mark-paid", json!({ "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["badgesAwarded"], json!([]));

    let (_, body) = call(&app, test_request("GET", &format!("/settlements/{}", group))).await;
    assert_eq!(body["settlements"][0]["isPaid"], true);
    assert_eq!(body["settlements"][1]["isPaid"], false);
    assert_eq!(body["summary"]["paidSettlements"], 1);
    assert_eq!(body["summary"]["totalUnpaidAmount"], 2000);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_badge_award_is_idempotent_per_month() {
    let pool = setup_db().await;
    let users = UserRepository::new(pool.clone());
    let badges = BadgeRepository::new(pool);
    let user = unique("u");
    let group = unique("g");

    users
        .upsert_profile(&ProfileUpdate {
            user_id: user.clone(),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

    let now = Utc::now();
    let metadata = json!({ "collectionRate": 95 });
    assert!(badges.award(&user, &group, BadgeType::TableHero, &metadata, now).await.unwrap());
    assert!(!badges.award(&user, &group, BadgeType::TableHero, &metadata, now).await.unwrap());
    assert!(badges.award(&user, &group, BadgeType::EvenSteven, &metadata, now).await.unwrap());

    let listed = badges.list_for_user(&user, Some(&group), None).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_pending_receipt_supersede_and_expiry() {
    let pool = setup_db().await;
    let app = setup_app(pool.clone(), StubModel::default());
    let receipts = ReceiptRepository::new(pool);
    let user = unique("u");
    let group = unique("g");

    let store = |total: i64| {
        json_request(
            "POST",
            &format!("/receipts/pending/{}", user),
            json!({
                "groupId": group,
                "imageUrl": "https://img/receipt.jpg",
                "ocrResult": { "total": total as f64 / 100.0 },
                "totalCents": total,
                "merchant": "Cafe"
            }),
        )
    };

    let (status, first) = call(&app, store(1200)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = call(&app, store(2450)).await;
    assert_ne!(first["receiptId"], second["receiptId"]);

    let (status, body) = call(
        &app,
        test_request("GET", &format!("/receipts/pending/{}?groupId={}", user, group)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["totalCents"], 2450);

    let receipt_id: Uuid = second["receiptId"].as_str().unwrap().parse().unwrap();
    let stored = receipts.find_by_id(receipt_id).await.unwrap().unwrap();

    let later = stored.created_at + Duration::seconds(5 * 60 + 1);
    assert!(receipts.find_live(&user, &group, later).await.unwrap().is_none());

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/receipts/confirm",
            json!({ "userId": user, "groupId": group, "receiptId": receipt_id, "participants": [user] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expense"]["description"], "Cafe - Receipt");
    assert_eq!(body["expense"]["amountCents"], 2450);

    // Consumed receipts cannot be confirmed twice
    let (status, _) = call(
        &app,
        json_request(
            "POST",
            "/receipts/confirm",
            json!({ "userId": user, "groupId": group, "receiptId": receipt_id, "participants": [user] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn expense_count(pool: &PgPool, group: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE group_id = $1")
        .bind(group)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_confirming_expired_receipt_creates_no_expense() {
    let pool = setup_db().await;
    let app = setup_app(pool.clone(), StubModel::default());
    let receipts = ReceiptRepository::new(pool.clone());
    let user = unique("u");
    let group = unique("g");

    let (status, stored) = call(
        &app,
        json_request(
            "POST",
            &format!("/receipts/pending/{}", user),
            json!({
                "groupId": group,
                "imageUrl": "https://img/late.jpg",
                "ocrResult": { "total": 18.0 },
                "totalCents": 1800,
                "merchant": "Diner"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let receipt_id: Uuid = stored["receiptId"].as_str().unwrap().parse().unwrap();

    sqlx::query(
        "UPDATE pending_receipts SET expires_at = NOW() - INTERVAL '1 second' WHERE id = $1",
    )
    .bind(receipt_id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/receipts/confirm",
            json!({ "userId": user, "groupId": group, "receiptId": receipt_id, "participants": [user] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Pending receipt has expired");
    assert_eq!(expense_count(&pool, &group).await, 0);

    // The repository refuses the same receipt even when asked directly
    let expense = NewExpense::try_from(CreateExpenseRequest {
        group_id: Some(group.clone()),
        payer_id: Some(user.clone()),
        description: Some("Diner - Receipt".to_string()),
        amount_cents: Some(1800),
        participants: Some(vec![user.clone()]),
        ..Default::default()
    })
    .unwrap();
    let confirmed = receipts.confirm(receipt_id, &expense, Utc::now()).await.unwrap();
    assert!(confirmed.is_none());
    assert_eq!(expense_count(&pool, &group).await, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_overlapping_expense_without_group_totals_nets_to_zero() {
    let pool = setup_db().await;
    let app = setup_app(pool, StubModel::default());
    let group = unique("g");
    let (payer, a, b) = (unique("payer"), unique("a"), unique("b"));

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/expenses",
            json!({
                "groupId": group,
                "payerId": payer,
                "description": "Pizza",
                "amountCents": 6000,
                "splitType": "overlapping",
                "splitGroups": [
                    { "name": "Half 1", "participants": [payer, a] },
                    { "name": "Half 2", "participants": [payer, b] }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expense"]["splitGroups"][0]["perPersonCents"], 1500);

    let (_, body) = call(&app, test_request("GET", &format!("/settlements/{}", group))).await;
    let total: i64 = body["balances"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["balance"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 0);
    assert_eq!(body["settlements"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_low_confidence_ocr_is_stored_for_review() {
    let pool = setup_db().await;
    let app = setup_app(pool, StubModel::vision(r#"{"total": 24.50, "confidence": 0.55}"#));
    let user = unique("u");
    let group = unique("g");

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/receipts/ocr",
            json!({ "imageUrl": "https://img/r.jpg", "userId": user, "groupId": group }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ocrResult"]["totalCents"], 2450);
    assert_eq!(body["ocrResult"]["needsConfirmation"], true);

    let (_, body) = call(
        &app,
        test_request("GET", &format!("/receipts/pending/{}?groupId={}", user, group)),
    )
    .await;
    assert_eq!(body["receipt"]["merchant"], "Unknown Merchant");
    assert_eq!(body["receipt"]["totalCents"], 2450);
}
