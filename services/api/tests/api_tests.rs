//! Router tests that never reach the database
//!
//! Every request here is rejected by validation or answered from the
//! language model stub, so the lazily connected pool stays unused.

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{StubModel, extract_json, json_request, lazy_pool, setup_app, test_request};
use tower::util::ServiceExt;

const SPLIT_ANSWER: &str = r#"{"groups": [
    {"name": "Half 1", "participants": ["Boom", "Ken", "Jessi"]},
    {"name": "Half 2", "participants": ["Boom", "Ann", "Gil"]}
]}"#;

async fn assert_bad_request(request: axum::http::Request<axum::body::Body>, message: &str) {
    let app = setup_app(lazy_pool(), StubModel::default());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], message);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(lazy_pool(), StubModel::default());

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "api-service");
}

#[tokio::test]
async fn test_create_expense_requires_fields() {
    assert_bad_request(
        json_request("POST", "/expenses", json!({ "payerId": "p1" })),
        "groupId is required",
    )
    .await;

    assert_bad_request(
        json_request(
            "POST",
            "/expenses",
            json!({ "groupId": "g1", "payerId": "p1", "description": "Dinner", "amountCents": 6000 }),
        ),
        "participants is required",
    )
    .await;
}

#[tokio::test]
async fn test_create_expense_rejects_zero_amount() {
    assert_bad_request(
        json_request(
            "POST",
            "/expenses",
            json!({
                "groupId": "g1",
                "payerId": "p1",
                "description": "Dinner",
                "amountCents": 0,
                "participants": ["p1", "p2"]
            }),
        ),
        "amountCents must be positive",
    )
    .await;
}

#[tokio::test]
async fn test_create_expense_rejects_oversized_amount() {
    let app = setup_app(lazy_pool(), StubModel::default());

    let response = app
        .oneshot(json_request(
            "POST",
            "/expenses",
            json!({
                "groupId": "g1",
                "payerId": "p1",
                "description": "Yacht",
                "amountCents": i64::MAX,
                "participants": ["p1", "p2"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().starts_with("Amount exceeds the maximum"));
}

#[tokio::test]
async fn test_group_routes_require_group_id() {
    assert_bad_request(test_request("GET", "/expenses"), "groupId is required").await;
    assert_bad_request(test_request("DELETE", "/expenses"), "groupId is required").await;
    assert_bad_request(
        json_request("POST", "/expenses/clear", json!({ "groupId": "  " })),
        "groupId is required",
    )
    .await;
}

#[tokio::test]
async fn test_parse_expense_reads_model_answer() {
    let app = setup_app(
        lazy_pool(),
        StubModel::text(r#"{"amount": 12.5, "description": "lunch", "participants": ["sam"], "confidence": 0.9}"#),
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/expenses/parse",
            json!({ "text": "12.50 lunch with sam" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["parsed"]["amountCents"], 1250);
    assert_eq!(body["parsed"]["description"], "lunch");
    assert_eq!(body["parsed"]["needsConfirmation"], false);
    assert!(body["overlapping"].is_null());
}

#[tokio::test]
async fn test_parse_expense_degrades_when_model_fails() {
    let app = setup_app(lazy_pool(), StubModel::default());

    let response = app
        .oneshot(json_request(
            "POST",
            "/expenses/parse",
            json!({ "text": "dinner", "totalCents": 9000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["parsed"]["confidence"], 0.2);
    assert_eq!(body["parsed"]["needsConfirmation"], true);
    assert_eq!(body["parsed"]["description"], "Expense");
    assert_eq!(body["overlapping"]["isOverlapping"], false);
}

#[tokio::test]
async fn test_parse_expense_requires_text() {
    assert_bad_request(
        json_request("POST", "/expenses/parse", json!({})),
        "text is required",
    )
    .await;
}

#[tokio::test]
async fn test_overlapping_split_breakdown() {
    let app = setup_app(lazy_pool(), StubModel::text(SPLIT_ANSWER));

    let response = app
        .oneshot(json_request(
            "POST",
            "/expenses/overlapping",
            json!({ "text": "Half 1: Boom Ken Jessi. Half 2: Boom Ann Gil", "totalCents": 9000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["isOverlapping"], true);
    assert_eq!(body["splitGroups"][0]["perPersonCents"], 1500);
    assert_eq!(body["overlappingUsers"]["Boom"]["totalCents"], 3000);
    assert_eq!(body["overlappingUsers"]["Boom"]["groups"], json!(["Half 1", "Half 2"]));
    assert_eq!(body["overlappingUsers"]["Ken"]["totalCents"], 1500);
    assert_eq!(body["summary"]["totalGroups"], 2);
    assert_eq!(body["summary"]["overlappingCount"], 5);
    assert_eq!(body["summary"]["totalAmount"], 9000);
}

#[tokio::test]
async fn test_plain_text_is_not_overlapping() {
    let app = setup_app(lazy_pool(), StubModel::text(SPLIT_ANSWER));

    let response = app
        .oneshot(json_request(
            "POST",
            "/expenses/overlapping",
            json!({ "text": "$45 lunch with sam and jo", "totalCents": 4500 }),
        ))
        .await
        .unwrap();

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["isOverlapping"], false);
    assert_eq!(body["message"], "No overlapping split pattern detected");
}

#[tokio::test]
async fn test_overlapping_requires_total() {
    assert_bad_request(
        json_request("POST", "/expenses/overlapping", json!({ "text": "half 1: a b, half 2: a c" })),
        "totalCents is required",
    )
    .await;
}

#[tokio::test]
async fn test_payment_validation() {
    assert_bad_request(
        json_request("POST", "/payments/create", json!({ "fromUserId": "p2", "toUserId": "p1" })),
        "expenseId is required",
    )
    .await;

    assert_bad_request(
        json_request(
            "POST",
            "/payments/create",
            json!({
                "expenseId": "6f1f0c1e-2a4b-4c56-9d7e-1a2b3c4d5e6f",
                "fromUserId": "p1",
                "toUserId": "p1",
                "amountCents": 2000
            }),
        ),
        "fromUserId and toUserId must differ",
    )
    .await;

    assert_bad_request(
        json_request("POST", "/payments/mark-paid", json!({ "markedBy": "p1" })),
        "paymentId is required",
    )
    .await;

    assert_bad_request(
        json_request("POST", "/payments/mark-processing", json!({})),
        "paymentId is required",
    )
    .await;
}

#[tokio::test]
async fn test_award_rejects_unknown_badge_type() {
    let app = setup_app(lazy_pool(), StubModel::default());

    let response = app
        .oneshot(json_request(
            "POST",
            "/badges/award",
            json!({ "userId": "p1", "groupId": "g1", "badgeType": "gold_star" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receipt_validation() {
    assert_bad_request(
        json_request("POST", "/receipts/ocr", json!({ "userId": "u1" })),
        "imageUrl is required",
    )
    .await;

    assert_bad_request(
        json_request(
            "POST",
            "/receipts/pending/u1",
            json!({ "imageUrl": "https://img/1.jpg", "ocrResult": {} }),
        ),
        "totalCents is required",
    )
    .await;

    assert_bad_request(
        json_request("POST", "/receipts/confirm", json!({ "userId": "u1", "groupId": "g1" })),
        "receiptId is required",
    )
    .await;
}

#[tokio::test]
async fn test_profile_requires_user_id() {
    assert_bad_request(
        json_request("POST", "/users/profile", json!({ "handle": "@sam" })),
        "userId is required",
    )
    .await;
}

#[tokio::test]
async fn test_expense_id_must_be_uuid() {
    let app = setup_app(lazy_pool(), StubModel::default());

    let response = app
        .oneshot(test_request("DELETE", "/expenses/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
