//! Operator dashboard.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use boxset_core::Amount;
use boxset_integration_tests::{TestApp, address, bank_details};
use boxset_server::models::CredentialPurpose;

#[tokio::test]
async fn test_stats_require_the_admin_credential() {
    let app = TestApp::new();

    let (status, body) = app.get("/admin-stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app.get("/admin-stats", Some("not-the-credential")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.admin_stats().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_over_two_customers() {
    let app = TestApp::new();
    let mut requested = app.customer("first@example.fr", 2, 0).await;
    requested.refund_requested = true;
    requested.refund_requested_at = Some(chrono::Utc::now());
    requested.refund_amount = Some(Amount::new(Decimal::new(30, 0)));
    app.store().put_customer(requested).await;
    app.customer("second@example.fr", 0, 1).await;
    app.customer("nothing@example.fr", 0, 0).await;

    let (status, body) = app.admin_stats().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalAmount"], 45);
    assert_eq!(body["processedAmount"], 30);
    assert_eq!(body["pendingAmount"], 15);
    assert_eq!(body["averageAmount"], 30);
    assert_eq!(body["eligibleCustomers"], 2);
    assert_eq!(body["requestsReceived"], 1);
    assert_eq!(body["awaitingResponse"], 1);
    assert_eq!(body["responseRate"], 50);
    assert_eq!(body["packs"]["melancolie"], json!({ "total": 2, "withRequest": 2 }));
    assert_eq!(body["packs"]["symphonie"], json!({ "total": 1, "withRequest": 0 }));
    assert_eq!(body["recentRequests"].as_array().unwrap().len(), 1);
    assert_eq!(body["recentRequests"][0]["amount"], 30);
}

#[tokio::test]
async fn test_stats_follow_submissions() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;
    let (status, _) = app
        .post(
            "/refund-request",
            &json!({ "token": token, "address": address(), "bankDetails": bank_details() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.admin_stats().await;
    assert_eq!(body["requestsReceived"], 1);
    assert_eq!(body["processedAmount"], 30);
    assert_eq!(body["pendingAmount"], 0);
    assert_eq!(body["responseRate"], 100);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.get("/health", None).await.0, StatusCode::OK);
    assert_eq!(app.get("/health/ready", None).await.0, StatusCode::OK);
}
