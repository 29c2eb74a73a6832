//! Refund request flow.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use boxset_integration_tests::{TestApp, address, bank_details};
use boxset_server::models::{CredentialPurpose, OutboxStatus};
use boxset_server::services::OutboxDispatcher;

#[tokio::test]
async fn test_refund_is_recorded_with_computed_amount() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 2, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;

    let (status, body) = app
        .post(
            "/refund-request",
            &json!({ "token": token, "address": address(), "bankDetails": bank_details() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "success": true }));

    let stored = app.store().customer(customer.id).await.unwrap();
    assert!(stored.refund_requested);
    assert!(stored.refund_requested_at.is_some());
    assert_eq!(stored.refund_amount.unwrap().rounded(), 45);
    assert_eq!(stored.iban.as_deref(), Some("FR7630006000011234567890189"));
    assert_eq!(stored.bic.as_deref(), Some("BNPAFRPPXXX"));
    assert_eq!(stored.address.postal_code, "75011");
}

#[tokio::test]
async fn test_french_address_keys_are_accepted() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;

    let (status, body) = app
        .post(
            "/refund-request",
            &json!({
                "token": token,
                "address": {
                    "adresse1": "3 quai Saint-Vincent",
                    "codepostal": "69001",
                    "ville": "Lyon",
                    "pays": "France"
                },
                "bankDetails": bank_details()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(app.store().customer(customer.id).await.unwrap().address.city, "Lyon");
}

#[tokio::test]
async fn test_bank_detail_errors() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;

    let cases = [
        (json!({ "iban": "1234", "bic": "BNPAFRPPXXX" }), "INVALID_IBAN"),
        (json!({ "iban": "FR7630006000011234567890189", "bic": "BNP" }), "INVALID_BIC"),
        (json!({ "iban": "", "bic": "BNPAFRPPXXX" }), "MISSING_BANK_FIELD"),
    ];
    for (bank, code) in cases {
        let (status, body) = app
            .post(
                "/refund-request",
                &json!({ "token": token, "address": address(), "bankDetails": bank }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], code);
    }

    // Rejected requests leave the token usable
    let (_, body) = app.post("/validate-token", &json!({ "token": token })).await;
    assert_eq!(body["alreadyUsed"], false);
}

#[tokio::test]
async fn test_missing_bank_details_section() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;

    let (status, body) = app
        .post("/refund-request", &json!({ "token": token, "address": address() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FIELDS");

    let (status, body) = app
        .post("/refund-request", &json!({ "address": address(), "bankDetails": bank_details() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_REQUIRED");
}

#[tokio::test]
async fn test_refund_token_is_single_use() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;
    let body = json!({ "token": token, "address": address(), "bankDetails": bank_details() });

    assert_eq!(app.post("/refund-request", &body).await.0, StatusCode::OK);

    let (status, response) = app.post("/refund-request", &body).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(response["error"], "TOKEN_USED");
}

#[tokio::test]
async fn test_concurrent_refunds_consume_token_once() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 1, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;
    let body = json!({ "token": token, "address": address(), "bankDetails": bank_details() });

    let ((a, a_body), (b, b_body)) = tokio::join!(
        app.post("/refund-request", &body),
        app.post("/refund-request", &body)
    );
    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::GONE]);
    let rejected = if a == StatusCode::GONE { a_body } else { b_body };
    assert_eq!(rejected["error"], "TOKEN_USED");

    let stored = app.store().customer(customer.id).await.unwrap();
    assert!(stored.refund_requested);
    assert_eq!(stored.refund_amount.unwrap().rounded(), 30);
    assert_eq!(app.store().outbox().await.len(), 1);
}

#[tokio::test]
async fn test_confirmation_goes_through_the_outbox() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;
    let mails_before = app.mailer().sent().await.len();

    let (status, _) = app
        .post(
            "/refund-request",
            &json!({ "token": token, "address": address(), "bankDetails": bank_details() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Queued, not sent inline
    assert_eq!(app.mailer().sent().await.len(), mails_before);
    assert_eq!(app.store().outbox().await[0].status, OutboxStatus::Pending);

    let dispatcher = OutboxDispatcher::new(app.state().clone(), Duration::from_secs(30));
    let summary = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(summary.sent, 1);

    let sent = app.mailer().sent().await;
    let confirmation = sent.last().unwrap();
    assert!(confirmation.subject.contains("remboursement"));
    assert!(confirmation.text_body.contains("30"));
    assert!(confirmation.text_body.contains("FR76 3000 6000 0112 3456 7890 189"));
    assert_eq!(app.store().outbox().await[0].status, OutboxStatus::Sent);
}

#[tokio::test]
async fn test_submission_succeeds_while_mail_is_down() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::Refund).await;
    app.mailer().set_failing(true);

    let (status, _) = app
        .post(
            "/refund-request",
            &json!({ "token": token, "address": address(), "bankDetails": bank_details() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store().customer(customer.id).await.unwrap().refund_requested);

    let dispatcher = OutboxDispatcher::new(app.state().clone(), Duration::from_secs(30));
    assert_eq!(dispatcher.dispatch_pending().await.unwrap().failed, 1);
    let entry = &app.store().outbox().await[0];
    assert_eq!(entry.status, OutboxStatus::Pending);
    assert!(entry.last_error.is_some());
}
