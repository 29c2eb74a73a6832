//! Format choice flow and token lifecycle.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use boxset_core::{PackLine, PhysicalFormat};
use boxset_integration_tests::{TestApp, address};
use boxset_server::models::CredentialPurpose;

#[tokio::test]
async fn test_validate_token_returns_customer_data() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 2, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;

    let (status, body) = app.post("/validate-token", &json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["email"], "fan@example.fr");
    assert_eq!(body["customer"]["melancolie"], 2);
    assert_eq!(body["customer"]["symphonie"], 1);
    assert_eq!(body["customer"]["refundAmount"], 45);
    assert_eq!(body["customer"]["address"]["country"], "France");
    assert_eq!(body["existingChoices"], json!([]));
    assert_eq!(body["alreadyUsed"], false);
    assert_eq!(body["purpose"], "format_choice");
}

#[tokio::test]
async fn test_validate_token_errors() {
    let app = TestApp::new();

    let (status, body) = app.post("/validate-token", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_REQUIRED");

    let (status, body) = app.post("/validate-token", &json!({ "token": "unknown" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_expired_token_is_gone() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;
    app.store().expire_link(&token, Utc::now() - Duration::minutes(1)).await;

    let (status, body) = app.post("/validate-token", &json!({ "token": token })).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "TOKEN_EXPIRED");

    let (status, body) = app
        .post(
            "/format-choice",
            &json!({
                "token": token,
                "address": address(),
                "choices": { "melancolie": { "cd": 1, "vinyle": 0 } }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_format_choice_is_recorded_and_token_consumed() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 3, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;

    let (status, body) = app
        .post(
            "/format-choice",
            &json!({
                "token": token,
                "address": address(),
                "choices": {
                    "melancolie": { "cd": 2, "vinyle": 1 },
                    "symphonie": { "cd": 0, "vinyle": 1 }
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stored = app.store().customer(customer.id).await.unwrap();
    assert!(stored.format_choice_completed);
    assert_eq!(stored.address.city, "Paris");

    let choices = app.store().format_choices(customer.id).await;
    assert_eq!(choices.len(), 3);
    assert!(choices.iter().all(|c| c.quantity > 0));

    let (_, body) = app.post("/validate-token", &json!({ "token": token })).await;
    assert_eq!(body["alreadyUsed"], true);
    assert_eq!(body["existingChoices"].as_array().unwrap().len(), 3);

    let outbox = app.store().outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].message.to.as_str(), "fan@example.fr");
}

#[tokio::test]
async fn test_used_token_cannot_submit_again() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;
    let body = json!({
        "token": token,
        "address": address(),
        "choices": { "melancolie": { "cd": 1, "vinyle": 0 } }
    });

    let (status, _) = app.post("/format-choice", &body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, response) = app.post("/format-choice", &body).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(response["error"], "TOKEN_USED");
}

#[tokio::test]
async fn test_concurrent_submissions_consume_token_once() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 2, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;
    let body = json!({
        "token": token,
        "address": address(),
        "choices": { "melancolie": { "cd": 2, "vinyle": 0 } }
    });

    let ((a, a_body), (b, b_body)) = tokio::join!(
        app.post("/format-choice", &body),
        app.post("/format-choice", &body)
    );
    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::GONE]);
    let rejected = if a == StatusCode::GONE { a_body } else { b_body };
    assert_eq!(rejected["error"], "TOKEN_USED");

    let choices = app.store().format_choices(customer.id).await;
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].format, PhysicalFormat::Cd);
    assert_eq!(choices[0].quantity, 2);
    assert_eq!(app.store().outbox().await.len(), 1);
}

#[tokio::test]
async fn test_resubmission_with_new_token_replaces_choices() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 2, 0).await;

    let first = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;
    let (status, _) = app
        .post(
            "/format-choice",
            &json!({
                "token": first,
                "address": address(),
                "choices": { "melancolie": { "cd": 1, "vinyle": 1 } }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store().format_choices(customer.id).await.len(), 2);

    let second = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;
    let (status, _) = app
        .post(
            "/format-choice",
            &json!({
                "token": second,
                "address": address(),
                "choices": { "melancolie": { "cd": 0, "vinyle": 2 } }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let choices = app.store().format_choices(customer.id).await;
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].pack_line, PackLine::Melancolie);
    assert_eq!(choices[0].format, PhysicalFormat::Vinyle);
    assert_eq!(choices[0].quantity, 2);
}

#[tokio::test]
async fn test_allocation_mismatch_names_the_line() {
    let app = TestApp::new();
    let customer = app.customer("fan@example.fr", 2, 1).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;

    let (status, body) = app
        .post(
            "/format-choice",
            &json!({
                "token": token,
                "address": address(),
                "choices": {
                    "melancolie": { "cd": 1, "vinyle": 1 },
                    "symphonie": { "cd": 1, "vinyle": 1 }
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ALLOCATION_MISMATCH");
    assert_eq!(body["line"], "symphonie");

    // Nothing was written and the token is still usable
    assert!(app.store().format_choices(customer.id).await.is_empty());
    let (_, body) = app.post("/validate-token", &json!({ "token": token })).await;
    assert_eq!(body["alreadyUsed"], false);
}

#[tokio::test]
async fn test_missing_sections_are_reported() {
    let app = TestApp::new();
    app.customer("fan@example.fr", 1, 0).await;
    let token = app.issue_token("fan@example.fr", CredentialPurpose::FormatChoice).await;

    let (status, body) = app.post("/format-choice", &json!({ "token": token })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FIELDS");

    let (status, body) = app
        .post(
            "/format-choice",
            &json!({
                "token": token,
                "address": { "line1": "12 rue des Lilas", "city": "Paris", "country": "France" },
                "choices": { "melancolie": { "cd": 1, "vinyle": 0 } }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_ADDRESS_FIELD");
}
