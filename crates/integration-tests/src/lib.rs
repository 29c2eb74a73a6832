//! Integration tests for the box set self-service.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests (in-memory store, recording mailer)
//! cargo test -p boxset-integration-tests
//!
//! # Including the PostgreSQL round trip
//! DATABASE_URL=postgres://... cargo test -p boxset-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `credential` - Magic link issuance
//! - `format_choice` - Format choice flow and token lifecycle
//! - `refund` - Refund flow and bank detail validation
//! - `admin_stats` - Operator dashboard
//! - `postgres_store` - `PgStore` transactions against a real database

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use boxset_core::PackCounts;
use boxset_server::models::{CredentialPurpose, Customer};
use boxset_server::routes;
use boxset_server::state::AppState;
use boxset_server::testing::{MemoryStore, RecordingMailer, TEST_ADMIN_CREDENTIAL, test_state};

pub use boxset_server::testing::TEST_BASE_URL;

/// The full router over in-memory doubles.
pub struct TestApp {
    state: AppState<MemoryStore, RecordingMailer>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Fresh store, working mailer, test settings.
    #[must_use]
    pub fn new() -> Self {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let router = routes::routes().with_state(state.clone());
        Self { state, router }
    }

    /// Application state shared with the router.
    #[must_use]
    pub const fn state(&self) -> &AppState<MemoryStore, RecordingMailer> {
        &self.state
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        self.state.store()
    }

    /// Recording mailer.
    #[must_use]
    pub fn mailer(&self) -> &RecordingMailer {
        self.state.mailer()
    }

    /// Register a customer.
    pub async fn customer(&self, email: &str, melancolie: u32, symphonie: u32) -> Customer {
        self.store()
            .add_customer(email, PackCounts::new(melancolie, symphonie))
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// POST a raw body as JSON.
    pub async fn post_raw(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    /// POST a JSON value.
    pub async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        self.post_raw(path, &body.to_string()).await
    }

    /// GET with an optional bearer credential.
    pub async fn get(&self, path: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(credential) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {credential}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// GET `/admin-stats` with the configured credential.
    pub async fn admin_stats(&self) -> (StatusCode, Value) {
        self.get("/admin-stats", Some(TEST_ADMIN_CREDENTIAL)).await
    }

    /// Request a credential over HTTP and return the token it stored.
    pub async fn issue_token(&self, email: &str, purpose: CredentialPurpose) -> String {
        let (status, body) = self
            .post(
                "/credential",
                &serde_json::json!({ "email": email, "purpose": purpose }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "credential request failed: {body}");

        self.store()
            .magic_links()
            .await
            .into_iter()
            .max_by_key(|link| link.id)
            .unwrap()
            .token
    }
}

/// A complete postal address in the request shape.
#[must_use]
pub fn address() -> Value {
    serde_json::json!({
        "line1": "12 rue des Lilas",
        "postalCode": "75011",
        "city": "Paris",
        "country": "France"
    })
}

/// Valid bank details in the request shape.
#[must_use]
pub fn bank_details() -> Value {
    serde_json::json!({
        "iban": "FR76 3000 6000 0112 3456 7890 189",
        "bic": "BNPAFRPPXXX"
    })
}
