//! `PgStore` against a real database.
//!
//! These tests require a `PostgreSQL` database reachable through
//! `DATABASE_URL`. Migrations are applied on connect.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use secrecy::SecretString;

use boxset_core::{Email, FormatChoice, PackCounts, PackLine, PhysicalFormat, PostalAddress};
use boxset_server::db::{
    CustomerLedger, EmailOutbox, FormatChoiceCommit, PgStore, RepositoryError, SubmissionLedger,
    TokenStore, create_pool,
};
use boxset_server::models::{CredentialPurpose, NewCustomer, NewMagicLink, OutgoingEmail};
use boxset_server::services::generate_token;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../server/migrations").run(&pool).await.unwrap();
    PgStore::new(pool)
}

fn address() -> PostalAddress {
    PostalAddress {
        line1: "12 rue des Lilas".into(),
        line2: None,
        postal_code: "75011".into(),
        city: "Paris".into(),
        country: "France".into(),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_format_choice_commit_consumes_token_once() {
    let store = store().await;
    let email = Email::parse(&format!("pg-{}@example.fr", generate_token().get(..12).unwrap()))
        .unwrap();

    let customer = store
        .insert_customer(NewCustomer {
            email: email.clone(),
            first_name: Some("Jeanne".into()),
            last_name: None,
            packs: PackCounts::new(2, 0),
        })
        .await
        .unwrap();
    assert_eq!(
        store.find_customer_by_email(&email).await.unwrap().unwrap().id,
        customer.id
    );

    let now = Utc::now();
    let link = store
        .insert_magic_link(NewMagicLink {
            token: generate_token(),
            customer_id: customer.id,
            purpose: CredentialPurpose::FormatChoice,
            created_at: now,
            expires_at: now + Duration::hours(24),
        })
        .await
        .unwrap();

    let commit = FormatChoiceCommit {
        customer_id: customer.id,
        token: link.token.clone(),
        address: address(),
        choices: vec![FormatChoice {
            pack_line: PackLine::Melancolie,
            format: PhysicalFormat::Cd,
            quantity: 2,
        }],
        completed_at: now,
        confirmation: OutgoingEmail {
            to: email,
            to_name: None,
            subject: "Confirmation".into(),
            text_body: "text".into(),
            html_body: "<p>html</p>".into(),
        },
    };

    store.commit_format_choice(commit.clone()).await.unwrap();
    assert!(matches!(
        store.commit_format_choice(commit).await,
        Err(RepositoryError::TokenConsumed)
    ));

    let stored = store.get_customer(customer.id).await.unwrap().unwrap();
    assert!(stored.format_choice_completed);
    assert_eq!(store.list_format_choices(customer.id).await.unwrap().len(), 1);
    assert!(store.find_magic_link(&link.token).await.unwrap().unwrap().used);
    assert!(
        store
            .pending_emails(1000)
            .await
            .unwrap()
            .iter()
            .any(|e| e.message.to == stored.email)
    );
}
