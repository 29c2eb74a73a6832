//! In-memory implementations of the persistence and mail seams.
//!
//! Available to this crate's unit tests and, through the `test-support`
//! feature, to the integration tests.

mod mailer;
mod store;

pub use mailer::RecordingMailer;
pub use store::{MemoryOutboxEntry, MemoryStore};

use secrecy::SecretString;
use url::Url;

use crate::db::Store;
use crate::services::credential::LinkBuilder;
use crate::services::email::Mailer;
use crate::state::{AppState, ServiceSettings};

/// Admin bearer credential used by [`test_settings`].
pub const TEST_ADMIN_CREDENTIAL: &str = "test-admin-credential-5f1c9a";

/// Public base URL used by [`test_settings`].
pub const TEST_BASE_URL: &str = "https://boxset.test";

/// Settings suitable for tests.
#[must_use]
pub fn test_settings() -> ServiceSettings {
    let base = Url::parse(TEST_BASE_URL).expect("Invalid test base URL");
    ServiceSettings {
        admin_credential: SecretString::from(TEST_ADMIN_CREDENTIAL.to_string()),
        sender_name: "Apocalypse".to_string(),
        links: LinkBuilder::new(base),
        outbox_batch_size: 50,
        outbox_max_attempts: 3,
    }
}

/// Application state over the given doubles with [`test_settings`].
#[must_use]
pub fn test_state<S: Store, M: Mailer>(store: S, mailer: M) -> AppState<S, M> {
    AppState::new(store, mailer, test_settings())
}
