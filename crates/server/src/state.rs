//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Notify;

use crate::db::Store;
use crate::services::credential::LinkBuilder;
use crate::services::email::Mailer;

/// Runtime settings the handlers need, independent of where they came from.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Bearer credential for `GET /admin-stats`.
    pub admin_credential: SecretString,
    /// Display name used as sender and subject prefix.
    pub sender_name: String,
    /// Deep link construction.
    pub links: LinkBuilder,
    /// Outbox entries handled per dispatcher pass.
    pub outbox_batch_size: i64,
    /// Delivery attempts before an outbox entry is abandoned.
    pub outbox_max_attempts: i32,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and gives access to the store,
/// the mailer, the settings and the outbox wake-up signal.
pub struct AppState<S, M> {
    inner: Arc<AppStateInner<S, M>>,
}

// Manual impl: deriving would require `S: Clone` and `M: Clone`.
impl<S, M> Clone for AppState<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S, M> {
    store: S,
    mailer: M,
    settings: ServiceSettings,
    outbox_signal: Notify,
}

impl<S: Store, M: Mailer> AppState<S, M> {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: S, mailer: M, settings: ServiceSettings) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                mailer,
                settings,
                outbox_signal: Notify::new(),
            }),
        }
    }

    /// Get a reference to the persistence layer.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the mailer.
    #[must_use]
    pub fn mailer(&self) -> &M {
        &self.inner.mailer
    }

    /// Get a reference to the runtime settings.
    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.inner.settings
    }

    /// Wake the outbox dispatcher after a commit enqueued an email.
    pub fn notify_outbox(&self) {
        self.inner.outbox_signal.notify_one();
    }

    /// Signal the outbox dispatcher waits on.
    #[must_use]
    pub fn outbox_signal(&self) -> &Notify {
        &self.inner.outbox_signal
    }
}
