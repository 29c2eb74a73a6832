use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use boxset_core::{CustomerId, Email, FormatChoice, MagicLinkId, PackCounts, PostalAddress};

use crate::db::{
    CustomerLedger, EmailOutbox, FormatChoiceCommit, RefundCommit, RepositoryError,
    SubmissionLedger, TokenStore,
};
use crate::models::{Customer, MagicLink, NewMagicLink, OutboxEmail, OutboxStatus, OutgoingEmail};

/// An outbox row as kept by [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryOutboxEntry {
    /// Entry ID.
    pub id: Uuid,
    /// The queued message.
    pub message: OutgoingEmail,
    /// Delivery state.
    pub status: OutboxStatus,
    /// Attempts made.
    pub attempts: i32,
    /// Last delivery error.
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    next_customer_id: i32,
    next_link_id: i32,
    customers: BTreeMap<CustomerId, Customer>,
    links: HashMap<String, MagicLink>,
    choices: BTreeMap<CustomerId, Vec<FormatChoice>>,
    outbox: Vec<MemoryOutboxEntry>,
}

impl Inner {
    fn consume_token(&mut self, token: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        match self.links.get_mut(token) {
            Some(link) if !link.used => {
                link.used = true;
                link.used_at = Some(at);
                Ok(())
            }
            _ => Err(RepositoryError::TokenConsumed),
        }
    }

    fn enqueue(&mut self, message: OutgoingEmail) {
        self.outbox.push(MemoryOutboxEntry {
            id: Uuid::new_v4(),
            message,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
        });
    }
}

/// Store keeping everything in memory behind one lock.
///
/// Commits check every precondition before touching anything, so a failed
/// commit leaves no trace, matching the transactional `PgStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer with the given packs.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    pub async fn add_customer(&self, email: &str, packs: PackCounts) -> Customer {
        let email = Email::normalize(email).expect("Invalid test email");
        let mut inner = self.inner.lock().await;
        inner.next_customer_id += 1;
        let customer = Customer {
            id: CustomerId::new(inner.next_customer_id),
            first_name: None,
            last_name: None,
            email,
            packs,
            address: PostalAddress::default(),
            iban: None,
            bic: None,
            refund_requested: false,
            refund_requested_at: None,
            refund_amount: None,
            format_choice_completed: false,
            format_choice_completed_at: None,
        };
        inner.customers.insert(customer.id, customer.clone());
        customer
    }

    /// Replace a stored customer wholesale.
    pub async fn put_customer(&self, customer: Customer) {
        self.inner
            .lock()
            .await
            .customers
            .insert(customer.id, customer);
    }

    /// Drop a customer, leaving its links dangling.
    pub async fn remove_customer(&self, id: CustomerId) {
        self.inner.lock().await.customers.remove(&id);
    }

    /// Current state of a customer.
    pub async fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.inner.lock().await.customers.get(&id).cloned()
    }

    /// Stored format choice rows of a customer.
    pub async fn format_choices(&self, id: CustomerId) -> Vec<FormatChoice> {
        self.inner
            .lock()
            .await
            .choices
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every issued link, in no particular order.
    pub async fn magic_links(&self) -> Vec<MagicLink> {
        self.inner.lock().await.links.values().cloned().collect()
    }

    /// Move a link's expiry to `at`.
    pub async fn expire_link(&self, token: &str, at: DateTime<Utc>) {
        if let Some(link) = self.inner.lock().await.links.get_mut(token) {
            link.expires_at = at;
        }
    }

    /// Every outbox entry in insertion order.
    pub async fn outbox(&self) -> Vec<MemoryOutboxEntry> {
        self.inner.lock().await.outbox.clone()
    }

    /// Queue a message directly.
    pub async fn enqueue(&self, message: OutgoingEmail) {
        self.inner.lock().await.enqueue(message);
    }
}

impl CustomerLedger for MemoryStore {
    async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .customers
            .values()
            .find(|c| &c.email == email)
            .cloned())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customer(id).await)
    }

    async fn list_format_choices(
        &self,
        id: CustomerId,
    ) -> Result<Vec<FormatChoice>, RepositoryError> {
        Ok(self.format_choices(id).await)
    }

    async fn list_customers_with_packs(&self) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .customers
            .values()
            .filter(|c| c.packs.has_any())
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl TokenStore for MemoryStore {
    async fn insert_magic_link(&self, link: NewMagicLink) -> Result<MagicLink, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.next_link_id += 1;
        let stored = MagicLink {
            id: MagicLinkId::new(inner.next_link_id),
            token: link.token,
            customer_id: link.customer_id,
            purpose: link.purpose,
            created_at: link.created_at,
            expires_at: link.expires_at,
            used: false,
            used_at: None,
        };
        inner.links.insert(stored.token.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_magic_link(&self, token: &str) -> Result<Option<MagicLink>, RepositoryError> {
        Ok(self.inner.lock().await.links.get(token).cloned())
    }
}

impl SubmissionLedger for MemoryStore {
    async fn commit_format_choice(
        &self,
        commit: FormatChoiceCommit,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.customers.contains_key(&commit.customer_id) {
            return Err(RepositoryError::NotFound);
        }
        inner.consume_token(&commit.token, commit.completed_at)?;

        if let Some(customer) = inner.customers.get_mut(&commit.customer_id) {
            customer.address = commit.address;
            customer.format_choice_completed = true;
            customer.format_choice_completed_at = Some(commit.completed_at);
        }
        inner.choices.insert(commit.customer_id, commit.choices);
        inner.enqueue(commit.confirmation);
        Ok(())
    }

    async fn commit_refund(&self, commit: RefundCommit) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.customers.contains_key(&commit.customer_id) {
            return Err(RepositoryError::NotFound);
        }
        inner.consume_token(&commit.token, commit.requested_at)?;

        if let Some(customer) = inner.customers.get_mut(&commit.customer_id) {
            customer.address = commit.address;
            customer.iban = Some(commit.iban.as_str().to_owned());
            customer.bic = Some(commit.bic.as_str().to_owned());
            customer.refund_amount = Some(commit.amount);
            customer.refund_requested = true;
            customer.refund_requested_at = Some(commit.requested_at);
        }
        inner.enqueue(commit.confirmation);
        Ok(())
    }
}

impl EmailOutbox for MemoryStore {
    async fn pending_emails(&self, limit: i64) -> Result<Vec<OutboxEmail>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .inner
            .lock()
            .await
            .outbox
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .take(limit)
            .map(|e| OutboxEmail {
                id: e.id,
                message: e.message.clone(),
                attempts: e.attempts,
            })
            .collect())
    }

    async fn mark_email_sent(
        &self,
        id: Uuid,
        _sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound)?;
        entry.status = OutboxStatus::Sent;
        entry.attempts += 1;
        entry.last_error = None;
        Ok(())
    }

    async fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        give_up: bool,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound)?;
        entry.attempts += 1;
        entry.last_error = Some(error.to_owned());
        if give_up {
            entry.status = OutboxStatus::Failed;
        }
        Ok(())
    }
}
