//! Transactional email outbox.

use boxset_core::{Email, UnknownVariant};
use uuid::Uuid;

/// A rendered email ready to hand to a [`crate::services::email::Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: Email,
    /// Recipient display name.
    pub to_name: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
}

/// Delivery state of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    /// Waiting for (another) delivery attempt.
    Pending,
    /// Delivered to the mail relay.
    Sent,
    /// Attempts exhausted.
    Failed,
}

impl OutboxStatus {
    /// Storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// A pending outbox entry.
#[derive(Debug, Clone)]
pub struct OutboxEmail {
    /// Entry ID.
    pub id: Uuid,
    /// The message to deliver.
    pub message: OutgoingEmail,
    /// Delivery attempts made so far.
    pub attempts: i32,
}
