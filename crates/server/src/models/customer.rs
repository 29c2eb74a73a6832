//! Customer ledger records.

use chrono::{DateTime, Utc};

use boxset_core::{Amount, CustomerId, Email, PackCounts, PostalAddress, refund_amount};

/// A box set buyer (domain type).
#[derive(Debug, Clone)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// First name used on shipping labels.
    pub first_name: Option<String>,
    /// Last name used on shipping labels.
    pub last_name: Option<String>,
    /// Normalized email address.
    pub email: Email,
    /// Packs purchased per product line.
    pub packs: PackCounts,
    /// Last delivery address supplied (fields are empty until then).
    pub address: PostalAddress,
    /// Normalized IBAN, once a refund was requested.
    pub iban: Option<String>,
    /// Normalized BIC, once a refund was requested.
    pub bic: Option<String>,
    /// Whether a refund was requested.
    pub refund_requested: bool,
    /// When the latest refund request was recorded.
    pub refund_requested_at: Option<DateTime<Utc>>,
    /// Refund amount stored with the request; may be overridden by operators.
    pub refund_amount: Option<Amount>,
    /// Whether a format choice was completed.
    pub format_choice_completed: bool,
    /// When the latest format choice was recorded.
    pub format_choice_completed_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// "First Last", or `None` when neither name is known.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!full.is_empty()).then_some(full)
    }

    /// First name for greetings, if non-blank.
    #[must_use]
    pub fn greeting_name(&self) -> Option<&str> {
        self.first_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Refund owed for the purchased packs at the flat unit price.
    #[must_use]
    pub fn computed_refund(&self) -> Amount {
        refund_amount(&self.packs)
    }

    /// Amount counted as processed: the stored amount when present and
    /// non-zero, otherwise the computed one.
    #[must_use]
    pub fn processed_amount(&self) -> Amount {
        self.refund_amount
            .filter(|amount| !amount.is_zero())
            .unwrap_or_else(|| self.computed_refund())
    }
}

/// Data needed to register a customer in the ledger.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    /// Normalized email address.
    pub email: Email,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Packs purchased per line.
    pub packs: PackCounts,
}
