//! Magic link credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boxset_core::{CustomerId, MagicLinkId, UnknownVariant};

/// Which self-service page a magic link opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPurpose {
    /// Refund request page.
    #[default]
    Refund,
    /// Format choice page.
    FormatChoice,
}

impl CredentialPurpose {
    /// Storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
            Self::FormatChoice => "format_choice",
        }
    }

    /// Path segment of the page the link points to.
    #[must_use]
    pub const fn page(self) -> &'static str {
        match self {
            Self::Refund => "refund-request",
            Self::FormatChoice => "format-choice",
        }
    }
}

impl std::str::FromStr for CredentialPurpose {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refund" => Ok(Self::Refund),
            "format_choice" => Ok(Self::FormatChoice),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// A stored magic link (domain type).
///
/// Several links may exist for one customer; each is valid on its own until
/// it expires or is consumed by a submission.
#[derive(Debug, Clone)]
pub struct MagicLink {
    /// Database ID.
    pub id: MagicLinkId,
    /// Opaque token embedded in the link.
    pub token: String,
    /// Customer the link acts for.
    pub customer_id: CustomerId,
    /// Page the link was issued for.
    pub purpose: CredentialPurpose,
    /// When the link was issued.
    pub created_at: DateTime<Utc>,
    /// When the link stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Whether a submission already consumed the link.
    pub used: bool,
    /// When the link was consumed.
    pub used_at: Option<DateTime<Utc>>,
}

impl MagicLink {
    /// A link is accepted strictly before its expiry instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Parameters for storing a freshly issued link.
#[derive(Debug, Clone)]
pub struct NewMagicLink {
    /// Opaque token.
    pub token: String,
    /// Customer the link acts for.
    pub customer_id: CustomerId,
    /// Page the link is issued for.
    pub purpose: CredentialPurpose,
    /// Issue instant.
    pub created_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let issued = Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap();
        let link = MagicLink {
            id: MagicLinkId::new(1),
            token: "t".into(),
            customer_id: CustomerId::new(1),
            purpose: CredentialPurpose::Refund,
            created_at: issued,
            expires_at: issued + Duration::hours(24),
            used: false,
            used_at: None,
        };

        assert!(!link.is_expired(issued + Duration::hours(23)));
        assert!(link.is_expired(issued + Duration::hours(24)));
    }

    #[test]
    fn test_purpose_wire_names() {
        let purpose: CredentialPurpose = serde_json::from_str("\"format_choice\"").unwrap();
        assert_eq!(purpose, CredentialPurpose::FormatChoice);
        assert_eq!(purpose.page(), "format-choice");
        assert_eq!("refund".parse::<CredentialPurpose>().unwrap(), CredentialPurpose::Refund);
    }
}
