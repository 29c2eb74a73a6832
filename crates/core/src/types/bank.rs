//! Bank details for refunds.
//!
//! IBAN and BIC are checked for shape only: no checksum, no registry lookup.
//! Both are normalized by removing all whitespace and uppercasing before the
//! check, and stored in that normalized form.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Two country letters, two check digits, then 1-30 alphanumerics.
static IBAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{1,30}$").expect("Invalid regex"));

/// Six letters, two alphanumerics, optional three-character branch code.
static BIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$").expect("Invalid regex"));

/// Errors from [`BankDetails::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BankDetailsError {
    /// IBAN or BIC is blank.
    #[error("bank field '{0}' is required")]
    MissingField(&'static str),
    /// The IBAN does not have a valid structure.
    #[error("invalid IBAN format")]
    InvalidIban,
    /// The BIC does not have a valid structure.
    #[error("invalid BIC format")]
    InvalidBic,
}

fn compact_upper(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// A structurally valid, normalized IBAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Iban(String);

impl Iban {
    /// Normalize and check the shape of an IBAN.
    ///
    /// # Errors
    ///
    /// Returns [`BankDetailsError::InvalidIban`] if the normalized value does
    /// not match the expected structure.
    pub fn parse(raw: &str) -> Result<Self, BankDetailsError> {
        let compact = compact_upper(raw);
        if IBAN_RE.is_match(&compact) {
            Ok(Self(compact))
        } else {
            Err(BankDetailsError::InvalidIban)
        }
    }

    /// The normalized IBAN.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The IBAN in groups of four characters, as printed on bank statements.
    #[must_use]
    pub fn grouped(&self) -> String {
        self.0
            .as_bytes()
            .chunks(4)
            .map(|chunk| String::from_utf8_lossy(chunk))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Iban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A structurally valid, normalized BIC (8 or 11 characters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bic(String);

impl Bic {
    /// Normalize and check the shape of a BIC.
    ///
    /// # Errors
    ///
    /// Returns [`BankDetailsError::InvalidBic`] if the normalized value does
    /// not match the expected structure.
    pub fn parse(raw: &str) -> Result<Self, BankDetailsError> {
        let compact = compact_upper(raw);
        if BIC_RE.is_match(&compact) {
            Ok(Self(compact))
        } else {
            Err(BankDetailsError::InvalidBic)
        }
    }

    /// The normalized BIC.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bank details as submitted with a refund request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankDetails {
    /// Account IBAN, free-form spacing allowed.
    #[serde(default)]
    pub iban: String,
    /// Institution BIC, free-form spacing allowed.
    #[serde(default)]
    pub bic: String,
}

impl BankDetails {
    /// Check presence, then shape, of both fields.
    ///
    /// # Errors
    ///
    /// [`BankDetailsError::MissingField`] when either field is blank, then
    /// [`BankDetailsError::InvalidIban`] / [`BankDetailsError::InvalidBic`].
    pub fn validate(&self) -> Result<(Iban, Bic), BankDetailsError> {
        if self.iban.trim().is_empty() {
            return Err(BankDetailsError::MissingField("iban"));
        }
        if self.bic.trim().is_empty() {
            return Err(BankDetailsError::MissingField("bic"));
        }
        Ok((Iban::parse(&self.iban)?, Bic::parse(&self.bic)?))
    }
}
