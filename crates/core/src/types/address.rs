//! Postal delivery address.

use serde::{Deserialize, Serialize};

/// An address field that must not be blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// A required field is empty after trimming.
    #[error("address field '{0}' is required")]
    MissingField(&'static str),
}

/// A delivery address as submitted by a customer.
///
/// Field names accept the historical French keys (`adresse1`, `codepostal`, ...)
/// so older clients keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    /// Street and number.
    #[serde(default, alias = "adresse1")]
    pub line1: String,
    /// Optional complement (building, floor, ...).
    #[serde(default, alias = "adresse2")]
    pub line2: Option<String>,
    /// Postal code.
    #[serde(default, alias = "codepostal")]
    pub postal_code: String,
    /// City.
    #[serde(default, alias = "ville")]
    pub city: String,
    /// Country.
    #[serde(default, alias = "pays")]
    pub country: String,
}

impl PostalAddress {
    /// Check that street, postal code, city and country are present, returning
    /// a trimmed copy with an empty complement collapsed to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] naming the first blank field.
    pub fn validate(&self) -> Result<Self, AddressError> {
        let line1 = required(&self.line1, "line1")?;
        let postal_code = required(&self.postal_code, "postalCode")?;
        let city = required(&self.city, "city")?;
        let country = required(&self.country, "country")?;
        let line2 = self
            .line2
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Ok(Self {
            line1,
            line2,
            postal_code,
            city,
            country,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AddressError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AddressError::MissingField(field));
    }
    Ok(trimmed.to_owned())
}
