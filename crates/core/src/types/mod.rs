//! Core types for the self-service workflow.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod amount;
pub mod bank;
pub mod email;
pub mod id;
pub mod pack;

pub use address::{AddressError, PostalAddress};
pub use amount::{Amount, UNIT_PRICE, refund_amount};
pub use bank::{BankDetails, BankDetailsError, Bic, Iban};
pub use email::{Email, EmailError};
pub use id::*;
pub use pack::{PackCounts, PackLine, PhysicalFormat, UnknownVariant};
