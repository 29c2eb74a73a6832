//! Boxset Core - Domain types for the box set self-service workflow.
//!
//! Customers who bought packs of the box set receive a magic link and use it
//! to either pick physical formats (CD or vinyl) for their packs or request a
//! refund for a pack that cannot be delivered. This crate holds the pieces of
//! that workflow that need no I/O:
//!
//! - [`types`] - Newtype IDs, emails, pack lines, amounts, addresses, bank details
//! - [`allocation`] - The exact-partition check for format choices
//!
//! The server crate owns persistence, HTTP and email delivery.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocation;
pub mod types;

pub use allocation::{Allocation, AllocationError, FormatChoice, FormatSplit, validate_allocation};
pub use types::*;
