//! Domain models for the self-service workflow.
//!
//! These types represent validated records, separate from the database row
//! types in [`crate::db`].

pub mod customer;
pub mod magic_link;
pub mod outbox;

pub use customer::{Customer, NewCustomer};
pub use magic_link::{CredentialPurpose, MagicLink, NewMagicLink};
pub use outbox::{OutboxEmail, OutboxStatus, OutgoingEmail};
