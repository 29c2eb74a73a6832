//! Business logic services.
//!
//! # Services
//!
//! - `credential` - Magic link issuance
//! - `token` - Magic link validation
//! - `submission` - Format choice and refund request flows
//! - `stats` - Operator dashboard aggregates
//! - `outbox` - Background delivery of confirmation emails
//! - `email` - Email rendering and delivery via SMTP

pub mod credential;
pub mod email;
pub mod outbox;
pub mod stats;
pub mod submission;
pub mod token;

pub use credential::{LinkBuilder, TOKEN_TTL_HOURS, generate_token, issue_credential};
pub use email::{EmailError, Mailer, SmtpMailer};
pub use outbox::{DispatchSummary, OutboxDispatcher};
pub use stats::{StatsReport, compute_stats, load_stats};
pub use submission::{FormatChoiceSubmission, RefundSubmission, submit_format_choice, submit_refund};
pub use token::{ValidatedToken, validate_token};
