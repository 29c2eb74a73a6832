//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first, as layered in `main.rs`)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. CORS
//! 3. `TraceLayer` (request span)
//! 4. Request ID (recorded into the trace span, echoed in the response)
//! 5. Rate limiting on `POST /credential` (governor)
//!
//! The admin bearer check is an extractor, [`RequireAdmin`], used by the
//! stats handler.

pub mod admin_auth;
pub mod rate_limit;
pub mod request_id;

pub use admin_auth::RequireAdmin;
pub use rate_limit::{RateLimiterLayer, credential_rate_limiter};
pub use request_id::request_id_middleware;
