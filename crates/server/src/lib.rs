//! Boxset server library.
//!
//! The HTTP service behind the box set self-service pages: customers ask for
//! a magic link by email, then use it to pick CD/vinyl formats for their
//! packs or to request a refund. Operators read aggregate figures from a
//! bearer-protected stats endpoint.
//!
//! Persistence and mail delivery sit behind traits ([`db::Store`],
//! [`services::Mailer`]) so the router can run against `PostgreSQL` and SMTP
//! in production and against in-memory doubles in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
