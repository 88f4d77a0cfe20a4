//! Modular common utilities shared across calnote crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - (always on): OAuth data types, CSRF state, the auth error taxonomy
//! - `runtime`: single-resolution result slot and capability traits
//! - `platform`: HTTP token endpoint client
//! - `test-utils`: in-memory doubles for the capability traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types for convenience
// ------------------------
pub use auth::{AuthError, Credentials, CsrfState, Token};
