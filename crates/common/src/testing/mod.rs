//! Testing utilities and helpers
//!
//! In-memory doubles for the capability traits in [`crate::auth::traits`]:
//! - **[`mocks::MemoryTokenStore`]**: token persistence without a filesystem
//! - **[`mocks::MockCodeExchanger`]**: scripted token endpoint
//! - **[`mocks::RecordingBrowser`]**: records (and optionally reacts to)
//!   opened URLs
//! - **[`mocks::ScriptedConsole`]**: replays operator input, captures output

pub mod mocks;

pub use mocks::{MemoryTokenStore, MockCodeExchanger, RecordingBrowser, ScriptedConsole};
