//! Application constants
//!
//! Centralized location for domain-level constants used by the
//! authorization flow.

/// Application name, used for config/token directory names.
pub const APP_NAME: &str = "calnote";

// OAuth scopes requested by the exporter. The set is fixed: read-only
// calendar and read-only file access.
pub const SCOPE_CALENDAR_READONLY: &str = "https://www.googleapis.com/auth/calendar.readonly";
pub const SCOPE_DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";

/// The exact scope set requested on every authorization.
pub const REQUIRED_SCOPES: [&str; 2] = [SCOPE_CALENDAR_READONLY, SCOPE_DRIVE_READONLY];

// File names
pub const TOKEN_FILE_NAME: &str = "token.json";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

// Loopback callback server
pub const CALLBACK_BIND_ADDR: &str = "127.0.0.1:0";
pub const CALLBACK_PATH: &str = "/callback";
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

// Manual code entry
pub const DEFAULT_MANUAL_ATTEMPTS: u32 = 3;
pub const DEFAULT_MANUAL_REDIRECT_URI: &str = "http://localhost";

/// Token endpoint request timeout.
pub const TOKEN_REQUEST_TIMEOUT_SECS: u64 = 30;
