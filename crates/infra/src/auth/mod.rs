//! Interactive OAuth authorization for a command-line tool
//!
//! Implementations of the `calnote_common::auth` capability traits plus the
//! coordinator that ties them together:
//!
//! - [`FileTokenStore`]: owner-only JSON token file
//! - [`CredentialLoader`]: client document discovery
//! - [`LocalCallbackServer`]: loopback redirect capture with CSRF check
//! - [`ManualCodeEntry`]: paste-the-code fallback
//! - [`AuthorizationCoordinator`]: the acquisition state machine

pub mod browser;
pub mod callback_server;
pub mod console;
pub mod coordinator;
pub mod credentials;
pub mod manual;
pub mod pages;
pub mod token_store;

pub use browser::{system_browser, MacOsBrowser, NoopBrowser, WindowsBrowser, XdgBrowser};
pub use callback_server::{AuthorizationAttempt, LocalCallbackServer, RedirectCallback};
pub use console::StdConsole;
pub use coordinator::{AuthPhase, AuthorizationCoordinator, CoordinatorSettings};
pub use credentials::{parse_credentials, standard_candidates, CredentialLoader};
pub use manual::{extract_code, ManualCodeEntry};
pub use pages::{escape_html, CallbackPage, CallbackPages};
pub use token_store::FileTokenStore;
