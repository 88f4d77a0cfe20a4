//! Token acquisition state machine
//!
//! ```text
//! LoadingToken ──(usable token)──────────────────────────────► Done
//!      │
//!      ▼
//! AttemptingLocalFlow ──(code)──► CodeExchange ──► Done | Failed
//!      │
//!      └─(any failure)─► ManualFlow ──(code)──► CodeExchange ──► Done | Failed
//!                             └─(no code)─────────────────────► Failed
//! ```
//!
//! Every local-flow failure (bind, timeout, CSRF mismatch, provider denial,
//! missing code) falls back to manual entry. Exchange and storage failures
//! are terminal and never retried.

use std::sync::Arc;
use std::time::Duration;

use calnote_common::auth::{
    build_authorization_url, AuthError, BrowserLauncher, CodeExchanger, Credentials, CsrfState,
    OperatorConsole, Token, TokenStore,
};
use calnote_domain::constants::{
    DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_MANUAL_ATTEMPTS, DEFAULT_SHUTDOWN_GRACE_SECS,
};
use calnote_domain::AuthConfig;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::browser::{system_browser, NoopBrowser};
use super::callback_server::LocalCallbackServer;
use super::console::StdConsole;
use super::manual::ManualCodeEntry;
use super::pages::CallbackPages;

/// Where [`AuthorizationCoordinator::acquire`] currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// Not started
    Idle,
    /// Reading the stored token
    LoadingToken,
    /// Loopback server running, waiting for the redirect
    AttemptingLocalFlow,
    /// Waiting for the operator to paste a code
    ManualFlow,
    /// Trading the code for a token
    CodeExchange,
    /// Token available
    Done,
    /// Gave up
    Failed,
}

/// Tunables for one coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// How long to wait for the loopback redirect
    pub callback_timeout: Duration,
    /// How long the loopback server gets to stop
    pub shutdown_grace: Duration,
    /// Manual entry prompts before giving up (at least 1)
    pub manual_attempts: u32,
    /// Whether to launch a browser at all
    pub open_browser: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            manual_attempts: DEFAULT_MANUAL_ATTEMPTS,
            open_browser: true,
        }
    }
}

impl From<&AuthConfig> for CoordinatorSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            callback_timeout: Duration::from_secs(config.callback_timeout_seconds),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
            manual_attempts: config.manual_attempts,
            open_browser: config.open_browser,
        }
    }
}

/// Code plus the redirect URI it was issued for
struct AuthorizedCode {
    code: String,
    redirect_uri: String,
}

/// Obtains a usable token, authorizing interactively when needed
pub struct AuthorizationCoordinator {
    credentials: Credentials,
    store: Arc<dyn TokenStore>,
    exchanger: Arc<dyn CodeExchanger>,
    browser: Arc<dyn BrowserLauncher>,
    console: Arc<dyn OperatorConsole>,
    pages: CallbackPages,
    settings: CoordinatorSettings,
    phase: Mutex<AuthPhase>,
}

impl AuthorizationCoordinator {
    /// Coordinator using the platform browser and the terminal.
    pub fn new(
        credentials: Credentials,
        store: Arc<dyn TokenStore>,
        exchanger: Arc<dyn CodeExchanger>,
    ) -> Self {
        Self {
            credentials,
            store,
            exchanger,
            browser: system_browser(),
            console: Arc::new(StdConsole::new()),
            pages: CallbackPages::default(),
            settings: CoordinatorSettings::default(),
            phase: Mutex::new(AuthPhase::Idle),
        }
    }

    /// Replace the settings; disabling the browser swaps in [`NoopBrowser`].
    #[must_use]
    pub fn with_settings(mut self, settings: CoordinatorSettings) -> Self {
        if !settings.open_browser {
            self.browser = Arc::new(NoopBrowser);
        }
        self.settings = settings;
        self
    }

    /// Replace the browser launcher.
    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// Replace the operator console.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn OperatorConsole>) -> Self {
        self.console = console;
        self
    }

    /// Replace the pages served at the end of the loopback flow.
    #[must_use]
    pub fn with_pages(mut self, pages: CallbackPages) -> Self {
        self.pages = pages;
        self
    }

    /// Last phase entered by [`acquire`](Self::acquire)
    #[must_use]
    pub fn current_phase(&self) -> AuthPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: AuthPhase) {
        debug!(?phase, "Authorization phase");
        *self.phase.lock() = phase;
    }

    /// Return the stored token, or authorize and store a new one.
    ///
    /// # Errors
    /// - [`AuthError::AuthorizationFailed`] when both the loopback flow and
    ///   manual entry failed
    /// - [`AuthError::Exchange`] when the provider rejects the code
    /// - [`AuthError::TokenWrite`] when the new token cannot be saved
    pub async fn acquire(&self) -> Result<Token, AuthError> {
        let result = self.run().await;
        match &result {
            Ok(_) => self.enter(AuthPhase::Done),
            Err(err) => {
                self.enter(AuthPhase::Failed);
                self.console.say(&format!("Authorization failed: {err}"));
            }
        }
        result
    }

    async fn run(&self) -> Result<Token, AuthError> {
        self.enter(AuthPhase::LoadingToken);
        match self.store.load().await {
            Ok(token) if token.is_usable() => {
                info!(location = %self.store.location(), "Using stored token");
                return Ok(token);
            }
            Ok(_) => info!("Stored token has neither access nor refresh token; authorizing"),
            Err(AuthError::TokenNotFound(_)) => info!("No stored token; authorizing"),
            Err(err) => warn!(error = %err, "Stored token unusable; authorizing"),
        }

        let authorized = match self.run_local_flow().await {
            Ok(authorized) => authorized,
            Err(local) => {
                warn!(error = %local, "Loopback flow failed; falling back to manual entry");
                self.console.say(&format!("Automatic sign-in did not complete: {local}"));
                self.console.say("Switching to manual code entry.");

                self.run_manual_flow().await.map_err(|manual| AuthError::AuthorizationFailed {
                    local: Box::new(local),
                    manual: Box::new(manual),
                })?
            }
        };

        self.enter(AuthPhase::CodeExchange);
        let token =
            self.exchanger.exchange_code(&authorized.code, &authorized.redirect_uri).await?;

        self.store.save(&token).await?;
        self.console.say(&format!("Authorization complete. Token saved to {}", self.store.location()));
        Ok(token)
    }

    async fn run_local_flow(&self) -> Result<AuthorizedCode, AuthError> {
        self.enter(AuthPhase::AttemptingLocalFlow);

        let mut server =
            LocalCallbackServer::start_with(self.pages.clone(), self.settings.shutdown_grace)
                .await?;
        let redirect_uri = server.redirect_url().to_string();
        let auth_url =
            build_authorization_url(&self.credentials, &redirect_uri, server.attempt().state());

        self.console.say("Open this URL in a browser to authorize access:");
        self.console.say("");
        self.console.say(&format!("    {auth_url}"));
        self.console.say("");
        self.launch_browser(&auth_url);
        self.console.say(&format!(
            "Waiting up to {}s for the browser to return...",
            self.settings.callback_timeout.as_secs()
        ));

        let result = server.wait_for_result(self.settings.callback_timeout).await;

        if let Err(err) = server.shutdown().await {
            warn!(error = %err, "OAuth callback server did not stop cleanly");
        }

        let code = result?;
        Ok(AuthorizedCode { code, redirect_uri })
    }

    async fn run_manual_flow(&self) -> Result<AuthorizedCode, AuthError> {
        self.enter(AuthPhase::ManualFlow);

        let state = CsrfState::generate();
        let redirect_uri = self.credentials.manual_redirect_uri().to_string();
        let auth_url = build_authorization_url(&self.credentials, &redirect_uri, &state);
        let entry = ManualCodeEntry::new(Arc::clone(&self.console)).with_expected_state(state.clone());
        let max_attempts = self.settings.manual_attempts.max(1);

        let mut attempt = 1;
        let mut outcome = entry.prompt_and_extract_code(&auth_url).await;
        loop {
            match outcome {
                Ok(code) => return Ok(AuthorizedCode { code, redirect_uri }),
                Err(AuthError::Extraction(reason)) if attempt < max_attempts => {
                    warn!(attempt, %reason, "Could not extract authorization code");
                    self.console.say(&format!(
                        "Could not find a code in that input ({reason}). {} attempt(s) left.",
                        max_attempts - attempt
                    ));
                    attempt += 1;
                    outcome = entry.read_code().await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn launch_browser(&self, url: &str) {
        match self.browser.open(url) {
            Ok(()) => debug!(launcher = self.browser.name(), "Browser launch requested"),
            Err(err) => {
                warn!(launcher = self.browser.name(), error = %err, "Could not open a browser");
                self.console.say("Could not open a browser automatically; open the URL above.");
            }
        }
    }
}
