//! Loopback HTTP server that receives the OAuth redirect
//!
//! One server per authorization attempt. It listens on an ephemeral
//! `127.0.0.1` port, accepts exactly one meaningful callback, and hands the
//! outcome to the waiting coordinator through a [`ResultSlot`].
//!
//! The handler checks the redirect in a fixed order:
//! 1. `error` present: the provider refused; report it.
//! 2. `state` differs from the attempt's: possible CSRF; the code is
//!    discarded unread.
//! 3. `code` missing or empty: malformed redirect.
//! 4. Otherwise the code is delivered.
//!
//! A query string that cannot be parsed at all (for example a repeated
//! `state`) is a failed callback too; it resolves the attempt like any other.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use calnote_common::auth::{result_slot, AuthError, CsrfState, ResultSlot, ResultWaiter, WaitError};
use calnote_domain::constants::{CALLBACK_BIND_ADDR, CALLBACK_PATH, DEFAULT_SHUTDOWN_GRACE_SECS};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::pages::{CallbackPage, CallbackPages};

type CallbackOutcome = Result<String, AuthError>;

/// Query parameters of the provider redirect.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectCallback {
    /// Authorization code
    pub code: Option<String>,
    /// Echoed CSRF state
    pub state: Option<String>,
    /// Provider error code, e.g. `access_denied`
    pub error: Option<String>,
}

impl RedirectCallback {
    /// Evaluate the redirect against the attempt's state.
    ///
    /// # Errors
    /// [`AuthError::Denied`], [`AuthError::CsrfMismatch`] or
    /// [`AuthError::MissingCode`], checked in that order.
    pub fn evaluate(self, expected: &CsrfState) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            let error = if error.is_empty() { "unknown_error".to_string() } else { error };
            return Err(AuthError::Denied(error));
        }

        if !self.state.as_deref().is_some_and(|state| expected.matches(state)) {
            return Err(AuthError::CsrfMismatch);
        }

        self.code.filter(|code| !code.is_empty()).ok_or(AuthError::MissingCode)
    }
}

/// Identity of one authorization attempt
#[derive(Debug, Clone)]
pub struct AuthorizationAttempt {
    state: CsrfState,
    port: u16,
    redirect_url: String,
}

impl AuthorizationAttempt {
    fn new(port: u16) -> Self {
        Self {
            state: CsrfState::generate(),
            port,
            redirect_url: format!("http://127.0.0.1:{port}{CALLBACK_PATH}"),
        }
    }

    /// CSRF state sent in the authorization URL
    #[must_use]
    pub const fn state(&self) -> &CsrfState {
        &self.state
    }

    /// Loopback port the server listens on
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URL registered with this attempt
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }
}

struct CallbackContext {
    expected_state: CsrfState,
    slot: ResultSlot<CallbackOutcome>,
    pages: CallbackPages,
}

/// Loopback HTTP server for a single authorization attempt
pub struct LocalCallbackServer {
    attempt: AuthorizationAttempt,
    waiter: Option<ResultWaiter<CallbackOutcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl LocalCallbackServer {
    /// Start a server with the built-in pages and default shutdown grace.
    ///
    /// # Errors
    /// Returns [`AuthError::Bind`] if no loopback port can be bound.
    pub async fn start() -> Result<Self, AuthError> {
        Self::start_with(CallbackPages::default(), Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS))
            .await
    }

    /// Start a server on an ephemeral loopback port.
    ///
    /// A fresh CSRF state is generated for the attempt.
    ///
    /// # Errors
    /// Returns [`AuthError::Bind`] if no loopback port can be bound.
    pub async fn start_with(pages: CallbackPages, shutdown_grace: Duration) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(CALLBACK_BIND_ADDR).await.map_err(AuthError::Bind)?;
        let port = listener.local_addr().map_err(AuthError::Bind)?.port();

        let attempt = AuthorizationAttempt::new(port);
        let (slot, waiter) = result_slot();
        let context = Arc::new(CallbackContext {
            expected_state: attempt.state.clone(),
            slot,
            pages,
        });

        let app = Router::new().route(CALLBACK_PATH, get(handle_callback)).with_state(context);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "OAuth callback server error");
            }
        });

        info!(port, "OAuth callback server listening");

        Ok(Self {
            attempt,
            waiter: Some(waiter),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            shutdown_grace,
        })
    }

    /// The attempt this server belongs to
    #[must_use]
    pub const fn attempt(&self) -> &AuthorizationAttempt {
        &self.attempt
    }

    /// Redirect URL to put in the authorization request
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        self.attempt.redirect_url()
    }

    /// Wait for the callback outcome, at most `timeout`.
    ///
    /// The outcome can be consumed once; later calls report
    /// [`AuthError::ResultAbandoned`].
    ///
    /// # Errors
    /// - The callback's own failure (`Denied`, `CsrfMismatch`, `MissingCode`,
    ///   `MalformedCallback`)
    /// - [`AuthError::Timeout`] when no callback arrives in time
    /// - [`AuthError::ResultAbandoned`] when the server stopped without one
    pub async fn wait_for_result(&mut self, timeout: Duration) -> Result<String, AuthError> {
        let waiter = self.waiter.take().ok_or(AuthError::ResultAbandoned)?;

        debug!(timeout_secs = timeout.as_secs(), "Waiting for OAuth callback");

        match waiter.wait(timeout).await {
            Ok(outcome) => outcome,
            Err(WaitError::TimedOut(after)) => Err(AuthError::Timeout(after)),
            Err(WaitError::Abandoned) => Err(AuthError::ResultAbandoned),
        }
    }

    /// Stop the server and release the port.
    ///
    /// Waits up to the shutdown grace period for in-flight requests, then
    /// aborts the listener task. The port is released either way.
    ///
    /// # Errors
    /// Returns [`AuthError::Shutdown`] if the server had to be aborted or
    /// panicked.
    pub async fn shutdown(mut self) -> Result<(), AuthError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
            Ok(Ok(())) => {
                debug!(port = self.attempt.port, "OAuth callback server stopped");
                Ok(())
            }
            Ok(Err(err)) if err.is_panic() => {
                Err(AuthError::Shutdown(format!("OAuth callback server panicked: {err}")))
            }
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                handle.abort();
                let _ = handle.await;
                Err(AuthError::Shutdown(format!(
                    "server did not stop within {:?} and was aborted",
                    self.shutdown_grace
                )))
            }
        }
    }
}

impl Drop for LocalCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(
    State(context): State<Arc<CallbackContext>>,
    query: Result<Query<RedirectCallback>, QueryRejection>,
) -> Response {
    if context.slot.is_resolved() {
        warn!("Rejected OAuth callback for an attempt that already completed");
        return context.pages.respond(&CallbackPage::AlreadyCompleted);
    }

    let outcome = match query {
        Ok(Query(params)) => params.evaluate(&context.expected_state),
        Err(rejection) => Err(AuthError::MalformedCallback(rejection.body_text())),
    };
    let page = match &outcome {
        Ok(_) => CallbackPage::Success,
        Err(AuthError::Denied(error)) => CallbackPage::Denied(error.clone()),
        Err(AuthError::CsrfMismatch) => CallbackPage::CsrfMismatch,
        Err(AuthError::MalformedCallback(_)) => CallbackPage::Malformed,
        Err(_) => CallbackPage::MissingCode,
    };

    match &outcome {
        Ok(_) => info!("OAuth callback received authorization code"),
        Err(err) if err.is_security_relevant() => warn!(error = %err, "OAuth callback rejected"),
        Err(err) => info!(error = %err, "OAuth callback reported failure"),
    }

    // Two callbacks can race past the check above; only the slot decides.
    if !context.slot.resolve(outcome) {
        warn!("Rejected OAuth callback for an attempt that already completed");
        return context.pages.respond(&CallbackPage::AlreadyCompleted);
    }

    context.pages.respond(&page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> RedirectCallback {
        RedirectCallback {
            code: code.map(String::from),
            state: state.map(String::from),
            error: error.map(String::from),
        }
    }

    #[test]
    fn error_parameter_wins_over_everything() {
        let state = CsrfState::generate();
        let result = callback(Some("code"), Some(state.as_str()), Some("access_denied")).evaluate(&state);

        assert!(matches!(result, Err(AuthError::Denied(e)) if e == "access_denied"));
    }

    #[test]
    fn mismatched_state_never_yields_code() {
        let state = CsrfState::generate();
        let other = CsrfState::generate();

        let result = callback(Some("4/0Ab"), Some(other.as_str()), None).evaluate(&state);
        assert!(matches!(result, Err(AuthError::CsrfMismatch)));

        let result = callback(Some("4/0Ab"), None, None).evaluate(&state);
        assert!(matches!(result, Err(AuthError::CsrfMismatch)));
    }

    #[test]
    fn empty_code_is_missing() {
        let state = CsrfState::generate();

        let result = callback(Some(""), Some(state.as_str()), None).evaluate(&state);
        assert!(matches!(result, Err(AuthError::MissingCode)));
    }

    #[test]
    fn matching_state_delivers_exact_code() {
        let state = CsrfState::generate();

        let result = callback(Some("4/0AbCd-Ef"), Some(state.as_str()), None).evaluate(&state);
        assert_eq!(result.expect("code"), "4/0AbCd-Ef");
    }

    #[tokio::test]
    async fn redirect_url_uses_bound_port() {
        let server = LocalCallbackServer::start().await.expect("bind");
        let port = server.attempt().port();

        assert_ne!(port, 0);
        assert_eq!(server.redirect_url(), format!("http://127.0.0.1:{port}/callback"));
        assert_eq!(server.attempt().state().as_str().len(), 32);

        server.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn result_can_only_be_awaited_once() {
        let mut server = LocalCallbackServer::start().await.expect("bind");

        let first = server.wait_for_result(Duration::from_millis(10)).await;
        let second = server.wait_for_result(Duration::from_millis(10)).await;

        assert!(matches!(first, Err(AuthError::Timeout(_))));
        assert!(matches!(second, Err(AuthError::ResultAbandoned)));
        server.shutdown().await.expect("shutdown");
    }
}
