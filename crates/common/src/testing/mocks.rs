//! Mock implementations of the auth capability traits
//!
//! Provides mock objects for testing purposes.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{AuthError, BrowserLauncher, CodeExchanger, OperatorConsole, Token, TokenStore};

type BrowserHook = Arc<dyn Fn(String) + Send + Sync>;

/// In-memory token store
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-utils")]
/// # {
/// use calnote_common::testing::MemoryTokenStore;
/// use calnote_common::Token;
///
/// let store = MemoryTokenStore::with_token(Token::new("access", "refresh", 3600));
/// assert!(store.current().is_some());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
    fail_writes: Mutex<bool>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`.
    #[must_use]
    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        *store.token.lock() = Some(token);
        store
    }

    /// Make every subsequent `save` fail with a write error.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Snapshot of the stored token.
    #[must_use]
    pub fn current(&self) -> Option<Token> {
        self.token.lock().clone()
    }

    /// Number of `load` calls.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of successful `save` calls.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Token, AuthError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.token.lock().clone().ok_or_else(|| AuthError::TokenNotFound(PathBuf::from("memory")))
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        if *self.fail_writes.lock() {
            return Err(AuthError::TokenWrite {
                path: PathBuf::from("memory"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        *self.token.lock() = Some(token.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.token.lock().take();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Scripted token endpoint
///
/// Succeeds with a fixed token unless told to fail; records every
/// `(code, redirect_uri)` pair it receives.
#[derive(Debug)]
pub struct MockCodeExchanger {
    outcome: Mutex<Result<Token, String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockCodeExchanger {
    /// Exchanger that returns `token` for any code.
    #[must_use]
    pub fn returning(token: Token) -> Self {
        Self { outcome: Mutex::new(Ok(token)), calls: Mutex::new(Vec::new()) }
    }

    /// Exchanger that rejects every code with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self { outcome: Mutex::new(Err(message.into())), calls: Mutex::new(Vec::new()) }
    }

    /// Every `(code, redirect_uri)` pair received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CodeExchanger for MockCodeExchanger {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, AuthError> {
        self.calls.lock().push((code.to_string(), redirect_uri.to_string()));
        self.outcome.lock().clone().map_err(AuthError::Exchange)
    }
}

/// Browser double
///
/// Records every URL; optionally fails to "launch", and optionally runs a
/// hook with the URL so a test can play the provider's part.
#[derive(Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<String>>,
    fail: bool,
    hook: Option<BrowserHook>,
}

impl RecordingBrowser {
    /// Browser that succeeds and does nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Browser whose launch always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Browser that calls `hook` with every opened URL.
    #[must_use]
    pub fn with_hook(hook: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self { hook: Some(Arc::new(hook)), ..Self::default() }
    }

    /// URLs opened so far.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl std::fmt::Debug for RecordingBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBrowser")
            .field("opened", &self.opened.lock().len())
            .field("fail", &self.fail)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().push(url.to_string());
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no browser available"));
        }
        if let Some(hook) = &self.hook {
            hook(url.to_string());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Console double
///
/// Replays queued input lines, then reports end of input. Everything
/// printed is captured.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: Mutex<VecDeque<String>>,
    output: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    /// Console that will answer prompts with `lines`, in order.
    #[must_use]
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: Mutex::new(lines.into_iter().map(Into::into).collect()),
            output: Mutex::new(Vec::new()),
        }
    }

    /// Everything printed so far, one entry per `say` call.
    #[must_use]
    pub fn output(&self) -> Vec<String> {
        self.output.lock().clone()
    }

    /// Whether any printed line contains `needle`.
    #[must_use]
    pub fn printed(&self, needle: &str) -> bool {
        self.output.lock().iter().any(|line| line.contains(needle))
    }

    /// Number of input lines not yet consumed.
    #[must_use]
    pub fn remaining_input(&self) -> usize {
        self.input.lock().len()
    }
}

#[async_trait]
impl OperatorConsole for ScriptedConsole {
    fn say(&self, text: &str) {
        self.output.lock().push(text.to_string());
    }

    async fn read_line(&self) -> io::Result<Option<String>> {
        Ok(self.input.lock().pop_front())
    }
}
