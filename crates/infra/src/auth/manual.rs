//! Manual authorization code entry
//!
//! Used when the loopback flow cannot complete, e.g. on a remote shell where
//! the browser runs on another machine. The operator opens the URL, approves
//! access, and pastes back either the bare code or the whole address the
//! browser was redirected to.

use std::borrow::Cow;
use std::io;
use std::sync::Arc;

use calnote_common::auth::{AuthError, CsrfState, OperatorConsole};
use tracing::{debug, warn};

const CODE_MARKER: &str = "code=";
const STATE_MARKER: &str = "state=";

/// Pull an authorization code out of operator input.
///
/// Rules, first match wins:
/// 1. Input containing `code=` yields everything after it up to the next
///    `&`, percent-decoded.
/// 2. Input with neither `://` nor `=` is taken whole as the code.
/// 3. Anything else is rejected.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
/// Returns [`AuthError::Extraction`] when no non-empty code can be found.
pub fn extract_code(input: &str) -> Result<String, AuthError> {
    let input = input.trim();

    if let Some(index) = input.find(CODE_MARKER) {
        let rest = &input[index + CODE_MARKER.len()..];
        let raw = rest.split('&').next().unwrap_or_default();
        let code = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
        if code.is_empty() {
            return Err(AuthError::Extraction("the code parameter is empty".to_string()));
        }
        return Ok(code.into_owned());
    }

    if input.contains("://") || input.contains('=') {
        return Err(AuthError::Extraction(
            "the input looks like a URL but has no code parameter".to_string(),
        ));
    }

    if input.is_empty() {
        return Err(AuthError::Extraction("no input".to_string()));
    }

    Ok(input.to_string())
}

/// The `state` parameter of a pasted redirect address, if it has one.
fn pasted_state(input: &str) -> Option<Cow<'_, str>> {
    input
        .trim()
        .split(['?', '&', '#'])
        .find_map(|segment| segment.strip_prefix(STATE_MARKER))
        .map(|raw| urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw)))
}

/// Interactive code entry over an [`OperatorConsole`]
pub struct ManualCodeEntry {
    console: Arc<dyn OperatorConsole>,
    expected_state: Option<CsrfState>,
}

impl ManualCodeEntry {
    /// Prompt on `console`.
    pub fn new(console: Arc<dyn OperatorConsole>) -> Self {
        Self { console, expected_state: None }
    }

    /// Reject pasted addresses whose `state` differs from `state`.
    ///
    /// Bare codes and addresses without a `state` parameter are still
    /// accepted.
    #[must_use]
    pub fn with_expected_state(mut self, state: CsrfState) -> Self {
        self.expected_state = Some(state);
        self
    }

    /// Print the authorization URL and instructions, then read one answer.
    ///
    /// # Errors
    /// - [`AuthError::Extraction`] when the answer holds no code
    /// - [`AuthError::Console`] when input ends or cannot be read
    pub async fn prompt_and_extract_code(&self, auth_url: &str) -> Result<String, AuthError> {
        self.console.say("");
        self.console.say("Open this URL in a browser and approve access:");
        self.console.say("");
        self.console.say(&format!("    {auth_url}"));
        self.console.say("");
        self.console.say(
            "The browser then lands on an address that may fail to load. Copy that \
             whole address from the address bar (or just the value of its `code` \
             parameter) and paste it here.",
        );

        self.read_code().await
    }

    /// Read and extract one more answer without repeating the instructions.
    ///
    /// # Errors
    /// Same as [`prompt_and_extract_code`](Self::prompt_and_extract_code).
    /// A pasted address from another sign-in attempt is an
    /// [`AuthError::Extraction`] as well.
    pub async fn read_code(&self) -> Result<String, AuthError> {
        self.console.say("Authorization code or redirect URL:");

        let line = self.console.read_line().await.map_err(AuthError::Console)?;
        let Some(line) = line else {
            return Err(AuthError::Console(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a code was entered",
            )));
        };

        let code = extract_code(&line)?;
        if let (Some(expected), Some(pasted)) = (&self.expected_state, pasted_state(&line)) {
            if !expected.matches(&pasted) {
                warn!("Pasted redirect address carries a state from another attempt");
                return Err(AuthError::Extraction(
                    "the address belongs to a different sign-in attempt".to_string(),
                ));
            }
        }
        debug!(code_len = code.len(), "Authorization code entered manually");
        Ok(code)
    }
}
