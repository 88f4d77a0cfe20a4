//! CSRF state tokens for the authorization redirect
//!
//! Every authorization attempt embeds a fresh, unguessable `state` value in
//! the authorization URL and only accepts a redirect that echoes it back.

use std::fmt;

use rand::RngCore;

/// Number of random bytes in a state token.
pub const STATE_BYTES: usize = 16;

/// Length of the hex-encoded state token.
pub const STATE_LEN: usize = STATE_BYTES * 2;

/// Generate a random state token for CSRF protection
///
/// Returns 16 bytes from the thread-local CSPRNG encoded as 32 lowercase hex
/// characters.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Validate that the state token matches
///
/// Comparison time depends only on the lengths, not on where the inputs
/// first differ.
///
/// # Arguments
/// * `expected` - The state that was sent in the authorization request
/// * `actual` - The state received in the callback
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }

    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Per-attempt CSRF state
///
/// Never reused: each loopback server or manual prompt generates its own.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfState(String);

impl CsrfState {
    /// Generate a fresh state token.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_state())
    }

    /// The hex-encoded token, as embedded in the authorization URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `received` is exactly this state.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        validate_state(&self.0, received)
    }
}

impl fmt::Display for CsrfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CsrfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to correlate log lines, not enough to forge a callback.
        write!(f, "CsrfState({}…)", &self.0[..self.0.len().min(6)])
    }
}
