//! Terminal-backed operator console

use std::io::{self, Write};

use async_trait::async_trait;
use calnote_common::auth::OperatorConsole;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Prompts on stdout, reads answers from stdin
///
/// Log output goes to stderr, so stdout carries only operator-facing text.
pub struct StdConsole {
    input: Mutex<BufReader<Stdin>>,
}

impl StdConsole {
    /// Console over the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self { input: Mutex::new(BufReader::new(tokio::io::stdin())) }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorConsole for StdConsole {
    fn say(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    async fn read_line(&self) -> io::Result<Option<String>> {
        let mut input = self.input.lock().await;
        let mut line = String::new();

        if input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
