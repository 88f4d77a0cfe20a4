//! Default-browser launchers
//!
//! Opening a browser is a convenience. The authorization URL is always
//! printed as well, so a launcher failure only gets logged.

use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;

use calnote_common::auth::BrowserLauncher;

/// macOS: `open <url>`
#[derive(Debug, Clone, Copy, Default)]
pub struct MacOsBrowser;

/// Windows: `rundll32.exe url.dll,FileProtocolHandler <url>`
///
/// Goes through the URL protocol handler so the default browser opens;
/// `explorer <url>` can open File Explorer for some URL shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsBrowser;

/// Linux and other Unix desktops: `xdg-open <url>`
#[derive(Debug, Clone, Copy, Default)]
pub struct XdgBrowser;

/// Launcher that never opens anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBrowser;

impl MacOsBrowser {
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }
}

impl WindowsBrowser {
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("rundll32.exe");
        cmd.arg("url.dll,FileProtocolHandler").arg(url);
        cmd
    }
}

impl XdgBrowser {
    fn command(url: &str) -> Command {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Spawn a launcher detached from the terminal and reap it in the
/// background.
fn spawn_detached(mut cmd: Command) -> io::Result<()> {
    let mut child =
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

impl BrowserLauncher for MacOsBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn_detached(Self::command(url))
    }

    fn name(&self) -> &'static str {
        "open"
    }
}

impl BrowserLauncher for WindowsBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn_detached(Self::command(url))
    }

    fn name(&self) -> &'static str {
        "rundll32"
    }
}

impl BrowserLauncher for XdgBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn_detached(Self::command(url))
    }

    fn name(&self) -> &'static str {
        "xdg-open"
    }
}

impl BrowserLauncher for NoopBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Launcher for the platform this binary was built for.
///
/// Platforms with no known launcher get [`NoopBrowser`].
#[must_use]
pub fn system_browser() -> Arc<dyn BrowserLauncher> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(MacOsBrowser)
    }

    #[cfg(target_os = "windows")]
    {
        Arc::new(WindowsBrowser)
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Arc::new(XdgBrowser)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(NoopBrowser)
    }
}
