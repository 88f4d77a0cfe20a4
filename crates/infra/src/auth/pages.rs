//! HTML pages served to the browser at the end of the loopback flow

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use calnote_domain::constants::APP_NAME;

const SUCCESS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorization Complete</title></head>
<body>
<h1>Authorization Successful</h1>
<p>{{app}} has been authorized. You can close this window and return to the terminal.</p>
</body>
</html>"#;

const FAILURE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorization Failed</title></head>
<body>
<h1>Authorization Failed</h1>
<p>{{reason}}</p>
<p>Return to the terminal; {{app}} will offer manual code entry.</p>
</body>
</html>"#;

/// Outcome shown to the operator's browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPage {
    /// Code captured
    Success,
    /// Provider redirected with an `error` parameter
    Denied(String),
    /// State did not match the attempt
    CsrfMismatch,
    /// State matched but no code was present
    MissingCode,
    /// Query string could not be parsed
    Malformed,
    /// The attempt was already resolved by an earlier callback
    AlreadyCompleted,
}

impl CallbackPage {
    /// HTTP status sent with the page
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn reason(&self) -> String {
        match self {
            Self::Success => String::new(),
            Self::Denied(error) => format!("The provider reported an error: {error}"),
            Self::CsrfMismatch => {
                "The response did not match this sign-in attempt and was discarded.".to_string()
            }
            Self::MissingCode => "The response did not include an authorization code.".to_string(),
            Self::Malformed => "The response from the provider could not be read.".to_string(),
            Self::AlreadyCompleted => "This sign-in attempt has already completed.".to_string(),
        }
    }
}

/// Renders [`CallbackPage`]s
///
/// Each loopback server owns its own copy; there is no shared template
/// state between servers.
#[derive(Debug, Clone)]
pub struct CallbackPages {
    app_name: String,
    success_template: String,
    failure_template: String,
}

impl Default for CallbackPages {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl CallbackPages {
    /// Built-in pages naming `app_name`.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            success_template: SUCCESS_TEMPLATE.to_string(),
            failure_template: FAILURE_TEMPLATE.to_string(),
        }
    }

    /// Replace the templates.
    ///
    /// `{{app}}` and `{{reason}}` are substituted with HTML-escaped values.
    #[must_use]
    pub fn with_templates(
        mut self,
        success_template: impl Into<String>,
        failure_template: impl Into<String>,
    ) -> Self {
        self.success_template = success_template.into();
        self.failure_template = failure_template.into();
        self
    }

    /// Render `page` to an HTML body.
    #[must_use]
    pub fn render(&self, page: &CallbackPage) -> String {
        let template = match page {
            CallbackPage::Success => &self.success_template,
            _ => &self.failure_template,
        };

        template
            .replace("{{app}}", &escape_html(&self.app_name))
            .replace("{{reason}}", &escape_html(&page.reason()))
    }

    /// Render `page` as a complete response.
    #[must_use]
    pub fn respond(&self, page: &CallbackPage) -> Response {
        (page.status(), [(header::CONNECTION, "close")], Html(self.render(page))).into_response()
    }
}

/// Escape text for inclusion in HTML element content.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
