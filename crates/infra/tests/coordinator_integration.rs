//! End-to-end tests for the authorization coordinator
//!
//! Real loopback server, real file store and real token client against a
//! mock token endpoint. The browser double plays the provider: when asked to
//! open the authorization URL it issues the redirect itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use calnote_common::auth::{
    AuthError, CodeExchanger, Credentials, OAuthTokenClient, Token, TokenStore,
};
use calnote_common::testing::{MockCodeExchanger, RecordingBrowser, ScriptedConsole};
use calnote_infra::auth::{AuthPhase, AuthorizationCoordinator, CoordinatorSettings, FileTokenStore};
use reqwest::Client;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn no_proxy_client() -> Client {
    Client::builder().no_proxy().build().expect("http client")
}

fn credentials(token_uri: String) -> Credentials {
    Credentials::new(
        "e2e-client",
        "e2e-secret",
        "https://accounts.google.com/o/oauth2/auth",
        token_uri,
        vec!["http://localhost".to_string()],
    )
}

fn settings(callback_timeout: Duration) -> CoordinatorSettings {
    CoordinatorSettings {
        callback_timeout,
        shutdown_grace: Duration::from_secs(2),
        manual_attempts: 3,
        open_browser: true,
    }
}

fn query_of(url: &str) -> HashMap<String, String> {
    Url::parse(url).expect("authorization url").query_pairs().into_owned().collect()
}

/// Browser that answers the authorization URL with a redirect built by
/// `respond` from the URL's `state`.
fn provider_browser(respond: fn(&str) -> String) -> RecordingBrowser {
    RecordingBrowser::with_hook(move |auth_url| {
        let query = query_of(&auth_url);
        let callback = format!("{}?{}", query["redirect_uri"], respond(&query["state"]));
        tokio::spawn(async move {
            let _ = no_proxy_client().get(callback).send().await;
        });
    })
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.e2e",
            "refresh_token": "1//e2e-refresh",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Validates the full loopback flow and the no-op second run.
///
/// # Test Steps
/// 1. Start with no token file
/// 2. Let the browser double redirect with the attempt's state and a code
/// 3. Verify the code was exchanged with the loopback redirect URI
/// 4. Verify the token file exists and holds the token
/// 5. Run again with the same store and verify no browser, no exchange
#[tokio::test]
async fn test_loopback_flow_then_stored_token() {
    init_tracing();
    let endpoint = MockServer::start().await;
    mount_token_endpoint(&endpoint, 1).await;

    let dir = TempDir::new().expect("temp dir");
    let token_path = dir.path().join("calnote").join("token.json");
    let creds = credentials(format!("{}/token", endpoint.uri()));
    let exchanger: Arc<dyn CodeExchanger> =
        Arc::new(OAuthTokenClient::with_http_client(creds.clone(), no_proxy_client()));

    let browser = Arc::new(provider_browser(|state| format!("code=4%2F0Loopback&state={state}")));
    let console = Arc::new(ScriptedConsole::new(Vec::<String>::new()));
    let coordinator = AuthorizationCoordinator::new(
        creds.clone(),
        Arc::new(FileTokenStore::new(&token_path)),
        Arc::clone(&exchanger),
    )
    .with_settings(settings(Duration::from_secs(10)))
    .with_browser(browser.clone())
    .with_console(console.clone());

    let token = coordinator.acquire().await.expect("loopback flow");

    assert_eq!(token.access_token, "ya29.e2e");
    assert_eq!(coordinator.current_phase(), AuthPhase::Done);
    assert_eq!(browser.opened().len(), 1);
    assert!(console.printed(&browser.opened()[0]), "URL must always be printed");

    let requests = endpoint.received_requests().await.expect("recorded requests");
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("code=4%2F0Loopback"), "{body}");
    assert!(body.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A"), "{body}");

    let stored = FileTokenStore::new(&token_path).load().await.expect("token file");
    assert_eq!(stored, token);

    let second_browser = Arc::new(RecordingBrowser::new());
    let second = AuthorizationCoordinator::new(
        creds,
        Arc::new(FileTokenStore::new(&token_path)),
        exchanger,
    )
    .with_browser(second_browser.clone())
    .with_console(Arc::new(ScriptedConsole::new(Vec::<String>::new())));

    let reused = second.acquire().await.expect("stored token");

    assert_eq!(reused, token);
    assert!(second_browser.opened().is_empty());
    // The mock's `expect(1)` is verified when `endpoint` drops.
}

/// Validates fallback when the provider reports an error on the redirect.
///
/// Assertions:
/// - The coordinator switches to manual entry.
/// - The manual code is exchanged with the manual redirect URI.
#[tokio::test]
async fn test_denied_redirect_falls_back_to_manual_entry() {
    init_tracing();
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(FileTokenStore::new(dir.path().join("token.json")));
    let exchanger = Arc::new(MockCodeExchanger::returning(Token::new("manual-access", "r", 3600)));
    let console = Arc::new(ScriptedConsole::new(["http://localhost/?code=MANUAL-42&scope=y"]));

    let coordinator = AuthorizationCoordinator::new(
        credentials("https://oauth2.example.com/token".to_string()),
        store.clone(),
        exchanger.clone(),
    )
    .with_settings(settings(Duration::from_secs(10)))
    .with_browser(Arc::new(provider_browser(|state| format!("error=access_denied&state={state}"))))
    .with_console(console.clone());

    let token = coordinator.acquire().await.expect("manual flow");

    assert_eq!(token.access_token, "manual-access");
    assert_eq!(exchanger.calls(), vec![("MANUAL-42".to_string(), "http://localhost".to_string())]);
    assert!(console.printed("access_denied"));
    assert_eq!(store.load().await.expect("saved"), token);
}

/// Validates that a forged redirect is never exchanged.
///
/// Assertions:
/// - The attacker's code never reaches the token endpoint.
/// - The operator's pasted code does.
#[tokio::test]
async fn test_forged_state_is_never_exchanged() {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(FileTokenStore::new(dir.path().join("token.json")));
    let exchanger = Arc::new(MockCodeExchanger::returning(Token::new("a", "r", 3600)));
    let console = Arc::new(ScriptedConsole::new(["operator-code"]));

    let coordinator = AuthorizationCoordinator::new(
        credentials("https://oauth2.example.com/token".to_string()),
        store,
        exchanger.clone(),
    )
    .with_settings(settings(Duration::from_secs(10)))
    .with_browser(Arc::new(provider_browser(|_| {
        "code=attacker-code&state=00000000000000000000000000000000".to_string()
    })))
    .with_console(console);

    coordinator.acquire().await.expect("manual flow");

    let codes: Vec<String> = exchanger.calls().into_iter().map(|(code, _)| code).collect();
    assert_eq!(codes, vec!["operator-code".to_string()]);
}

/// Validates that operator end-of-input after a timeout fails the run.
///
/// Assertions:
/// - The error carries both the timeout and the console failure.
/// - Nothing is exchanged or stored.
#[tokio::test]
async fn test_timeout_then_end_of_input_fails() {
    let dir = TempDir::new().expect("temp dir");
    let token_path = dir.path().join("token.json");
    let exchanger = Arc::new(MockCodeExchanger::returning(Token::new("a", "r", 3600)));

    let coordinator = AuthorizationCoordinator::new(
        credentials("https://oauth2.example.com/token".to_string()),
        Arc::new(FileTokenStore::new(&token_path)),
        exchanger.clone(),
    )
    .with_settings(settings(Duration::from_millis(200)))
    .with_browser(Arc::new(RecordingBrowser::new()))
    .with_console(Arc::new(ScriptedConsole::new(Vec::<String>::new())));

    let err = coordinator.acquire().await.expect_err("no code anywhere");

    assert!(
        matches!(
            &err,
            AuthError::AuthorizationFailed { local, manual }
                if matches!(**local, AuthError::Timeout(_)) && matches!(**manual, AuthError::Console(_))
        ),
        "{err:?}"
    );
    assert_eq!(coordinator.current_phase(), AuthPhase::Failed);
    assert!(exchanger.calls().is_empty());
    assert!(!token_path.exists());
}

/// Validates that an unreadable token file triggers re-authorization.
#[tokio::test]
async fn test_corrupt_token_file_is_replaced() {
    let dir = TempDir::new().expect("temp dir");
    let token_path = dir.path().join("token.json");
    std::fs::write(&token_path, "not json").expect("write");

    let exchanger = Arc::new(MockCodeExchanger::returning(Token::new("fresh", "r", 3600)));
    let coordinator = AuthorizationCoordinator::new(
        credentials("https://oauth2.example.com/token".to_string()),
        Arc::new(FileTokenStore::new(&token_path)),
        exchanger,
    )
    .with_settings(settings(Duration::from_secs(10)))
    .with_browser(Arc::new(provider_browser(|state| format!("code=fresh-code&state={state}"))))
    .with_console(Arc::new(ScriptedConsole::new(Vec::<String>::new())));

    let token = coordinator.acquire().await.expect("re-authorized");

    let stored = FileTokenStore::new(&token_path).load().await.expect("valid now");
    assert_eq!(stored, token);
    assert_eq!(stored.access_token, "fresh");
}
