//! Token acquisition: cached, silent, then interactive.
//!
//! The [`Authenticator`] tries three paths in order:
//!
//! 1. a cached, still-valid token from the system keyring;
//! 2. a silent refresh-token grant, if the cached token is expired but
//!    carries a refresh token;
//! 3. the interactive device-code flow, surfacing a user code and
//!    verification URL and polling until the user approves.
//!
//! The keyring, the browser launch, and the OAuth flows sit behind small
//! traits so the cache-hit and cache-miss paths can be exercised in tests
//! without a network or a desktop session.

use keyring::Entry;
use mailpeek_oauth::{DeviceAuthorization, DeviceFlow, OAuthClient, Provider, Token};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Keyring service name for mailpeek entries.
const SERVICE_NAME: &str = "mailpeek";

/// Keyring account name for the cached token.
const TOKEN_ACCOUNT: &str = "oauth_token";

/// Authentication failure. The run aborts before any mail fetch.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity provider rejected or aborted the flow.
    #[error("authentication failed: {0}")]
    OAuth(#[from] mailpeek_oauth::Error),
}

/// Error type for token cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to access the system keyring.
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored entry is not a valid serialized token.
    #[error("stored token is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persistent store for the token between runs.
pub trait TokenStore {
    /// Loads the cached token, if any.
    fn load(&self) -> Result<Option<Token>, CacheError>;
    /// Saves a token for later runs.
    fn save(&self, token: &Token) -> Result<(), CacheError>;
}

/// Opens a URL in the user's browser.
pub trait UrlOpener {
    /// Attempts to open `url`. Failure is non-fatal to the login.
    fn open(&self, url: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink for operator-facing instructional text.
///
/// The login banner (user code, verification URL) goes through this seam
/// so tests can assert what the operator was shown.
pub trait Console {
    /// Writes one line of instructional text.
    fn line(&self, text: &str);
}

/// The identity provider operations the authenticator needs.
#[allow(async_fn_in_trait)]
pub trait LoginFlow {
    /// Redeems a refresh token without user interaction.
    async fn refresh(&self, token: &Token) -> mailpeek_oauth::Result<Token>;
    /// Starts a device-code authorization for the given scopes.
    async fn begin(&self, scopes: &[String]) -> mailpeek_oauth::Result<DeviceAuthorization>;
    /// Polls until the user completes the out-of-band approval.
    async fn wait_for_approval(&self, auth: &DeviceAuthorization) -> mailpeek_oauth::Result<Token>;
}

/// Token store backed by the system keyring.
///
/// The token is serialized as JSON, the same way the provider returned it.
pub struct KeyringStore;

impl TokenStore for KeyringStore {
    fn load(&self) -> Result<Option<Token>, CacheError> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_ACCOUNT)?;
        match entry.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!("no cached token in keyring");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &Token) -> Result<(), CacheError> {
        let json = serde_json::to_string(token)?;
        let entry = Entry::new(SERVICE_NAME, TOKEN_ACCOUNT)?;
        entry.set_password(&json)?;
        debug!("cached token in keyring");
        Ok(())
    }
}

/// Opens URLs with the platform default browser.
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        opener::open(url).map_err(Into::into)
    }
}

/// Console backed by standard output.
pub struct Stdout;

impl Console for Stdout {
    fn line(&self, text: &str) {
        println!("{text}");
    }
}

/// Production [`LoginFlow`] backed by `mailpeek-oauth`.
pub struct OAuthLoginFlow {
    client: OAuthClient,
    flow: DeviceFlow,
}

impl OAuthLoginFlow {
    /// Builds the flow for a Microsoft tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not form a valid authority URL.
    pub fn new(client_id: &str, tenant: &str) -> mailpeek_oauth::Result<Self> {
        let provider = Provider::microsoft(tenant)?;
        let client = OAuthClient::new(client_id, provider);
        Ok(Self {
            flow: DeviceFlow::new(client.clone()),
            client,
        })
    }
}

impl LoginFlow for OAuthLoginFlow {
    async fn refresh(&self, token: &Token) -> mailpeek_oauth::Result<Token> {
        self.client.refresh_token(token).await
    }

    async fn begin(&self, scopes: &[String]) -> mailpeek_oauth::Result<DeviceAuthorization> {
        self.flow.begin(Some(scopes)).await
    }

    async fn wait_for_approval(&self, auth: &DeviceAuthorization) -> mailpeek_oauth::Result<Token> {
        self.flow.wait_for_approval(auth).await
    }
}

/// Orchestrates token acquisition across the cache and the device flow.
pub struct Authenticator<F, S, O, C> {
    flow: F,
    store: S,
    opener: O,
    console: C,
    scopes: Vec<String>,
}

impl Authenticator<OAuthLoginFlow, KeyringStore, SystemOpener, Stdout> {
    /// Builds the production authenticator from the app configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            OAuthLoginFlow::new(&config.client_id, &config.tenant)?,
            KeyringStore,
            SystemOpener,
            Stdout,
            config.scopes.clone(),
        ))
    }
}

impl<F, S, O, C> Authenticator<F, S, O, C>
where
    F: LoginFlow,
    S: TokenStore,
    O: UrlOpener,
    C: Console,
{
    /// Creates an authenticator from its parts.
    pub const fn new(flow: F, store: S, opener: O, console: C, scopes: Vec<String>) -> Self {
        Self {
            flow,
            store,
            opener,
            console,
            scopes,
        }
    }

    /// Obtains a bearer token for the configured scopes.
    ///
    /// Tries the cache, then a silent refresh, then the interactive
    /// device-code flow. Cache failures are logged and treated as a miss;
    /// a silent-refresh failure falls through to the interactive flow.
    ///
    /// # Errors
    ///
    /// Returns an error only when the interactive flow itself fails
    /// (denied, expired code, network failure during login).
    pub async fn obtain_token(&self) -> Result<Token, AuthError> {
        match self.store.load() {
            Ok(Some(token)) if token.is_valid() => {
                info!("using cached token");
                return Ok(token);
            }
            Ok(Some(token)) if token.refresh_token.is_some() => {
                info!("cached token expired, attempting silent refresh");
                match self.flow.refresh(&token).await {
                    Ok(fresh) => {
                        self.persist(&fresh);
                        return Ok(fresh);
                    }
                    Err(e) => warn!("silent refresh failed: {e}"),
                }
            }
            Ok(Some(_)) => debug!("cached token expired and not refreshable"),
            Ok(None) => debug!("no cached session"),
            Err(e) => warn!("token cache unavailable: {e}"),
        }

        self.interactive().await
    }

    async fn interactive(&self) -> Result<Token, AuthError> {
        self.console
            .line("No cached session found. Starting interactive login...");

        let auth = self.flow.begin(&self.scopes).await?;

        self.console.line("");
        self.console.line(&"=".repeat(60));
        self.console.line("USER ACTION REQUIRED:");
        match &auth.message {
            Some(message) => self.console.line(message),
            None => self.console.line(&format!(
                "To sign in, visit {} and enter the code {}.",
                auth.verification_uri, auth.user_code
            )),
        }
        self.console.line(&"=".repeat(60));
        self.console.line("");

        // Convenience only; the user can always copy the URL by hand.
        if let Err(e) = self.opener.open(&auth.verification_uri) {
            warn!("could not open browser: {e}");
        }

        let token = self.flow.wait_for_approval(&auth).await?;
        self.persist(&token);
        Ok(token)
    }

    fn persist(&self, token: &Token) {
        if let Err(e) = self.store.save(token) {
            warn!("failed to cache token: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, Utc};
    use mailpeek_oauth::Error;

    use super::*;

    struct FakeStore {
        cached: Option<Token>,
        saved: Mutex<Vec<Token>>,
    }

    impl FakeStore {
        fn with(cached: Option<Token>) -> Self {
            Self {
                cached,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    impl TokenStore for FakeStore {
        fn load(&self) -> Result<Option<Token>, CacheError> {
            Ok(self.cached.clone())
        }

        fn save(&self, token: &Token) -> Result<(), CacheError> {
            self.saved.lock().unwrap().push(token.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeOpener {
        opened: Mutex<Vec<String>>,
    }

    impl UrlOpener for &FakeOpener {
        fn open(&self, url: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeConsole {
        lines: Mutex<Vec<String>>,
    }

    impl FakeConsole {
        fn text(&self) -> String {
            self.lines.lock().unwrap().join("\n")
        }
    }

    impl Console for &FakeConsole {
        fn line(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    struct FakeFlow {
        /// Token the refresh grant yields; None makes the refresh fail.
        refresh_grant: Option<Token>,
        /// Token the device flow yields; None makes the user deny.
        device_grant: Option<Token>,
        /// Server-supplied banner text, if any.
        message: Option<String>,
        begin_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    impl FakeFlow {
        fn granting(token: Token) -> Self {
            Self {
                refresh_grant: None,
                device_grant: Some(token),
                message: None,
                begin_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
            }
        }
    }

    impl LoginFlow for &FakeFlow {
        async fn refresh(&self, _token: &Token) -> mailpeek_oauth::Result<Token> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_grant
                .clone()
                .ok_or_else(|| Error::oauth_error("invalid_grant", "refresh token revoked"))
        }

        async fn begin(&self, _scopes: &[String]) -> mailpeek_oauth::Result<DeviceAuthorization> {
            self.begin_calls.fetch_add(1, Ordering::SeqCst);
            Ok(DeviceAuthorization {
                device_code: "dev-code".to_string(),
                user_code: "ABCD-EFGH".to_string(),
                verification_uri: "https://microsoft.com/devicelogin".to_string(),
                verification_uri_complete: None,
                message: self.message.clone(),
                expires_in: 900,
                interval: 5,
            })
        }

        async fn wait_for_approval(
            &self,
            _auth: &DeviceAuthorization,
        ) -> mailpeek_oauth::Result<Token> {
            self.device_grant.clone().ok_or(Error::AccessDenied)
        }
    }

    fn scopes() -> Vec<String> {
        vec!["User.Read".to_string(), "Mail.Read".to_string()]
    }

    fn valid_token(access: &str) -> Token {
        Token::new(access, "Bearer").with_expires_at(Utc::now() + Duration::hours(1))
    }

    fn expired_token(access: &str) -> Token {
        Token::new(access, "Bearer").with_expires_at(Utc::now() - Duration::hours(1))
    }

    #[tokio::test]
    async fn cached_valid_token_skips_device_flow() {
        let flow = FakeFlow::granting(valid_token("fresh"));
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let auth = Authenticator::new(
            &flow,
            FakeStore::with(Some(valid_token("cached"))),
            &opener,
            &console,
            scopes(),
        );

        let token = auth.obtain_token().await.unwrap();

        assert_eq!(token.access_token, "cached");
        assert_eq!(flow.begin_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(opener.opened.lock().unwrap().is_empty());
        // No user code or URL was shown either.
        assert!(console.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_miss_runs_device_flow_and_opens_browser() {
        let flow = FakeFlow::granting(valid_token("fresh"));
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let auth = Authenticator::new(&flow, FakeStore::with(None), &opener, &console, scopes());

        let token = auth.obtain_token().await.unwrap();

        assert_eq!(token.access_token, "fresh");
        assert_eq!(flow.begin_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            opener.opened.lock().unwrap().as_slice(),
            ["https://microsoft.com/devicelogin"]
        );

        // The operator saw the user code and verification URL.
        let shown = console.text();
        assert!(shown.contains("USER ACTION REQUIRED:"));
        assert!(shown.contains("ABCD-EFGH"));
        assert!(shown.contains("https://microsoft.com/devicelogin"));
    }

    #[tokio::test]
    async fn provider_banner_text_is_shown_verbatim() {
        let mut flow = FakeFlow::granting(valid_token("fresh"));
        flow.message =
            Some("To sign in, use a web browser to open the page example.com.".to_string());
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let auth = Authenticator::new(&flow, FakeStore::with(None), &opener, &console, scopes());

        auth.obtain_token().await.unwrap();

        assert!(
            console
                .text()
                .contains("To sign in, use a web browser to open the page example.com.")
        );
    }

    #[tokio::test]
    async fn device_flow_token_is_persisted() {
        let flow = FakeFlow::granting(valid_token("fresh"));
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let store = FakeStore::with(None);
        let auth = Authenticator::new(&flow, store, &opener, &console, scopes());

        auth.obtain_token().await.unwrap();

        let saved = auth.store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].access_token, "fresh");
    }

    #[tokio::test]
    async fn expired_token_with_refresh_is_refreshed_silently() {
        let flow = FakeFlow {
            refresh_grant: Some(valid_token("refreshed")),
            device_grant: None,
            message: None,
            begin_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        };
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let cached = expired_token("stale").with_refresh_token("rt");
        let auth = Authenticator::new(
            &flow,
            FakeStore::with(Some(cached)),
            &opener,
            &console,
            scopes(),
        );

        let token = auth.obtain_token().await.unwrap();

        assert_eq!(token.access_token, "refreshed");
        assert_eq!(flow.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.begin_calls.load(Ordering::SeqCst), 0);
        assert!(opener.opened.lock().unwrap().is_empty());
        assert!(console.lines.lock().unwrap().is_empty());
        assert_eq!(auth.store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_interactive() {
        let flow = FakeFlow::granting(valid_token("fresh"));
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let cached = expired_token("stale").with_refresh_token("revoked");
        let auth = Authenticator::new(
            &flow,
            FakeStore::with(Some(cached)),
            &opener,
            &console,
            scopes(),
        );

        let token = auth.obtain_token().await.unwrap();

        assert_eq!(token.access_token, "fresh");
        assert_eq!(flow.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.begin_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_authorization_is_an_error() {
        let flow = FakeFlow {
            refresh_grant: None,
            device_grant: None,
            message: None,
            begin_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        };
        let opener = FakeOpener::default();
        let console = FakeConsole::default();
        let auth = Authenticator::new(&flow, FakeStore::with(None), &opener, &console, scopes());

        let result = auth.obtain_token().await;

        assert!(matches!(result, Err(AuthError::OAuth(Error::AccessDenied))));
    }
}
