//! OAuth 2.0 for the authenticated half of the dashboard (YouTube Analytics).
//!
//! The public statistics only need an API key. Audience reports are private to the channel
//! owner, so they go through Google's installed-application flow: the user's browser is sent
//! to the consent screen and Google redirects back to a one-shot listener on localhost.

use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, Scope, TokenResponse, TokenUrl, reqwest,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::instrument;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";

/// Read-only access to YouTube Analytics reports.
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/yt-analytics.readonly";

/// Read-only access to the user's own YouTube account, needed for `channels.list?mine=true`.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

const OAUTH_DONE_HTML: &str = "<!doctype html><html><body>\
    <h1>Channel Doctor is authorized</h1>\
    <p>You can close this tab and return to the terminal.</p>\
    </body></html>";

/// Runs OAuth flows against Google's endpoints for one OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    token_url: String,
}

impl OAuthManager {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: vec![
                ANALYTICS_READONLY_SCOPE.to_string(),
                YOUTUBE_READONLY_SCOPE.to_string(),
            ],
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Exchanges codes and refresh tokens at a different endpoint, e.g. a local mock.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    fn token_uri(&self) -> eyre::Result<TokenUrl> {
        TokenUrl::new(self.token_url.clone()).context("parse token URL")
    }

    fn http_client() -> eyre::Result<reqwest::Client> {
        reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")
    }

    /// Performs the full authorization flow and returns a fresh token.
    ///
    /// Opens the user's browser at the consent screen, waits for the redirect on a local port,
    /// and exchanges the code (with its PKCE verifier) for a token.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("parse auth URL")?)
            .set_token_uri(self.token_uri()?)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // The flow runs exactly once, so the CSRF token is never reused.
            .authorize_url(move || csrf.clone())
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            // Headless machines can still finish the flow by pasting the URL manually.
            tracing::warn!(error = %e, "could not open browser");
            eprintln!("Open this URL to authorize Channel Doctor:\n{auth_url}");
        }

        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&Self::http_client()?)
            .await
            .context("exchange authorization code for access token")
    }

    /// Exchanges the refresh token in `token` for a new access token.
    ///
    /// * `Ok(Some(new_token))` - refresh succeeded
    /// * `Ok(None)` - there is no refresh token, or Google considers it revoked
    /// * `Err(_)` - network or other error
    #[instrument(skip_all)]
    pub async fn refresh_token(
        &self,
        token: &BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(self.token_uri()?);

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&Self::http_client()?)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("refresh token rejected as invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }
}

/// An access token together with the moment it should no longer be trusted.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token loaded from disk. It is treated as expired so the first use refreshes it.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a token that was just issued.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: expiry_of(&token, SystemTime::now()),
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// Refreshes in place. Returns `Ok(false)` if the grant is gone and the user must
    /// re-authorize.
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        let Some(new_token) = oauth_manager
            .refresh_token(&self.token)
            .await
            .context("refresh OAuth token")?
        else {
            return Ok(false);
        };

        let old_token = std::mem::replace(&mut self.token, new_token);
        // Google usually omits the refresh token from refresh responses.
        if self.token.refresh_token().is_none() {
            self.token
                .set_refresh_token(old_token.refresh_token().cloned());
        }
        self.expires_at = expiry_of(&self.token, SystemTime::now());
        Ok(true)
    }
}

/// `expires_in` minus a five minute buffer; 55 minutes when the server didn't say.
fn expiry_of(token: &BasicTokenResponse, issued: SystemTime) -> SystemTime {
    match token.expires_in() {
        Some(expires_in) => issued + expires_in.saturating_sub(Duration::from_secs(300)),
        None => issued + Duration::from_secs(3300),
    }
}

/// A token shared between API clients that refreshes itself on demand.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    oauth_manager: Arc<OAuthManager>,
}

impl OAuthSession {
    pub fn new(token: TimeBoundAccessToken, oauth_manager: Arc<OAuthManager>) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
        }
    }

    /// The current raw token, for persisting.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Returns an access token that is valid for at least a few more minutes.
    #[instrument(skip(self))]
    pub async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;
        if token.is_expired(SystemTime::now()) {
            tracing::debug!("access token expired, refreshing");
            if !token.refresh(&self.oauth_manager).await? {
                eyre::bail!("unable to refresh expired access token; re-authorization required");
            }
        }
        Ok(token.token.access_token().secret().to_string())
    }
}

/// Where the OAuth token is kept between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> eyre::Result<Option<BasicTokenResponse>> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("check for {}", self.path.display()))?
        {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read {}", self.path.display()))?;
        if json.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&json)
            .map(Some)
            .with_context(|| format!("parse stored OAuth token in {}", self.path.display()))
    }

    pub async fn save(&self, token: &BasicTokenResponse) -> eyre::Result<()> {
        let json = serde_json::to_string_pretty(token).context("serialize OAuth token")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("write {}", self.path.display()))
    }
}

/// Produces a ready-to-use session: reuses and refreshes the stored token when possible,
/// and falls back to the browser flow otherwise. The resulting token is written back.
pub async fn authorize(
    oauth_manager: OAuthManager,
    store: &TokenStore,
) -> eyre::Result<OAuthSession> {
    let token = match reuse_stored_token(&oauth_manager, store).await? {
        Some(token) => token,
        None => TimeBoundAccessToken::new(
            oauth_manager
                .authenticate()
                .await
                .context("authorize with YouTube Analytics")?,
        ),
    };

    store.save(token.raw_token()).await?;
    Ok(OAuthSession::new(token, Arc::new(oauth_manager)))
}

/// Refreshes the token in `store`. `Ok(None)` means there is nothing usable on disk and the
/// user has to go through the browser flow.
async fn reuse_stored_token(
    oauth_manager: &OAuthManager,
    store: &TokenStore,
) -> eyre::Result<Option<TimeBoundAccessToken>> {
    let Some(stored) = store.load().await? else {
        return Ok(None);
    };
    tracing::info!(path = %store.path().display(), "refreshing stored OAuth token");
    let mut token = TimeBoundAccessToken::expired(stored);
    if token
        .refresh(oauth_manager)
        .await
        .context("refresh stored token")?
    {
        Ok(Some(token))
    } else {
        tracing::warn!("stored token no longer valid, starting OAuth flow");
        Ok(None)
    }
}

/// Pulls the authorization code out of the redirect's query string after checking `state`.
fn parse_callback(query: &str, csrf: &CsrfToken) -> Result<AuthorizationCode, &'static str> {
    let mut state = None;
    let mut code = None;
    let mut error = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => state = Some(v),
            "code" => code = Some(v),
            "error" => error = Some(v),
            _ => {}
        }
    }
    if state.as_deref() != Some(csrf.secret().as_str()) {
        return Err("invalid csrf token");
    }
    if error.is_some() {
        return Err("authorization was denied");
    }
    match code {
        Some(code) => Ok(AuthorizationCode::new(code.into_owned())),
        None => Err("no authorization code found"),
    }
}

/// Binds a one-shot HTTP listener on a random local port for the OAuth redirect.
///
/// Returns the redirect URL to register with the authorization request, and a future that
/// resolves once the browser has been redirected back with a valid code.
async fn setup_redirect(
    csrf: CsrfToken,
) -> eyre::Result<(
    RedirectUrl,
    impl Future<Output = eyre::Result<AuthorizationCode>>,
)> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .context("construct redirect url")?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let r = async move {
            let (conn, _) = socket.accept().await.context("accept")?;
            let conn = hyper_util::rt::TokioIo::new(conn);
            let (got, mut gotten) = tokio::sync::mpsc::channel(1);
            let service = service_fn(move |req: Request<body::Incoming>| {
                let csrf = csrf.clone();
                let got = got.clone();
                async move {
                    let code = parse_callback(req.uri().query().unwrap_or(""), &csrf)?;
                    // The receiver lives until the connection is shut down below.
                    let _ = got.send(code).await;
                    Ok::<_, &'static str>(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
                }
            });
            let mut serve = std::pin::pin!(
                hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
            );

            tokio::select! {
                exit = &mut serve => {
                    match exit {
                        Err(e) => Err(e).context("redirect server got bad request"),
                        Ok(()) => eyre::bail!("redirect server exited before receiving a code"),
                    }
                }
                code = gotten.recv() => {
                    serve.as_mut().graceful_shutdown();
                    let _ = serve.await;
                    code.ok_or_else(|| eyre::eyre!("redirect handler went away"))
                }
            }
        };
        let _ = tx.send(r.await);
    });

    Ok((url, async move {
        rx.await.context("redirect future dropped prematurely")?
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    const REFRESHED: &str =
        r#"{"access_token":"new","token_type":"Bearer","expires_in":3599,"scope":"x"}"#;
    const REVOKED: &str =
        r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#;

    fn token(json: &str) -> BasicTokenResponse {
        serde_json::from_str(json).unwrap()
    }

    fn stored() -> BasicTokenResponse {
        token(r#"{"access_token":"old","token_type":"bearer","expires_in":3599,"refresh_token":"r1"}"#)
    }

    /// A token endpoint on a local port that answers every request with `status` and `reply`.
    /// Returns the endpoint URL and the form bodies it received.
    async fn token_endpoint(
        status: u16,
        reply: &'static str,
    ) -> (String, Arc<std::sync::Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let forms = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = forms.clone();
        tokio::spawn(async move {
            while let Ok((conn, _)) = listener.accept().await {
                let log = log.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<body::Incoming>| {
                        let log = log.clone();
                        async move {
                            let form = req.into_body().collect().await?.to_bytes();
                            log.lock()
                                .unwrap()
                                .push(String::from_utf8_lossy(&form).into_owned());
                            Ok::<_, hyper::Error>(
                                Response::builder()
                                    .status(status)
                                    .header("content-type", "application/json")
                                    .body(Full::<Bytes>::from(reply))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(hyper_util::rt::TokioIo::new(conn), service)
                        .await;
                });
            }
        });
        (format!("http://{addr}/token"), forms)
    }

    fn manager(token_url: &str) -> OAuthManager {
        OAuthManager::new("id", "secret").with_token_url(token_url)
    }

    #[test]
    fn callback_requires_matching_state() {
        let csrf = CsrfToken::new("expected".to_string());
        assert_eq!(
            parse_callback("state=other&code=abc", &csrf).unwrap_err(),
            "invalid csrf token"
        );
        assert_eq!(
            parse_callback("code=abc", &csrf).unwrap_err(),
            "invalid csrf token"
        );
        let code = parse_callback("state=expected&code=4%2F0Ab&scope=x", &csrf).unwrap();
        assert_eq!(code.secret(), "4/0Ab");
    }

    #[test]
    fn callback_reports_denial() {
        let csrf = CsrfToken::new("s".to_string());
        assert_eq!(
            parse_callback("state=s&error=access_denied", &csrf).unwrap_err(),
            "authorization was denied"
        );
        assert_eq!(
            parse_callback("state=s", &csrf).unwrap_err(),
            "no authorization code found"
        );
    }

    #[test]
    fn expiry_keeps_safety_buffer() {
        let issued = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let with = token(r#"{"access_token":"a","token_type":"bearer","expires_in":3600}"#);
        assert_eq!(expiry_of(&with, issued), issued + Duration::from_secs(3300));
        let without = token(r#"{"access_token":"a","token_type":"bearer"}"#);
        assert_eq!(expiry_of(&without, issued), issued + Duration::from_secs(3300));
        let short = token(r#"{"access_token":"a","token_type":"bearer","expires_in":60}"#);
        assert_eq!(expiry_of(&short, issued), issued);
    }

    #[test]
    fn loaded_tokens_start_expired() {
        let t = token(r#"{"access_token":"a","token_type":"bearer","expires_in":3600}"#);
        assert!(TimeBoundAccessToken::expired(t.clone()).is_expired(SystemTime::now()));
        assert!(!TimeBoundAccessToken::new(t).is_expired(SystemTime::now()));
    }

    #[tokio::test]
    async fn fresh_token_is_used_without_refresh() {
        let session = OAuthSession::new(
            TimeBoundAccessToken::new(token(
                r#"{"access_token":"live","token_type":"bearer","expires_in":3600}"#,
            )),
            Arc::new(OAuthManager::new("id", "secret")),
        );
        assert_eq!(session.fresh_access_token().await.unwrap(), "live");
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_fails() {
        let session = OAuthSession::new(
            TimeBoundAccessToken::expired(token(
                r#"{"access_token":"old","token_type":"bearer"}"#,
            )),
            Arc::new(OAuthManager::new("id", "secret")),
        );
        assert!(session.fresh_access_token().await.is_err());
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token() {
        let (url, forms) = token_endpoint(200, REFRESHED).await;
        let mut t = TimeBoundAccessToken::expired(stored());
        assert!(t.refresh(&manager(&url)).await.unwrap());

        assert_eq!(t.raw_token().access_token().secret(), "new");
        assert_eq!(t.raw_token().refresh_token().unwrap().secret(), "r1");
        assert!(!t.is_expired(SystemTime::now()));

        let forms = forms.lock().unwrap().clone();
        assert_eq!(forms.len(), 1);
        assert!(forms[0].contains("grant_type=refresh_token"), "{}", forms[0]);
        assert!(forms[0].contains("refresh_token=r1"), "{}", forms[0]);
    }

    #[tokio::test]
    async fn invalid_grant_means_no_token() {
        let (url, _) = token_endpoint(400, REVOKED).await;
        let m = manager(&url);
        assert!(m.refresh_token(&stored()).await.unwrap().is_none());

        let mut t = TimeBoundAccessToken::expired(stored());
        assert!(!t.refresh(&m).await.unwrap());
        assert_eq!(t.raw_token().access_token().secret(), "old");
    }

    #[tokio::test]
    async fn other_token_endpoint_failures_are_errors() {
        let (url, _) = token_endpoint(500, r#"{"error":"server_error"}"#).await;
        assert!(manager(&url).refresh_token(&stored()).await.is_err());
    }

    #[tokio::test]
    async fn expired_session_refreshes_on_demand() {
        let (url, forms) = token_endpoint(200, REFRESHED).await;
        let session = OAuthSession::new(
            TimeBoundAccessToken::expired(stored()),
            Arc::new(manager(&url)),
        );
        assert_eq!(session.fresh_access_token().await.unwrap(), "new");
        assert_eq!(session.fresh_access_token().await.unwrap(), "new");
        assert_eq!(forms.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stored_token_is_refreshed_and_saved_back() {
        let (url, _) = token_endpoint(200, REFRESHED).await;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.save(&stored()).await.unwrap();

        let session = authorize(manager(&url), &store).await.unwrap();
        assert_eq!(session.fresh_access_token().await.unwrap(), "new");

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token().secret(), "new");
        assert_eq!(saved.refresh_token().unwrap().secret(), "r1");
    }

    #[tokio::test]
    async fn revoked_stored_token_falls_back_to_browser_flow() {
        let (url, _) = token_endpoint(400, REVOKED).await;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        assert!(reuse_stored_token(&manager(&url), &store).await.unwrap().is_none());

        store.save(&stored()).await.unwrap();
        assert!(reuse_stored_token(&manager(&url), &store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        assert!(store.load().await.unwrap().is_none());

        let t = token(
            r#"{"access_token":"a","token_type":"bearer","expires_in":3599,"refresh_token":"r"}"#,
        );
        store.save(&t).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token().secret(), "a");
        assert_eq!(loaded.refresh_token().unwrap().secret(), "r");
    }
}
