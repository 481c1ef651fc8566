//! Authenticators turning credentials into an `Authorization` header.
//!
//! Four schemes are supported, mirroring the `<SERVICE>_AUTH_TYPE` values
//! accepted by [`crate::config::ServiceConfig`]:
//!
//! | Type | Header |
//! |------|--------|
//! | `iam` | `Bearer <token>` exchanged from an API key, cached until expiry |
//! | `basic` | `Basic base64(username:password)` |
//! | `bearerToken` | `Bearer <token>` supplied by the caller |
//! | `noAuth` | nothing |

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use url::form_urlencoded;
use zeroize::Zeroizing;

use super::error::{WatsonError, WatsonResult};

/// IBM Cloud IAM token endpoint.
pub const IBM_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const IAM_TOKEN_PATH: &str = "/identity/token";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Refresh the token this long before the service would reject it.
const TOKEN_SAFETY_MARGIN_SECS: u64 = 300;

// =============================================================================
// Authenticator trait
// =============================================================================

/// Authentication scheme of an [`Authenticator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Iam,
    Basic,
    BearerToken,
    NoAuth,
}

impl AuthType {
    /// Parse the `<SERVICE>_AUTH_TYPE` value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "iam" => Some(Self::Iam),
            "basic" => Some(Self::Basic),
            "bearertoken" | "bearer_token" | "bearer-token" => Some(Self::BearerToken),
            "noauth" | "no_auth" | "none" => Some(Self::NoAuth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iam => "iam",
            Self::Basic => "basic",
            Self::BearerToken => "bearerToken",
            Self::NoAuth => "noAuth",
        }
    }
}

/// Adds credentials to outgoing requests.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    /// Scheme implemented by this authenticator.
    fn authentication_type(&self) -> AuthType;

    /// Check the configured credentials without any network I/O.
    fn validate(&self) -> WatsonResult<()>;

    /// Insert the `Authorization` header (if any) into `headers`.
    async fn authenticate(&self, headers: &mut HeaderMap) -> WatsonResult<()>;
}

/// Shared, dynamically dispatched authenticator.
pub type BoxedAuthenticator = Arc<dyn Authenticator>;

fn header_value(value: &str) -> WatsonResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| WatsonError::Authentication(format!("Invalid header value: {e}")))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Credentials pasted with surrounding braces or quotes are a common mistake.
fn has_bad_first_or_last_char(value: &str) -> bool {
    let bad = |c: char| matches!(c, '{' | '}' | '"');
    value.starts_with(bad) || value.ends_with(bad)
}

fn check_credential(name: &str, value: &str) -> WatsonResult<()> {
    if value.is_empty() {
        return Err(WatsonError::Configuration(format!("{name} is required")));
    }
    if has_bad_first_or_last_char(value) {
        return Err(WatsonError::Configuration(format!(
            "{name} must not start or end with a brace or quotation mark; remove them from the value"
        )));
    }
    Ok(())
}

// =============================================================================
// No authentication
// =============================================================================

/// Sends requests without credentials (for example behind a local proxy).
#[derive(Debug, Clone, Default)]
pub struct NoAuthAuthenticator;

#[async_trait]
impl Authenticator for NoAuthAuthenticator {
    fn authentication_type(&self) -> AuthType {
        AuthType::NoAuth
    }

    fn validate(&self) -> WatsonResult<()> {
        Ok(())
    }

    async fn authenticate(&self, _headers: &mut HeaderMap) -> WatsonResult<()> {
        Ok(())
    }
}

// =============================================================================
// Basic authentication
// =============================================================================

/// HTTP basic authentication with a username and password.
pub struct BasicAuthenticator {
    username: String,
    password: Zeroizing<String>,
}

impl BasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> WatsonResult<Self> {
        let auth = Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        };
        auth.validate()?;
        Ok(auth)
    }
}

impl std::fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn authentication_type(&self) -> AuthType {
        AuthType::Basic
    }

    fn validate(&self) -> WatsonResult<()> {
        check_credential("username", &self.username)?;
        check_credential("password", &self.password)
    }

    async fn authenticate(&self, headers: &mut HeaderMap) -> WatsonResult<()> {
        let encoded = Zeroizing::new(STANDARD.encode(format!(
            "{}:{}",
            self.username,
            self.password.as_str()
        )));
        headers.insert(AUTHORIZATION, header_value(&format!("Basic {}", *encoded))?);
        Ok(())
    }
}

// =============================================================================
// Bearer token
// =============================================================================

/// A caller-managed bearer token. The caller is responsible for refreshing it.
pub struct BearerTokenAuthenticator {
    token: Zeroizing<String>,
}

impl BearerTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> WatsonResult<Self> {
        let auth = Self {
            token: Zeroizing::new(token.into()),
        };
        auth.validate()?;
        Ok(auth)
    }
}

impl std::fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenAuthenticator")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    fn authentication_type(&self) -> AuthType {
        AuthType::BearerToken
    }

    fn validate(&self) -> WatsonResult<()> {
        if self.token.is_empty() {
            return Err(WatsonError::Configuration(
                "bearer token is required".to_string(),
            ));
        }
        Ok(())
    }

    async fn authenticate(&self, headers: &mut HeaderMap) -> WatsonResult<()> {
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.token.as_str()))?,
        );
        Ok(())
    }
}

// =============================================================================
// IAM
// =============================================================================

/// IAM access token with expiration tracking.
#[derive(Clone)]
struct IamToken {
    access_token: Zeroizing<String>,
    /// When the token should be considered expired (already includes the safety margin).
    expires_at: Instant,
}

impl IamToken {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// IAM token response from IBM Cloud.
#[derive(Deserialize)]
struct IamTokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: u64,
}

/// Exchanges an IBM Cloud API key for short-lived IAM bearer tokens.
///
/// Tokens are cached and shared between requests; a new token is fetched
/// once the cached one is within five minutes of expiring.
pub struct IamAuthenticator {
    apikey: Zeroizing<String>,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<Zeroizing<String>>,
    client: reqwest::Client,
    token: Arc<RwLock<Option<IamToken>>>,
}

impl IamAuthenticator {
    /// Create an authenticator for `apikey` against the public IAM endpoint.
    pub fn new(apikey: impl Into<String>) -> WatsonResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                WatsonError::Configuration(format!("Failed to create IAM HTTP client: {e}"))
            })?;

        let auth = Self {
            apikey: Zeroizing::new(apikey.into()),
            token_url: IBM_IAM_URL.to_string(),
            client_id: None,
            client_secret: None,
            client,
            token: Arc::new(RwLock::new(None)),
        };
        auth.validate()?;
        Ok(auth)
    }

    /// Use a different IAM server. Either the bare host
    /// (`https://iam.test.cloud.ibm.com`) or the full token endpoint is accepted.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let trimmed = url.trim_end_matches('/');
        self.token_url = if trimmed.ends_with(IAM_TOKEN_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{IAM_TOKEN_PATH}")
        };
        self
    }

    /// Authenticate the token request itself with a client id and secret.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(Zeroizing::new(client_secret.into()));
        self
    }

    /// The token endpoint in use.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Drop the cached token so the next request fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    /// Return a valid access token, fetching a new one if necessary.
    pub async fn access_token(&self) -> WatsonResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref()
                && !token.is_expired()
            {
                return Ok(token.access_token.to_string());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(token) = guard.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.to_string());
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.to_string();
        *guard = Some(token);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> WatsonResult<IamToken> {
        debug!(url = %self.token_url, "Fetching new IAM token");

        let encoded_apikey = Zeroizing::new(
            form_urlencoded::byte_serialize(self.apikey.as_bytes()).collect::<String>(),
        );

        let mut request = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(format!(
                "grant_type={}&apikey={}&response_type=cloud_iam",
                form_urlencoded::byte_serialize(IAM_GRANT_TYPE.as_bytes()).collect::<String>(),
                encoded_apikey.as_str()
            ));

        if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
            request = request.basic_auth(id, Some(secret.as_str()));
        }

        let response = request.send().await.map_err(|e| {
            WatsonError::Authentication(format!("Failed to request IAM token: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WatsonError::Authentication(format!(
                "IAM token request failed ({status}): {body}"
            )));
        }

        let token_response: IamTokenResponse = response.json().await.map_err(|e| {
            WatsonError::Authentication(format!("Failed to parse IAM token: {e}"))
        })?;

        // Default to 1 hour if expires_in is not provided
        let expires_in = if token_response.expires_in > 0 {
            token_response.expires_in
        } else {
            3600
        };
        let usable_secs = expires_in.saturating_sub(TOKEN_SAFETY_MARGIN_SECS).max(60);

        debug!(expires_in, "IAM token fetched");

        Ok(IamToken {
            access_token: Zeroizing::new(token_response.access_token),
            expires_at: Instant::now() + Duration::from_secs(usable_secs),
        })
    }
}

impl std::fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("apikey", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    fn authentication_type(&self) -> AuthType {
        AuthType::Iam
    }

    fn validate(&self) -> WatsonResult<()> {
        check_credential("apikey", &self.apikey)?;
        if self.client_id.is_some() != self.client_secret.is_some() {
            return Err(WatsonError::Configuration(
                "client_id and client_secret must be set together".to_string(),
            ));
        }
        Ok(())
    }

    async fn authenticate(&self, headers: &mut HeaderMap) -> WatsonResult<()> {
        let token = Zeroizing::new(self.access_token().await?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", token.as_str()))?,
        );
        Ok(())
    }
}
