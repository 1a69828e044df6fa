//! Google access tokens for the storage sinks.
//!
//! Only `authorized_user` credential files (the format written by
//! `gcloud auth application-default login`) are supported: their refresh token
//! is exchanged at the token endpoint for a short-lived bearer token.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use archiver_logging::archiver_debug;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::http::ClientSettings;
use crate::CloudError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Tokens are refreshed this long before the server-declared expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of a bearer token for Google APIs.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, CloudError>;
}

/// A fixed token, for tests and for tokens minted outside the process.
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, CloudError> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Parsed `authorized_user` credentials.
#[derive(Clone)]
pub struct GoogleCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
}

impl fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl GoogleCredentials {
    pub fn from_file(path: &Path) -> Result<Self, CloudError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            CloudError::Credentials(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, CloudError> {
        let file: CredentialsFile = serde_json::from_str(text)
            .map_err(|err| CloudError::Credentials(format!("invalid credentials file: {err}")))?;
        if file.kind != "authorized_user" {
            return Err(CloudError::Credentials(format!(
                "unsupported credentials type {:?}; expected \"authorized_user\"",
                file.kind
            )));
        }
        let required = |value: Option<String>, name: &str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CloudError::Credentials(format!("credentials file lacks {name}")))
        };
        Ok(Self {
            client_id: required(file.client_id, "client_id")?,
            client_secret: required(file.client_secret, "client_secret")?,
            refresh_token: required(file.refresh_token, "refresh_token")?,
            token_uri: file
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Points the refresh exchange at another endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Option<Instant>,
}

/// Exchanges a refresh token for access tokens, caching each until shortly
/// before it expires.
pub struct RefreshTokenSource {
    credentials: GoogleCredentials,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenSource {
    pub fn new(credentials: GoogleCredentials, settings: &ClientSettings) -> Result<Self, CloudError> {
        let client = settings.build_client().map_err(CloudError::from_reqwest)?;
        Ok(Self {
            credentials,
            client,
            cached: Mutex::new(None),
        })
    }

    async fn exchange(&self) -> Result<CachedToken, CloudError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", &self.credentials.client_secret)
            .append_pair("refresh_token", &self.credentials.refresh_token)
            .finish();

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(CloudError::from_reqwest)?;
        let response = CloudError::check_status(response).await?;
        let token: TokenResponse = response.json().await.map_err(CloudError::from_reqwest)?;

        archiver_debug!("obtained Google access token (expires_in={:?})", token.expires_in);
        let refresh_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN));
        Ok(CachedToken {
            value: token.access_token,
            refresh_at,
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for RefreshTokenSource {
    async fn access_token(&self) -> Result<String, CloudError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            let fresh = token.refresh_at.is_none_or(|at| Instant::now() < at);
            if fresh {
                return Ok(token.value.clone());
            }
        }
        let token = self.exchange().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
