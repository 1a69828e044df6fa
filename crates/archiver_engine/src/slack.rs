use std::fmt;

use archiver_core::{Channel, Message, Page, PageCursor};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::http::{join_base, ClientSettings};
use crate::ApiError;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// The two list endpoints an archive run consumes.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_conversations(
        &self,
        cursor: Option<&PageCursor>,
        limit: u32,
    ) -> Result<Page<Channel>, ApiError>;

    async fn list_history(
        &self,
        channel_id: &str,
        cursor: Option<&PageCursor>,
        limit: u32,
    ) -> Result<Page<Message>, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl ListResponse {
    fn next_cursor(&mut self) -> Option<PageCursor> {
        PageCursor::from_next(
            self.response_metadata
                .as_mut()
                .and_then(|meta| meta.next_cursor.take()),
        )
    }
}

/// Slack Web API client authenticated with a bearer token.
pub struct SlackWebClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl fmt::Debug for SlackWebClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackWebClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl SlackWebClient {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        settings: &ClientSettings,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        join_base(&base_url, "api.test").map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        let client = settings.build_client().map_err(ApiError::from_reqwest)?;
        Ok(Self {
            base_url,
            token: token.into(),
            client,
        })
    }

    async fn call(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<ListResponse, ApiError> {
        let mut url = join_base(&self.base_url, method)
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        url.query_pairs_mut().extend_pairs(params);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            return Err(ApiError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: ListResponse = response.json().await.map_err(ApiError::from_reqwest)?;
        if !body.ok {
            return Err(ApiError::Platform(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ChatApi for SlackWebClient {
    async fn list_conversations(
        &self,
        cursor: Option<&PageCursor>,
        limit: u32,
    ) -> Result<Page<Channel>, ApiError> {
        let limit = limit.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.as_str()));
        }
        let mut body = self.call("conversations.list", &params).await?;
        let next_cursor = body.next_cursor();
        Ok(Page::new(body.channels, next_cursor))
    }

    async fn list_history(
        &self,
        channel_id: &str,
        cursor: Option<&PageCursor>,
        limit: u32,
    ) -> Result<Page<Message>, ApiError> {
        let limit = limit.to_string();
        let mut params = vec![("channel", channel_id), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.as_str()));
        }
        let mut body = self.call("conversations.history", &params).await?;
        let next_cursor = body.next_cursor();
        Ok(Page::new(body.messages, next_cursor))
    }
}
