use std::path::Path;
use std::sync::Arc;

use archiver_logging::archiver_info;

use crate::http::{join_base, ClientSettings};
use crate::{CloudError, TokenSource};

pub const DEFAULT_GCS_BASE: &str = "https://storage.googleapis.com";

/// Object storage capable of replacing one object with a local file.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `local_path` to `bucket` under `destination`, overwriting any
    /// object already stored at that key.
    async fn upload(&self, local_path: &Path, bucket: &str, destination: &str)
        -> Result<(), CloudError>;
}

/// Google Cloud Storage JSON API client using simple media uploads.
pub struct GcsClient {
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
}

impl GcsClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        settings: &ClientSettings,
    ) -> Result<Self, CloudError> {
        let client = settings.build_client().map_err(CloudError::from_reqwest)?;
        Ok(Self {
            base_url: base_url.into(),
            tokens,
            client,
        })
    }

    fn upload_url(&self, bucket: &str, destination: &str) -> Result<url::Url, CloudError> {
        let mut url = join_base(&self.base_url, "upload/storage/v1/b")
            .map_err(|err| CloudError::Network(format!("invalid storage url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| CloudError::Network("storage url cannot be a base".to_string()))?
            .push(bucket)
            .push("o");
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", destination);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsClient {
    async fn upload(
        &self,
        local_path: &Path,
        bucket: &str,
        destination: &str,
    ) -> Result<(), CloudError> {
        let body = tokio::fs::read(local_path).await?;
        let size = body.len();
        let url = self.upload_url(bucket, destination)?;
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(CloudError::from_reqwest)?;
        CloudError::check_status(response).await?;

        archiver_info!("Uploaded {} bytes to gs://{}/{}", size, bucket, destination);
        Ok(())
    }
}
