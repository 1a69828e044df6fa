use std::sync::Arc;

use archiver_logging::archiver_debug;
use serde_json::{json, Value};

use crate::document::{DocumentStore, DocumentWrite};
use crate::http::{join_base, ClientSettings};
use crate::{CloudError, TokenSource};

pub const DEFAULT_FIRESTORE_BASE: &str = "https://firestore.googleapis.com";

/// Firestore REST client committing batched document creations.
pub struct FirestoreClient {
    base_url: String,
    project_id: String,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
}

impl FirestoreClient {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        settings: &ClientSettings,
    ) -> Result<Self, CloudError> {
        let client = settings.build_client().map_err(CloudError::from_reqwest)?;
        Ok(Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            tokens,
            client,
        })
    }

    fn database(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn commit_body(&self, writes: &[DocumentWrite]) -> Value {
        let documents = format!("{}/documents", self.database());
        let writes: Vec<Value> = writes
            .iter()
            .map(|write| {
                json!({
                    "update": {
                        "name": format!("{documents}/{}", write.path),
                        "fields": write.fields,
                    },
                    "currentDocument": { "exists": false },
                })
            })
            .collect();
        json!({ "writes": writes })
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreClient {
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), CloudError> {
        let url = join_base(
            &self.base_url,
            &format!("v1/{}/documents:commit", self.database()),
        )
        .map_err(|err| CloudError::Network(format!("invalid firestore url: {err}")))?;
        let body = self.commit_body(&writes);
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(CloudError::from_reqwest)?;
        CloudError::check_status(response).await?;

        archiver_debug!("committed {} document write(s)", writes.len());
        Ok(())
    }
}
