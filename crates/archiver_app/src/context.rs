use std::sync::Arc;

use anyhow::{Context as _, Result};
use archiver_engine::{
    Archiver, BucketSink, ChatApi, DocumentStoreSink, FileSink, FirestoreClient,
    GcsClient, GoogleCredentials, RefreshTokenSource, RunOptions, RunReport, Sink, SlackWebClient,
    TokenSource,
};
use archiver_logging::archiver_info;

use crate::config::{AppConfig, Secrets, SinkKind};

/// Everything a run needs, built once at startup so missing or invalid
/// credentials fail before any work starts.
pub struct AppContext {
    config: AppConfig,
    api: Arc<dyn ChatApi>,
    google: Option<GoogleAccess>,
}

struct GoogleAccess {
    project_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl AppContext {
    pub fn new(config: AppConfig, secrets: Secrets) -> Result<Self> {
        let settings = config.client_settings();
        let api = SlackWebClient::new(secrets.slack_token, config.slack.api_base.clone(), &settings)
            .context("building Slack client")?;

        let google = match (config.sink, secrets.project_id, secrets.credentials_path) {
            (SinkKind::File, _, _) => None,
            (_, Some(project_id), Some(credentials_path)) => {
                let credentials = GoogleCredentials::from_file(&credentials_path)?;
                let tokens = RefreshTokenSource::new(credentials, &settings)?;
                Some(GoogleAccess {
                    project_id,
                    tokens: Arc::new(tokens),
                })
            }
            _ => anyhow::bail!("Google project id and credentials are required for this sink"),
        };

        Ok(Self {
            config,
            api: Arc::new(api),
            google,
        })
    }

    /// Assembles a context from already-built clients.
    #[cfg(test)]
    pub fn from_parts(
        config: AppConfig,
        api: Arc<dyn ChatApi>,
        google: Option<(String, Arc<dyn TokenSource>)>,
    ) -> Self {
        Self {
            config,
            api,
            google: google.map(|(project_id, tokens)| GoogleAccess { project_id, tokens }),
        }
    }

    /// A fresh sink for one run.
    pub fn build_sink(&self) -> Result<Box<dyn Sink>> {
        let settings = self.config.client_settings();
        let sink: Box<dyn Sink> = match self.config.sink {
            SinkKind::File => Box::new(FileSink::new(self.config.file.output_path.clone())),
            SinkKind::Bucket => {
                let google = self.google()?;
                let store = GcsClient::new(
                    self.config.bucket.api_base.clone(),
                    google.tokens.clone(),
                    &settings,
                )?;
                let bucket = &self.config.bucket;
                match &bucket.staging_path {
                    Some(path) => Box::new(BucketSink::new(
                        path.clone(),
                        Arc::new(store),
                        bucket.name.clone(),
                        bucket.destination.clone(),
                    )),
                    None => Box::new(BucketSink::staged_in_temp_dir(
                        Arc::new(store),
                        bucket.name.clone(),
                        bucket.destination.clone(),
                    )),
                }
            }
            SinkKind::Firestore => {
                let google = self.google()?;
                let store = FirestoreClient::new(
                    self.config.firestore.api_base.clone(),
                    google.project_id.clone(),
                    google.tokens.clone(),
                    &settings,
                )?;
                Box::new(
                    DocumentStoreSink::new(Arc::new(store), self.config.firestore.company.clone())
                        .with_batch_size(self.config.firestore.batch_size),
                )
            }
        };
        Ok(sink)
    }

    fn google(&self) -> Result<&GoogleAccess> {
        self.google
            .as_ref()
            .context("Google credentials were not loaded")
    }

    /// Runs one full archive into a freshly built sink.
    pub async fn archive(&self, retain_snapshot: bool) -> Result<RunReport> {
        let mut sink = self.build_sink()?;
        let options = RunOptions {
            shape: self.config.message_shape(),
            failure_policy: self.config.failure_policy(),
            retain_snapshot,
        };
        archiver_info!("Starting archive run (sink: {:?})", self.config.sink);
        let report = Archiver::new(self.api.clone(), options)
            .run(sink.as_mut())
            .await
            .context("archive run failed")?;
        Ok(report)
    }
}
