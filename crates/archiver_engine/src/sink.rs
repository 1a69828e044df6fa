//! Destinations for fetched channel histories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archiver_core::{Message, WorkspaceSnapshot};
use archiver_logging::{archiver_debug, archiver_info};

use crate::document::{encode_fields, new_document_id, DocumentStore, DocumentWrite};
use crate::{AtomicFileWriter, FetchFailurePolicy, ObjectStore, SinkError, MAX_BATCH_WRITES};

/// File name used for the serialized workspace snapshot.
pub const SNAPSHOT_FILENAME: &str = "allMessages.json";

/// Receives each channel's messages as soon as its history is fetched.
#[async_trait::async_trait]
pub trait Sink: Send {
    async fn persist(&mut self, channel_name: &str, messages: &[Message]) -> Result<(), SinkError>;

    /// Called once after the last channel.
    async fn finish(&mut self) -> Result<(), SinkError>;

    /// How a run feeding this sink treats a failed list or history fetch
    /// unless told otherwise.
    fn default_failure_policy(&self) -> FetchFailurePolicy {
        FetchFailurePolicy::TreatAsEmpty
    }
}

/// Accumulates the whole workspace and writes it as one JSON document.
#[derive(Debug)]
pub struct FileSink {
    writer: AtomicFileWriter,
    snapshot: WorkspaceSnapshot,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(path),
            snapshot: WorkspaceSnapshot::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.target()
    }

    pub fn snapshot(&self) -> &WorkspaceSnapshot {
        &self.snapshot
    }
}

#[async_trait::async_trait]
impl Sink for FileSink {
    async fn persist(&mut self, channel_name: &str, messages: &[Message]) -> Result<(), SinkError> {
        self.snapshot.insert(channel_name, messages.to_vec());
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let json = self.snapshot.to_pretty_json()?;
        let path = self.writer.write(json.as_bytes())?;
        archiver_info!(
            "Messages have been written to {} ({} channel(s), {} message(s))",
            path.display(),
            self.snapshot.len(),
            self.snapshot.message_count()
        );
        Ok(())
    }
}

/// Writes the snapshot file locally, then uploads it to a bucket under a
/// fixed key, replacing the previous object.
pub struct BucketSink {
    local: FileSink,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    destination: String,
}

impl BucketSink {
    pub fn new(
        staging_path: impl Into<PathBuf>,
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            local: FileSink::new(staging_path),
            store,
            bucket: bucket.into(),
            destination: destination.into(),
        }
    }

    /// Stages in the system temp directory under [`SNAPSHOT_FILENAME`].
    pub fn staged_in_temp_dir(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self::new(
            std::env::temp_dir().join(SNAPSHOT_FILENAME),
            store,
            bucket,
            destination,
        )
    }
}

#[async_trait::async_trait]
impl Sink for BucketSink {
    async fn persist(&mut self, channel_name: &str, messages: &[Message]) -> Result<(), SinkError> {
        self.local.persist(channel_name, messages).await
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.local.finish().await?;
        self.store
            .upload(self.local.path(), &self.bucket, &self.destination)
            .await
            .map_err(|source| SinkError::Upload {
                bucket: self.bucket.clone(),
                destination: self.destination.clone(),
                source,
            })?;
        archiver_info!(
            "Messages have been written to {} in bucket {}",
            self.destination,
            self.bucket
        );
        Ok(())
    }
}

/// Stores one new document per message at
/// `{company}/{channel}/messages/{auto id}`, committing per channel in batches
/// of at most [`MAX_BATCH_WRITES`].
pub struct DocumentStoreSink {
    store: Arc<dyn DocumentStore>,
    company: String,
    batch_size: usize,
}

impl DocumentStoreSink {
    pub fn new(store: Arc<dyn DocumentStore>, company: impl Into<String>) -> Self {
        Self {
            store,
            company: company.into(),
            batch_size: MAX_BATCH_WRITES,
        }
    }

    /// Smaller batches than the store maximum. Clamped to `1..=MAX_BATCH_WRITES`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_WRITES);
        self
    }

    fn write_for(&self, channel_name: &str, message: &Message) -> DocumentWrite {
        DocumentWrite {
            path: format!(
                "{}/{}/messages/{}",
                self.company,
                channel_name,
                new_document_id()
            ),
            fields: encode_fields(message),
        }
    }
}

#[async_trait::async_trait]
impl Sink for DocumentStoreSink {
    async fn persist(&mut self, channel_name: &str, messages: &[Message]) -> Result<(), SinkError> {
        for (index, chunk) in messages.chunks(self.batch_size).enumerate() {
            let writes = chunk
                .iter()
                .map(|message| self.write_for(channel_name, message))
                .collect();
            self.store
                .commit(writes)
                .await
                .map_err(|source| SinkError::Commit {
                    channel: channel_name.to_string(),
                    source,
                })?;
            archiver_debug!(
                "committed batch {} ({} message(s)) for channel {}",
                index + 1,
                chunk.len(),
                channel_name
            );
        }
        archiver_info!(
            "Stored {} message(s) from channel {} under {}",
            messages.len(),
            channel_name,
            self.company
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn default_failure_policy(&self) -> FetchFailurePolicy {
        FetchFailurePolicy::Abort
    }
}
