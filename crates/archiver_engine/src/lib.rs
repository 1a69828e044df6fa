//! Archiver engine: platform API client, pagination, sinks and run orchestration.
mod credentials;
mod document;
mod enumerate;
mod firestore;
mod gcs;
mod history;
mod http;
mod orchestrator;
mod pagination;
mod persist;
mod sink;
mod slack;
mod types;

pub use credentials::{GoogleCredentials, RefreshTokenSource, StaticToken, TokenSource};
pub use document::{encode_fields, new_document_id, DocumentStore, DocumentWrite, MAX_BATCH_WRITES};
pub use enumerate::ChannelEnumerator;
pub use firestore::{FirestoreClient, DEFAULT_FIRESTORE_BASE};
pub use gcs::{GcsClient, ObjectStore, DEFAULT_GCS_BASE};
pub use history::{HistoryFetcher, MessageShape};
pub use http::ClientSettings;
pub use orchestrator::{Archiver, FetchFailurePolicy, RunOptions, RunReport};
pub use pagination::{collect_pages, page_stream, PAGE_SIZE};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use sink::{BucketSink, DocumentStoreSink, FileSink, Sink, SNAPSHOT_FILENAME};
pub use slack::{ChatApi, SlackWebClient, DEFAULT_SLACK_API_BASE};
pub use types::{ApiError, ArchiveError, CloudError, SinkError};
