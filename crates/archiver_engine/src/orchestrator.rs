use std::sync::Arc;

use archiver_core::{Channel, WorkspaceSnapshot};
use archiver_logging::{archiver_error, archiver_info, archiver_warn};

use crate::{ApiError, ArchiveError, ChannelEnumerator, ChatApi, HistoryFetcher, MessageShape, Sink};

/// What a run does when fetching one channel's history fails.
///
/// A failed channel listing is always archived as an empty workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Log it and carry on as if the resource were empty.
    TreatAsEmpty,
    /// Stop the run and return the failure.
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub shape: MessageShape,
    /// `None` defers to the sink's default.
    pub failure_policy: Option<FetchFailurePolicy>,
    /// Keep every channel's messages in [`RunReport::snapshot`].
    pub retain_snapshot: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub channels: usize,
    pub messages: usize,
    /// The channel list could not be fetched and was treated as empty.
    pub channel_list_failed: bool,
    /// Names of channels whose history fetch failed and was treated as empty.
    pub failed_channels: Vec<String>,
    pub snapshot: Option<WorkspaceSnapshot>,
}

/// Drives one sequential archive run: enumerate channels once, then fetch
/// and persist each channel's history in list order.
pub struct Archiver {
    api: Arc<dyn ChatApi>,
    options: RunOptions,
}

impl Archiver {
    pub fn new(api: Arc<dyn ChatApi>, options: RunOptions) -> Self {
        Self { api, options }
    }

    pub async fn run(&self, sink: &mut dyn Sink) -> Result<RunReport, ArchiveError> {
        let policy = self
            .options
            .failure_policy
            .unwrap_or_else(|| sink.default_failure_policy());
        let mut report = RunReport {
            snapshot: self.options.retain_snapshot.then(WorkspaceSnapshot::new),
            ..RunReport::default()
        };

        let channels = match ChannelEnumerator::new(self.api.as_ref()).list_channels().await {
            Ok(channels) => channels,
            Err(err) => {
                archiver_error!("Error fetching channel list: {}", err);
                report.channel_list_failed = true;
                Vec::new()
            }
        };
        archiver_info!("Found {} channel(s)", channels.len());

        let fetcher = HistoryFetcher::new(self.api.as_ref(), self.options.shape);
        for Channel { id, name } in &channels {
            archiver_info!("Fetching messages from channel: {} ({})", name, id);
            let messages = match fetcher.fetch_history(id).await {
                Ok(messages) => messages,
                Err(err) => {
                    archiver_error!("Error fetching messages from channel {}: {}", id, err);
                    check_policy(policy, || history_error(name, err))?;
                    report.failed_channels.push(name.clone());
                    Vec::new()
                }
            };

            sink.persist(name, &messages).await?;
            archiver_info!("Fetched {} messages from channel: {}", messages.len(), name);

            report.channels += 1;
            report.messages += messages.len();
            if let Some(snapshot) = report.snapshot.as_mut() {
                snapshot.insert(name.as_str(), messages);
            }
        }

        sink.finish().await?;
        if !report.failed_channels.is_empty() {
            archiver_warn!(
                "{} channel(s) archived as empty after fetch failures: {}",
                report.failed_channels.len(),
                report.failed_channels.join(", ")
            );
        }
        Ok(report)
    }
}

fn check_policy(
    policy: FetchFailurePolicy,
    error: impl FnOnce() -> ArchiveError,
) -> Result<(), ArchiveError> {
    match policy {
        FetchFailurePolicy::TreatAsEmpty => Ok(()),
        FetchFailurePolicy::Abort => Err(error()),
    }
}

fn history_error(channel: &str, source: ApiError) -> ArchiveError {
    ArchiveError::History {
        channel: channel.to_string(),
        source,
    }
}
