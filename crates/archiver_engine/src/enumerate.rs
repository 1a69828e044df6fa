use archiver_core::{Channel, Page, PageCursor};
use archiver_logging::archiver_debug;
use futures_util::Stream;

use crate::pagination::{collect_pages, page_stream, PAGE_SIZE};
use crate::{ApiError, ChatApi};

/// Lists every channel of the workspace by following the list cursor.
pub struct ChannelEnumerator<'a> {
    api: &'a dyn ChatApi,
}

impl<'a> ChannelEnumerator<'a> {
    pub fn new(api: &'a dyn ChatApi) -> Self {
        Self { api }
    }

    /// Channel list pages in the order the API serves them.
    pub fn pages(&self) -> impl Stream<Item = Result<Page<Channel>, ApiError>> + 'a {
        let api = self.api;
        page_stream(move |cursor: Option<PageCursor>| async move {
            api.list_conversations(cursor.as_ref(), PAGE_SIZE).await
        })
    }

    /// All channels, in first-seen order. Duplicate ids across pages are kept.
    pub async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        let channels = collect_pages(self.pages()).await?;
        archiver_debug!("enumerated {} channel(s)", channels.len());
        Ok(channels)
    }
}
