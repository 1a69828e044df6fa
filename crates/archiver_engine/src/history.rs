use archiver_core::{Message, NormalizedMessage, Page, PageCursor};
use archiver_logging::archiver_debug;
use futures_util::Stream;

use crate::pagination::{collect_pages, page_stream, PAGE_SIZE};
use crate::{ApiError, ChatApi};

/// How each fetched message record is shaped before it leaves the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageShape {
    /// Platform record passed through unchanged.
    #[default]
    Raw,
    /// Narrowed to `user`, `text`, `ts` and `type`.
    Normalized,
}

impl MessageShape {
    pub fn apply(self, message: Message) -> Message {
        match self {
            MessageShape::Raw => message,
            MessageShape::Normalized => NormalizedMessage::from_raw(&message).into_value(),
        }
    }
}

/// Fetches the full message history of one channel.
pub struct HistoryFetcher<'a> {
    api: &'a dyn ChatApi,
    shape: MessageShape,
}

impl<'a> HistoryFetcher<'a> {
    pub fn new(api: &'a dyn ChatApi, shape: MessageShape) -> Self {
        Self { api, shape }
    }

    /// History pages in the order the API serves them, already shaped.
    pub fn history_pages<'s>(
        &'s self,
        channel_id: &'s str,
    ) -> impl Stream<Item = Result<Page<Message>, ApiError>> + 's {
        let api: &'s dyn ChatApi = self.api;
        let shape = self.shape;
        page_stream(move |cursor: Option<PageCursor>| async move {
            let page = api.list_history(channel_id, cursor.as_ref(), PAGE_SIZE).await?;
            Ok::<_, ApiError>(page.map_items(|message| shape.apply(message)))
        })
    }

    /// Every message of the channel in API order, or the first page failure.
    ///
    /// A failure on any page discards the pages already fetched.
    pub async fn fetch_history(&self, channel_id: &str) -> Result<Vec<Message>, ApiError> {
        let messages = collect_pages(self.history_pages(channel_id)).await?;
        archiver_debug!(
            "fetched {} message(s) from channel {}",
            messages.len(),
            channel_id
        );
        Ok(messages)
    }
}
