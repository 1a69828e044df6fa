use std::future::Future;

use archiver_core::{Page, PageAccumulator, PageCursor};
use archiver_logging::archiver_trace;
use futures_util::stream::{self, Stream};
use futures_util::TryStreamExt;

use crate::ApiError;

/// Items requested per page from every list endpoint.
pub const PAGE_SIZE: u32 = 1000;

enum Position {
    Start,
    After(PageCursor),
    Exhausted,
}

/// Lazily walks a cursor-paginated resource.
///
/// The first request carries no cursor; each following request carries the
/// cursor from the previous page. The stream ends after the first page whose
/// cursor is absent, or right after yielding the first error. Building a new
/// stream restarts from the first page.
pub fn page_stream<'a, T, F, Fut>(
    fetch_page: F,
) -> impl Stream<Item = Result<Page<T>, ApiError>> + 'a
where
    T: 'a,
    F: FnMut(Option<PageCursor>) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>, ApiError>> + 'a,
{
    stream::try_unfold(
        (Position::Start, fetch_page),
        |(position, mut fetch_page)| async move {
            let cursor = match position {
                Position::Start => None,
                Position::After(cursor) => Some(cursor),
                Position::Exhausted => return Ok::<_, ApiError>(None),
            };
            let page = fetch_page(cursor).await?;
            let next = match &page.next_cursor {
                Some(cursor) => Position::After(cursor.clone()),
                None => Position::Exhausted,
            };
            Ok::<_, ApiError>(Some((page, (next, fetch_page))))
        },
    )
}

/// Drains a page stream into one list, failing as a whole on the first error.
pub async fn collect_pages<T, S>(pages: S) -> Result<Vec<T>, ApiError>
where
    S: Stream<Item = Result<Page<T>, ApiError>>,
{
    let mut pages = std::pin::pin!(pages);
    let mut acc = PageAccumulator::new();
    while let Some(page) = pages.try_next().await? {
        acc.push(page);
    }
    archiver_trace!("collected {} page(s)", acc.page_count());
    Ok(acc.into_items())
}
