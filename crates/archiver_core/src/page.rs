use std::fmt;

/// Opaque server-issued continuation token.
///
/// Never empty: an absent or empty `next_cursor` means there are no more
/// pages and is represented as `None` on [`Page::next_cursor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    /// Interprets a raw `next_cursor` value from a response.
    pub fn from_next(raw: Option<String>) -> Option<Self> {
        raw.filter(|token| !token.is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<PageCursor>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Concatenates pages in arrival order.
///
/// No reordering, deduplication or gap detection is applied. Pushing a page
/// after the last one is a logic error and is ignored.
#[derive(Debug)]
pub struct PageAccumulator<T> {
    items: Vec<T>,
    pages: usize,
    done: bool,
}

impl<T> Default for PageAccumulator<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            done: false,
        }
    }
}

impl<T> PageAccumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page and returns the cursor for the next request, if any.
    pub fn push(&mut self, page: Page<T>) -> Option<PageCursor> {
        if self.done {
            return None;
        }
        self.pages += 1;
        self.items.extend(page.items);
        if page.next_cursor.is_none() {
            self.done = true;
        }
        page.next_cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
