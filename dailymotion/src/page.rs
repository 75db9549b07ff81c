//! Paginated list responses and the stream that walks them.

use crate::codec::{self, JsonObject};
use crate::fields::Field;
use crate::metadata::Metadata;
use serde::Deserialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of a list endpoint.
///
/// See: <https://developers.dailymotion.com/api/#response-types>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// The 1-based number of this page.
    pub page: u32,
    /// Maximum number of items per page.
    pub limit: u32,
    /// Total number of items, when the API computes it.
    pub total: Option<u64>,
    pub has_more: bool,
    /// Whether the list contains explicit content.
    pub explicit: bool,
    pub list: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    list: Vec<JsonObject>,
}

impl Page {
    /// Parses a list response, reading each item with exactly the `requested` fields.
    ///
    /// Malformed input yields an empty page with `has_more` unset, which ends any pagination.
    pub fn from_json_str(text: &str, requested: &[Field]) -> Page {
        let raw: RawPage = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "could not parse list response, ignoring");
                return Page::default();
            }
        };

        Page {
            page: raw.page,
            limit: raw.limit,
            total: raw.total,
            has_more: raw.has_more,
            explicit: raw.explicit,
            list: raw
                .list
                .iter()
                .map(|item| codec::from_json(item, requested))
                .collect(),
        }
    }
}

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = eyre::Result<(F, (VecDeque<T>, bool))>> + 'a + Send>>;

/// A stream that walks every page of a list endpoint, yielding items one by one.
///
/// The fetcher is called with page numbers starting at 1 and returns the page's items along with
/// whether another page follows.
pub struct PagedStream<'a, T, F> {
    current_items: VecDeque<T>,
    pending_request: Option<OneFuturePage<'a, F, T>>,
    next_page: u32,
    is_done: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(u32) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<(VecDeque<T>, bool)>> + Send + 'a,
    {
        Self::starting_at(1, fetcher)
    }

    /// Like [`PagedStream::new`], but starts from page `first`.
    pub fn starting_at<Fut>(first: u32, fetcher: F) -> Self
    where
        F: Fn(u32) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<(VecDeque<T>, bool)>> + Send + 'a,
    {
        let first_page = async move {
            let results = fetcher(first).await?;
            Ok((fetcher, results))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            current_items: VecDeque::new(),
            next_page: first.saturating_add(1),
            is_done: false,
        }
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(u32) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = eyre::Result<(VecDeque<T>, bool)>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if self.is_done {
                return Poll::Ready(None);
            }

            let Some(pending) = self.pending_request.as_mut() else {
                self.is_done = true;
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Ready(Ok((fetcher, (items, has_more)))) => {
                    self.current_items.extend(items);

                    if has_more {
                        let page = self.next_page;
                        self.next_page = page.saturating_add(1);
                        // set up the next fetch, but don't poll it until the buffer drains
                        self.pending_request = Some(Box::pin(async move {
                            let results = fetcher(page).await?;
                            Ok((fetcher, results))
                        }));
                    } else {
                        self.is_done = true;
                        self.pending_request = None;
                    }
                }
                Poll::Ready(Err(e)) => {
                    self.pending_request = None;
                    self.is_done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
