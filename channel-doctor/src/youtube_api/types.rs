//! Shared types and pagination infrastructure for the YouTube API client.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of list results: the items plus the token for the next page, if any.
pub type Page<T> = (VecDeque<T>, Option<String>);

type PendingPage<'a, F, T> = Pin<Box<dyn Future<Output = eyre::Result<(F, Page<T>)>> + 'a + Send>>;

enum PageState<'a, F, T> {
    /// A page request is in flight. The fetcher travels with it and comes back on completion.
    Fetching(PendingPage<'a, F, T>),
    /// The last page has been received (or a request failed).
    Exhausted,
}

/// A stream over a paginated YouTube API list endpoint.
///
/// Items are yielded one at a time. The next page is only requested once the current one has
/// been drained *and* the consumer polls for more, so `stream.take(n)` never fetches pages it
/// does not need.
///
/// The stream ends when a page carries no `nextPageToken`. A page can come back empty and still
/// point at a next one.
pub struct PagedStream<'a, T, F> {
    buffered: VecDeque<T>,
    state: PageState<'a, F, T>,
    pages_fetched: usize,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Creates a stream whose first poll requests the first page (`page_token = None`).
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    {
        Self {
            buffered: VecDeque::new(),
            state: PageState::Fetching(Self::request(fetcher, None)),
            pages_fetched: 0,
        }
    }

    /// Number of pages received so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn request<Fut>(fetcher: F, page_token: Option<String>) -> PendingPage<'a, F, T>
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    {
        Box::pin(async move {
            let page = fetcher(page_token).await?;
            Ok((fetcher, page))
        })
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            let PageState::Fetching(pending) = &mut self.state else {
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    self.state = PageState::Exhausted;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Ok((fetcher, (items, next_token)))) => {
                    self.pages_fetched += 1;
                    self.buffered.extend(items);
                    self.state = match next_token {
                        Some(token) => PageState::Fetching(Self::request(fetcher, Some(token))),
                        None => PageState::Exhausted,
                    };
                }
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults", default)]
    pub total_results: u32,
}

/// Reads one of the API's string-encoded counters.
///
/// The Data API returns counts as decimal strings and omits them when the owner hides them
/// (subscribers) or disables them (likes, comments). Absent or malformed values count as zero.
pub fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
