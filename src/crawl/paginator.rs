//! Generic walk over a page-numbered JSON API.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FetchError;

/// One page of the `data`/`meta` envelope the forum API serves.
#[derive(Debug, Deserialize)]
pub struct PageEnvelope<R> {
    #[serde(default)]
    pub data: Vec<R>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageMeta {
    pub total: Option<u64>,
}

/// A page-numbered endpoint the paginator can walk.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Record: DeserializeOwned + Send;

    /// Fetch one page. Page numbers start at 1.
    async fn fetch_page(&self, page: u32) -> Result<PageEnvelope<Self::Record>, FetchError>;
}

/// Records from one successfully fetched page.
#[derive(Debug)]
pub struct PageBatch<R> {
    pub page: u32,
    pub records: Vec<R>,
    /// Total record count the server reported before the walk began.
    pub total: Option<u64>,
}

/// Walk `source` from page 1 to exhaustion, yielding one batch per page.
///
/// One preliminary request reads the reported total for progress display;
/// losing it only costs the denominator, so that failure is non-fatal. The
/// walk ends on the first empty page, on any fetch failure (everything
/// already yielded stands; a partial crawl is a valid outcome), on
/// cancellation, or once the collected count reaches a learned total.
///
/// `pacing` is slept between successive page fetches; the forum throttles
/// and bans clients that skip it.
pub fn paginate<S>(
    source: &S,
    pacing: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = PageBatch<S::Record>> + '_
where
    S: PageSource,
{
    stream! {
        // A cancelled walk skips even the preliminary probe.
        let total = if cancel.is_cancelled() {
            None
        } else {
            match source.fetch_page(1).await {
                Ok(envelope) => envelope.meta.total,
                Err(err) => {
                    debug!(error = %err, "could not read total count ahead of crawl");
                    None
                }
            }
        };

        let mut page = 1u32;
        let mut collected = 0u64;
        loop {
            if cancel.is_cancelled() {
                debug!(page, "crawl cancelled, keeping partial results");
                break;
            }

            let envelope = match source.fetch_page(page).await {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(page, error = %err, "page fetch failed, keeping partial results");
                    break;
                }
            };
            if envelope.data.is_empty() {
                break;
            }

            collected += envelope.data.len() as u64;
            yield PageBatch {
                page,
                records: envelope.data,
                total,
            };

            if total.is_some_and(|t| collected >= t) {
                break;
            }
            page += 1;
            tokio::time::sleep(pacing).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::StreamExt;
    use reqwest::StatusCode;

    use super::*;

    /// Scripted source: `pages[0]` is page 1, a page past the script is empty.
    struct Scripted {
        pages: Vec<Vec<u32>>,
        total: Option<u64>,
        fail_at: Option<u32>,
        calls: Mutex<Vec<u32>>,
    }

    impl Scripted {
        fn new(pages: Vec<Vec<u32>>, total: Option<u64>) -> Self {
            Self {
                pages,
                total,
                fail_at: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for Scripted {
        type Record = u32;

        async fn fetch_page(&self, page: u32) -> Result<PageEnvelope<u32>, FetchError> {
            self.calls.lock().unwrap().push(page);
            if self.fail_at == Some(page) {
                return Err(FetchError::Status {
                    url: format!("scripted://page/{page}"),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            let data = self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default();
            Ok(PageEnvelope {
                data,
                meta: PageMeta { total: self.total },
            })
        }
    }

    async fn drain(source: &Scripted) -> Vec<u32> {
        let stream = paginate(source, Duration::ZERO, CancellationToken::new());
        tokio::pin!(stream);
        let mut items = Vec::new();
        while let Some(batch) = stream.next().await {
            items.extend(batch.records);
        }
        items
    }

    #[tokio::test]
    async fn test_walks_pages_in_order_until_empty() {
        let source = Scripted::new(vec![vec![1, 2], vec![3, 4]], Some(10));

        let items = drain(&source).await;

        assert_eq!(items, [1, 2, 3, 4]);
        // preliminary total probe, then pages 1, 2, and the empty 3
        assert_eq!(source.calls(), [1, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_keeps_prior_pages() {
        let mut source = Scripted::new(vec![vec![1, 2], vec![3, 4], vec![5]], Some(10));
        source.fail_at = Some(2);

        let items = drain(&source).await;

        assert_eq!(items, [1, 2]);
        assert_eq!(source.calls(), [1, 1, 2]);
    }

    #[tokio::test]
    async fn test_stops_at_learned_total() {
        let source = Scripted::new(vec![vec![1, 2], vec![3, 4], vec![5, 6]], Some(4));

        let items = drain(&source).await;

        assert_eq!(items, [1, 2, 3, 4]);
        assert_eq!(source.calls(), [1, 1, 2]);
    }

    #[tokio::test]
    async fn test_missing_total_leaves_denominator_unknown() {
        let source = Scripted::new(vec![vec![7]], None);

        let stream = paginate(&source, Duration::ZERO, CancellationToken::new());
        tokio::pin!(stream);
        let batch = stream.next().await.expect("one batch");
        assert_eq!(batch.total, None);
        assert_eq!(batch.records, [7]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_yields_nothing() {
        let source = Scripted::new(vec![vec![1]], Some(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stream = paginate(&source, Duration::ZERO, cancel);
        tokio::pin!(stream);
        assert!(stream.next().await.is_none());
        assert!(source.calls().is_empty());
    }
}
