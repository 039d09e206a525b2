use crate::fetch::{Fetcher, Outcome};
use crate::{AddressRecord, LookupError, PostalCode, SourceKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a [`MockFetcher`] reports once its delay elapsed.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Record(AddressRecord),
    Status(u16),
    NotFound,
    /// Panics inside the fetch task instead of producing an outcome.
    Panic,
}

/// [`Fetcher`] answering with a pre-programmed response after a fixed delay, driven by
/// tokio's clock so tests can run with paused time.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    source: SourceKind,
    delay: Duration,
    response: MockResponse,
    calls: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    completed: Arc<AtomicBool>,
}

impl MockFetcher {
    pub fn new(source: SourceKind, delay: Duration, response: MockResponse) -> Self {
        Self {
            source,
            delay,
            response,
            calls: Default::default(),
            cancelled: Default::default(),
            completed: Default::default(),
        }
    }

    pub fn record(source: SourceKind, delay: Duration, record: impl Into<AddressRecord>) -> Self {
        Self::new(source, delay, MockResponse::Record(record.into()))
    }

    pub fn status(source: SourceKind, delay: Duration, status: u16) -> Self {
        Self::new(source, delay, MockResponse::Status(status))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether the last fetch stopped because of the cancellation token.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the last fetch ran until its delay elapsed.
    pub fn was_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn source(&self) -> SourceKind {
        self.source
    }

    async fn fetch(&self, _postal_code: &PostalCode, cancel: &CancellationToken) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                self.cancelled.store(true, Ordering::SeqCst);
                return Outcome::failure(self.source, LookupError::Cancelled);
            }

            _ = tokio::time::sleep(self.delay) => {}
        }
        self.completed.store(true, Ordering::SeqCst);

        match &self.response {
            MockResponse::Record(record) => Outcome::success(self.source, record.clone()),
            MockResponse::Status(status) => Outcome::failure(
                self.source,
                LookupError::UnexpectedStatus(
                    reqwest::StatusCode::from_u16(*status)
                        .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                ),
            ),
            MockResponse::NotFound => Outcome::failure(
                self.source,
                LookupError::NotFound(format!("{} has no address", self.source)),
            ),
            MockResponse::Panic => panic!("mock fetcher for {} panicked", self.source),
        }
    }
}
