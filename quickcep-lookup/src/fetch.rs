#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod http;

pub use http::HttpFetcher;

use crate::{AddressRecord, LookupError, PostalCode, SourceKind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Result of a single fetch attempt against one source.
#[derive(Debug)]
pub struct Outcome {
    pub source: SourceKind,
    pub result: Result<AddressRecord, LookupError>,
}

impl Outcome {
    pub fn success(source: SourceKind, record: AddressRecord) -> Self {
        Self {
            source,
            result: Ok(record),
        }
    }

    pub fn failure(source: SourceKind, error: LookupError) -> Self {
        Self {
            source,
            result: Err(error),
        }
    }
}

/// Resolves a postal code against one source.
///
/// Implementations report every failure through the returned [`Outcome`] and must stop
/// promptly once `cancel` fires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn source(&self) -> SourceKind;

    async fn fetch(&self, postal_code: &PostalCode, cancel: &CancellationToken) -> Outcome;
}
