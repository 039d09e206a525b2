use crate::fetch::{Fetcher, Outcome};
use crate::{AddressRecord, LookupError, PostalCode, Source, SourceKind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// [`Fetcher`] performing a single HTTP GET against a [`Source`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    source: Source,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(source: Source, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    pub fn with_default_client(source: Source) -> Result<Self, LookupError> {
        Ok(Self::new(source, crate::default_http_client()?))
    }

    #[instrument(level = "trace", skip(self), err(level = "debug"))]
    async fn request(&self, postal_code: &PostalCode) -> Result<AddressRecord, LookupError> {
        let url = self.source.lookup_url(postal_code)?;
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .build()?;

        tracing::trace!(url = %request.url(), "Performing HTTP request");
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "Received non-success HTTP status code");
            return Err(LookupError::UnexpectedStatus(status));
        }

        tracing::trace!(content_length = ?response.content_length(), "Reading response body");
        let body = response.bytes().await?;

        self.source.kind().decode(&body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn source(&self) -> SourceKind {
        self.source.kind()
    }

    #[instrument(level = "debug", skip_all, fields(source = %self.source.kind(), %postal_code))]
    async fn fetch(&self, postal_code: &PostalCode, cancel: &CancellationToken) -> Outcome {
        tracing::debug!("Fetching address");

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("Cancellation signal received, abandoning request");
                Err(LookupError::Cancelled)
            }

            result = self.request(postal_code) => result,
        };

        match &result {
            Ok(record) => tracing::debug!(cep = record.cep(), "Fetched address"),
            Err(err) => tracing::debug!(?err, "Failed to fetch address"),
        }

        Outcome {
            source: self.source.kind(),
            result,
        }
    }
}
