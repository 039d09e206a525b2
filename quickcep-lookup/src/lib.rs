pub mod error;
pub mod fetch;
pub mod postal_code;
pub mod race;
pub mod record;
pub mod source;

pub use error::LookupError;
pub use fetch::{Fetcher, HttpFetcher, Outcome};
pub use postal_code::PostalCode;
pub use race::{Race, RaceOutcome};
pub use record::{AddressRecord, BrasilApiAddress, ViaCepAddress};
pub use source::{Source, SourceKind};

/// User-Agent string used for all HTTP requests.
pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Creates the HTTP client shared by all [`HttpFetcher`]s of a race.
///
/// No client-level timeout is configured, the race deadline bounds every request.
pub fn default_http_client() -> Result<reqwest::Client, LookupError> {
    reqwest::ClientBuilder::new()
        .user_agent(APP_USER_AGENT)
        .build()
        .map_err(|err| LookupError::RequestConstruction(err.to_string()))
}
