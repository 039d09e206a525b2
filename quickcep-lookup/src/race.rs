//! First-response-wins lookup across several sources.
//!
//! A [`Race`] starts one task per [`Fetcher`], then waits for whichever comes first: the
//! first [`Outcome`] delivered by any task, or the deadline. Exactly one [`RaceOutcome`]
//! is returned per run. Outcomes arriving after the race is decided are left in the
//! channel buffer and dropped with it.
//!
//! There is no priority between sources. When two fetchers finish close together, the
//! winner is whichever outcome the channel delivers first, which depends on task
//! scheduling and is not deterministic.

use crate::fetch::{Fetcher, Outcome};
use crate::{AddressRecord, LookupError, PostalCode, SourceKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};

/// Default time to wait for the first outcome.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(1);

/// The single result of a [`Race`].
#[derive(Debug)]
pub enum RaceOutcome {
    /// The first outcome to arrive was a success.
    Success {
        source: SourceKind,
        record: AddressRecord,
    },
    /// The first outcome to arrive was a failure. Other sources are not consulted.
    Failure {
        source: SourceKind,
        error: LookupError,
    },
    /// No outcome arrived before the deadline.
    Timeout { deadline: Duration },
}

impl RaceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RaceOutcome::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RaceOutcome::Timeout { .. })
    }

    /// The source whose outcome decided the race, `None` on timeout.
    pub fn source(&self) -> Option<SourceKind> {
        match self {
            RaceOutcome::Success { source, .. } | RaceOutcome::Failure { source, .. } => {
                Some(*source)
            }
            RaceOutcome::Timeout { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<(SourceKind, AddressRecord), LookupError> {
        match self {
            RaceOutcome::Success { source, record } => Ok((source, record)),
            RaceOutcome::Failure { error, .. } => Err(error),
            RaceOutcome::Timeout { deadline } => Err(LookupError::Timeout(deadline)),
        }
    }

    /// JSON-friendly view of the outcome.
    pub fn report(&self) -> RaceReport<'_> {
        match self {
            RaceOutcome::Success { source, record } => RaceReport::Success {
                source: source.name(),
                address: record,
            },
            RaceOutcome::Failure { source, error } => RaceReport::Failure {
                source: source.name(),
                error: error.to_string(),
            },
            RaceOutcome::Timeout { deadline } => RaceReport::Timeout {
                deadline_millis: deadline.as_millis(),
            },
        }
    }
}

impl From<Outcome> for RaceOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome.result {
            Ok(record) => RaceOutcome::Success {
                source: outcome.source,
                record,
            },
            Err(error) => RaceOutcome::Failure {
                source: outcome.source,
                error,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RaceReport<'a> {
    Success {
        source: &'static str,
        address: &'a AddressRecord,
    },
    Failure {
        source: &'static str,
        error: String,
    },
    Timeout {
        deadline_millis: u128,
    },
}

/// Races a fixed set of fetchers against each other and a deadline.
pub struct Race {
    fetchers: Vec<Arc<dyn Fetcher>>,
    deadline: Duration,
    cancel_losers: bool,
}

impl Race {
    pub fn new(fetchers: Vec<Arc<dyn Fetcher>>, deadline: Duration) -> anyhow::Result<Self> {
        if fetchers.is_empty() {
            anyhow::bail!("At least one source is required");
        } else if deadline.is_zero() {
            anyhow::bail!("Deadline must be greater than zero");
        }

        Ok(Self {
            fetchers,
            deadline,
            cancel_losers: true,
        })
    }

    /// Whether fetchers still in flight are cancelled as soon as the race is decided.
    ///
    /// Enabled by default. When disabled, losers keep running until they complete or the
    /// deadline cancels them.
    pub fn with_cancel_losers(mut self, cancel_losers: bool) -> Self {
        self.cancel_losers = cancel_losers;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.fetchers.iter().map(|f| f.source()).collect()
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(%postal_code, participants = self.fetchers.len())
    )]
    pub async fn run(&self, postal_code: &PostalCode) -> RaceOutcome {
        let deadline = Instant::now() + self.deadline;
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<Outcome>(self.fetchers.len());

        for fetcher in &self.fetchers {
            let fetcher = fetcher.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            let postal_code = postal_code.clone();
            tokio::spawn(
                async move {
                    let outcome = fetcher.fetch(&postal_code, &cancel).await;
                    if tx.try_send(outcome).is_err() {
                        tracing::trace!(
                            source = %fetcher.source(),
                            "Race already decided, discarding outcome"
                        );
                    }
                }
                .in_current_span(),
            );
        }
        drop(tx);

        tokio::spawn(cancel_at_deadline(cancel.clone(), deadline).in_current_span());

        tracing::trace!("All fetchers started, waiting for first outcome");
        let outcome = tokio::select! {
            Some(outcome) = rx.recv() => RaceOutcome::from(outcome),
            _ = tokio::time::sleep_until(deadline) => RaceOutcome::Timeout {
                deadline: self.deadline,
            },
        };

        if self.cancel_losers {
            cancel.cancel();
        }

        match &outcome {
            RaceOutcome::Success { source, .. } => {
                tracing::debug!(%source, "Race won");
            }
            RaceOutcome::Failure { source, error } => {
                tracing::warn!(%source, %error, "Race decided by failure");
            }
            RaceOutcome::Timeout { deadline } => {
                tracing::warn!(?deadline, "No source answered before the deadline");
            }
        }

        outcome
    }
}

/// Fires the shared token once the deadline passes, unless it was cancelled before.
async fn cancel_at_deadline(cancel: CancellationToken, deadline: Instant) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep_until(deadline) => {
            tracing::trace!("Deadline elapsed, cancelling in-flight fetchers");
            cancel.cancel();
        }
    }
}
