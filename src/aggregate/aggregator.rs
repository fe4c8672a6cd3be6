//! Bounded-concurrency detail fan-out.
//!
//! One task is spawned per candidate. Spawning is gated by a semaphore so
//! that at most `concurrency` detail requests are in flight. Free products
//! are merged into a shared map keyed by product key, and the first failure
//! cancels everything that has not started yet.

use crate::market::CatalogError;
use crate::models::{Candidate, DetailRecord, DisplayEntry, OrderedReport};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Source of detail records, one request per call.
#[async_trait]
pub trait DetailFetcher: Send + Sync + 'static {
    async fn fetch_detail(&self, candidate: &Candidate) -> Result<DetailRecord, CatalogError>;
}

/// Terminal failure of an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A detail fetch failed. Only the first failure is kept.
    #[error(transparent)]
    Fetch(#[from] CatalogError),

    #[error("aggregation cancelled")]
    Cancelled,

    #[error("detail task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// Entries keyed by product key, tagged with the index of the candidate
/// that produced them.
type ResultSet = HashMap<String, (usize, DisplayEntry)>;

/// Drives concurrent detail lookups and collects free products.
#[derive(Clone)]
pub struct Aggregator {
    concurrency: usize,
    product_base: String,
    progress: ProgressBar,
}

impl Aggregator {
    /// Create an aggregator allowing `concurrency` requests in flight.
    ///
    /// The cap is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(concurrency: usize, product_base: impl Into<String>) -> Self {
        Self {
            concurrency: concurrency.clamp(1, Semaphore::MAX_PERMITS),
            product_base: product_base.into(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Advance `progress` once per finished fetch.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every candidate and build the sorted report.
    ///
    /// Fails with the first fetch error observed. Once an error is seen, or
    /// `cancel` fires, no further candidates are started; fetches already in
    /// flight finish but their results are discarded.
    pub async fn run<F: DetailFetcher>(
        &self,
        fetcher: Arc<F>,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<OrderedReport, AggregateError> {
        info!(
            "Fetching details for {} candidates (concurrency {})",
            candidates.len(),
            self.concurrency
        );

        let token = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let results: Arc<Mutex<ResultSet>> = Arc::default();
        let mut tasks = JoinSet::new();
        let mut first_error: Option<AggregateError> = None;

        for (index, candidate) in candidates.into_iter().enumerate() {
            // Reap finished tasks so failures surface while still spawning.
            while let Some(joined) = tasks.try_join_next() {
                record_outcome(joined, &mut first_error, &token);
            }

            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!("Stopped spawning at candidate {} after cancellation", index);
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let fetcher = Arc::clone(&fetcher);
            let results = Arc::clone(&results);
            let token = token.clone();
            let progress = self.progress.clone();
            let product_base = self.product_base.clone();

            tasks.spawn(async move {
                let _permit = permit;
                debug!("Fetching detail for {}", candidate);

                let fetched = fetcher.fetch_detail(&candidate).await;
                progress.inc(1);

                let record = match fetched {
                    Ok(record) => record,
                    Err(e) => {
                        token.cancel();
                        return Err(e);
                    }
                };

                if token.is_cancelled() {
                    debug!("Discarding {} after cancellation", candidate);
                    return Ok(());
                }

                match DisplayEntry::from_record(&record, &product_base) {
                    Some(entry) => insert_entry(&results, index, entry).await,
                    None => debug!(
                        "{} has no free variant among {:?}",
                        record.product_key,
                        record.variants.iter().map(|v| &v.name).collect::<Vec<_>>()
                    ),
                }

                Ok(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            record_outcome(joined, &mut first_error, &token);
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }

        let entries: Vec<DisplayEntry> = std::mem::take(&mut *results.lock().await)
            .into_values()
            .map(|(_, entry)| entry)
            .collect();

        let report = OrderedReport::from_entries(entries);
        info!("Found {} free products", report.len());

        Ok(report)
    }
}

/// Insert under the shared lock. A duplicate key keeps the entry from the
/// lowest candidate index, so the winner does not depend on completion order.
///
/// A sequential last-write-wins loop would keep the highest index instead;
/// the two only differ when duplicate records disagree.
async fn insert_entry(results: &Mutex<ResultSet>, index: usize, entry: DisplayEntry) {
    let mut results = results.lock().await;

    match results.entry(entry.product_key.clone()) {
        Entry::Vacant(slot) => {
            slot.insert((index, entry));
        }
        Entry::Occupied(mut slot) => {
            debug!("Duplicate product {}", entry.product_key);
            if index < slot.get().0 {
                slot.insert((index, entry));
            }
        }
    }
}

/// Keep the first failure; later ones are logged and dropped.
fn record_outcome(
    joined: Result<Result<(), CatalogError>, JoinError>,
    first_error: &mut Option<AggregateError>,
    token: &CancellationToken,
) {
    let err = match joined {
        Ok(Ok(())) => return,
        Ok(Err(e)) => AggregateError::Fetch(e),
        Err(e) => AggregateError::TaskFailed(e),
    };

    token.cancel();

    if first_error.is_none() {
        error!("Detail fetch failed: {}", err);
        *first_error = Some(err);
    } else {
        debug!("Discarding later failure: {}", err);
    }
}
