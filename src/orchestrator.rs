// Batch orchestration: a fixed pool of workers pulls URLs from a shared queue,
// resolves each one to an extractor and records successful listings.
//
// Shutdown is two-phased. Once every URL is queued the sender is dropped and the
// pool gets `drain_timeout` to finish. If that elapses, or the interrupt token
// fires first, workers are cancelled and given a short grace period, then the pool
// is aborted without waiting. A worker stuck in synchronous code keeps its thread
// until the call returns; its URL is reported as cancelled and its late result is
// discarded.

use crate::config::AppConfig;
use crate::model::{BatchResult, ConfigError, ExtractionFailure, Listing};
use crate::registry::ExtractorRegistry;
use chrono::Utc;
use futures::FutureExt;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn};

/// How long cancelled workers get to unwind before they are aborted.
const CANCEL_GRACE: Duration = Duration::from_millis(100);

type UrlQueue = Arc<Mutex<UnboundedReceiver<(usize, String)>>>;
type SharedLedger = Arc<std::sync::Mutex<Ledger>>;

/// Per-run bookkeeping. Each submitted URL is reported exactly once: by the
/// worker that settles it, or by `run` if it is still outstanding at shutdown.
#[derive(Default)]
struct Ledger {
    outstanding: BTreeMap<usize, String>,
    in_flight: HashSet<usize>,
    listings: Vec<Listing>,
}

impl Ledger {
    fn new(urls: &[String]) -> Self {
        Self {
            outstanding: urls.iter().cloned().enumerate().collect(),
            ..Self::default()
        }
    }

    /// Marks a URL as picked up. False once shutdown has already reported it.
    fn start(&mut self, index: usize) -> bool {
        if self.outstanding.contains_key(&index) {
            self.in_flight.insert(index);
            true
        } else {
            false
        }
    }

    /// Claims the right to report a URL's outcome.
    fn settle(&mut self, index: usize) -> bool {
        self.in_flight.remove(&index);
        self.outstanding.remove(&index).is_some()
    }

    /// Reports every unsettled URL as cancelled and hands back the listings.
    fn close(&mut self) -> Vec<Listing> {
        for (index, url) in std::mem::take(&mut self.outstanding) {
            if self.in_flight.contains(&index) {
                warn!(url = %url, kind = "Cancelled", "Extraction abandoned at shutdown");
            } else {
                warn!(url = %url, kind = "Cancelled", "Dropped queued URL at shutdown");
            }
        }
        self.in_flight.clear();
        std::mem::take(&mut self.listings)
    }
}

fn lock(ledger: &std::sync::Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Outcome {
    Extracted(Listing, &'static str),
    Unmatched,
    Failed(ExtractionFailure),
    Panicked,
}

pub struct ScrapeOrchestrator {
    registry: Arc<ExtractorRegistry>,
    concurrency: usize,
    drain_timeout: Duration,
    interrupt: CancellationToken,
}

impl ScrapeOrchestrator {
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        concurrency: usize,
        drain_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be a positive worker count".to_string(),
            });
        }
        if drain_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "drain_timeout_seconds",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            registry,
            concurrency,
            drain_timeout,
            interrupt: CancellationToken::new(),
        })
    }

    pub fn from_config(registry: Arc<ExtractorRegistry>, config: &AppConfig) -> Result<Self, ConfigError> {
        Self::new(registry, config.concurrency, config.drain_timeout())
    }

    /// Token that, when cancelled, cuts the drain wait short as if it had timed out.
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub async fn run(&self, urls: &[String]) -> BatchResult {
        let started_at = Utc::now();
        let (tx, rx) = mpsc::unbounded_channel::<(usize, String)>();
        let queue: UrlQueue = Arc::new(Mutex::new(rx));
        let ledger: SharedLedger = Arc::new(std::sync::Mutex::new(Ledger::new(urls)));
        let cancel = CancellationToken::new();

        let workers = self.concurrency.min(urls.len());
        let mut pool = JoinSet::new();
        for id in 0..workers {
            // Workers log through the caller's subscriber even on other threads
            pool.spawn(
                worker(
                    id,
                    queue.clone(),
                    self.registry.clone(),
                    ledger.clone(),
                    cancel.clone(),
                )
                .with_current_subscriber(),
            );
        }

        for (index, url) in urls.iter().enumerate() {
            if tx.send((index, url.clone())).is_err() {
                break;
            }
        }
        drop(tx);

        info!(
            "Submitted {} URLs to {} workers. Waiting up to {}s for tasks to complete...",
            urls.len(),
            workers,
            self.drain_timeout.as_secs()
        );

        let drained = tokio::select! {
            finished = timeout(self.drain_timeout, join_all_workers(&mut pool)) => {
                if finished.is_err() {
                    warn!(
                        "Workers did not finish within {}s. Cancelling outstanding work.",
                        self.drain_timeout.as_secs()
                    );
                }
                finished.is_ok()
            }
            _ = self.interrupt.cancelled() => {
                warn!("Batch wait interrupted. Cancelling outstanding work.");
                false
            }
        };

        if drained {
            info!("All workers finished gracefully");
        } else {
            cancel.cancel();
            if timeout(CANCEL_GRACE, join_all_workers(&mut pool)).await.is_err() {
                warn!("Some workers ignored cancellation; abandoning them");
            }
            pool.abort_all();
        }

        let listings = lock(&ledger).close();
        info!("Batch finished: {} of {} URLs produced a listing", listings.len(), urls.len());

        BatchResult {
            listings,
            started_at,
            finished_at: Utc::now(),
            timed_out: !drained,
        }
    }
}

async fn join_all_workers(pool: &mut JoinSet<()>) {
    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                error!("Worker panicked: {}", e);
            }
        }
    }
}

async fn next_url(queue: &UrlQueue) -> Option<(usize, String)> {
    queue.lock().await.recv().await
}

async fn worker(
    id: usize,
    queue: UrlQueue,
    registry: Arc<ExtractorRegistry>,
    ledger: SharedLedger,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            job = next_url(&queue) => job,
        };
        let Some((index, url)) = next else {
            break;
        };
        if !lock(&ledger).start(index) {
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = process_url(&url, &registry) => Some(outcome),
        };

        let keep_going = {
            let mut ledger = lock(&ledger);
            if !ledger.settle(index) {
                // Already reported as cancelled at shutdown
                false
            } else if let Some(outcome) = outcome {
                report(&url, outcome, &mut ledger.listings);
                true
            } else {
                warn!(url = %url, kind = "Cancelled", "Extraction abandoned at shutdown");
                false
            }
        };
        if !keep_going {
            break;
        }
    }
    debug!(worker = id, "Worker finished");
}

/// Resolves and extracts a single URL, containing any extractor panic.
async fn process_url(url: &str, registry: &ExtractorRegistry) -> Outcome {
    let Some(extractor) = registry.resolve(url) else {
        return Outcome::Unmatched;
    };

    match AssertUnwindSafe(extractor.extract(url)).catch_unwind().await {
        Ok(Ok(listing)) => Outcome::Extracted(listing, extractor.name()),
        Ok(Err(failure)) => Outcome::Failed(failure),
        Err(_) => Outcome::Panicked,
    }
}

/// Logs the outcome; only successes reach the collected listings.
fn report(url: &str, outcome: Outcome, listings: &mut Vec<Listing>) {
    match outcome {
        Outcome::Extracted(listing, name) => {
            info!(url = %url, extractor = name, "Fetched machine: {:?}", listing.model);
            listings.push(listing);
        }
        Outcome::Unmatched => {
            warn!(url = %url, kind = "NoExtractorMatched", "No scraper found for URL");
        }
        Outcome::Failed(failure) => {
            error!(url = %url, kind = %failure.kind(), "Extraction failed: {}", failure);
        }
        Outcome::Panicked => {
            error!(url = %url, kind = "Panicked", "Extractor panicked");
        }
    }
}
