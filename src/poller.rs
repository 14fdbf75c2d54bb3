//! Fixed-interval polling of REST resources into view slices

use crate::errors::{DashboardError, Result};
use crate::view::{ProducerScope, SliceWriter};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Result of one poll attempt, as handed to the view
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// Complete collection to replace the slice with
    Fresh(Vec<T>),
    /// Attempt abandoned; the slice keeps its previous value
    Failed(DashboardError),
}

impl<T> From<Result<Vec<T>>> for FetchOutcome<T> {
    fn from(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => FetchOutcome::Fresh(items),
            Err(e) => FetchOutcome::Failed(e),
        }
    }
}

/// Periodic fetcher feeding one slice
pub struct Poller<T> {
    writer: SliceWriter<Vec<T>>,
    period: Duration,
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    /// Fails when `period` is zero.
    pub fn new(writer: SliceWriter<Vec<T>>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(DashboardError::Config(format!(
                "{} poll interval must be greater than 0",
                writer.name()
            )));
        }

        Ok(Self { writer, period })
    }

    /// Start polling: once immediately, then every period.
    ///
    /// Each attempt runs as its own task, so a slow request never holds up
    /// the next tick. Responses are applied in completion order.
    pub fn spawn<F, Fut>(self, fetch: F) -> PollerHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        let name = self.writer.name();
        let scope = self.writer.scope().clone();
        let counters = Arc::new(PollCounters::default());

        info!("Starting {} poller every {:?}", name, self.period);

        let ticker = {
            let writer = self.writer;
            let counters = Arc::clone(&counters);
            let mut ticks = interval(self.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tokio::spawn(async move {
                loop {
                    ticks.tick().await;

                    if !writer.scope().is_open() {
                        break;
                    }

                    counters.attempts.fetch_add(1, Ordering::Relaxed);
                    let request = fetch();
                    let writer = writer.clone();
                    let counters = Arc::clone(&counters);

                    tokio::spawn(async move {
                        let outcome = FetchOutcome::from(request.await);
                        counters.record(&outcome);
                        writer.apply(outcome);
                    });
                }
            })
        };

        PollerHandle {
            name,
            scope,
            ticker,
            counters,
        }
    }
}

/// Owned handle to a running poller; stopping or dropping it ends all writes
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    scope: ProducerScope,
    ticker: JoinHandle<()>,
    counters: Arc<PollCounters>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.scope.is_open()
    }

    /// Cancel future ticks. Requests already in flight finish on their own
    /// but their results are discarded.
    pub fn stop(&self) {
        if self.scope.is_open() {
            self.scope.close();
            info!("Stopped {} poller", self.name);
        }
        self.ticker.abort();
    }

    pub fn stats(&self) -> PollStats {
        self.counters.snapshot()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default)]
struct PollCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl PollCounters {
    fn record<T>(&self, outcome: &FetchOutcome<T>) {
        match outcome {
            FetchOutcome::Fresh(_) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            FetchOutcome::Failed(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let streak = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Poll failure streak now {}", streak);
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
            }
        }
    }

    fn snapshot(&self) -> PollStats {
        PollStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Snapshot of poller diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct PollStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}
