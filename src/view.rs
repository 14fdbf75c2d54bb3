//! View model aggregation
//!
//! The view holds four independent cells: services, alerts, the live incident
//! feed and the push connection state. Each cell has exactly one writer handle,
//! handed out once by [`ViewModel::new`] and moved into the producer that owns
//! it. Readers only ever see whole values; a slice is replaced, never merged.
//!
//! Every writer is bound to a [`ProducerScope`]. Once the scope is closed the
//! writer silently drops further writes, so a response that lands after
//! teardown never reaches the view.

use crate::buffer::IncidentBuffer;
use crate::live::ConnectionState;
use crate::models::{Alert, IncidentEvent, Service};
use crate::poller::FetchOutcome;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Lifetime of a single producer
///
/// Writes are checked and applied while holding the scope lock, so once
/// [`ProducerScope::close`] returns no write from this scope can follow.
#[derive(Debug, Clone)]
pub struct ProducerScope {
    open: Arc<Mutex<bool>>,
}

impl ProducerScope {
    pub fn new() -> Self {
        Self {
            open: Arc::new(Mutex::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the scope; later writes are discarded
    pub fn close(&self) {
        self.close_with(|| ());
    }

    /// Run a final write, then close, without letting another write in between
    pub fn close_with<R>(&self, last: impl FnOnce() -> R) -> Option<R> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return None;
        }
        let result = last();
        *open = false;
        Some(result)
    }

    fn within<R>(&self, write: impl FnOnce() -> R) -> Option<R> {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open { Some(write()) } else { None }
    }
}

impl Default for ProducerScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive write access to one polled slice
#[derive(Debug)]
pub struct SliceWriter<T> {
    name: &'static str,
    tx: Arc<watch::Sender<T>>,
    scope: ProducerScope,
}

impl<T> Clone for SliceWriter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: Arc::clone(&self.tx),
            scope: self.scope.clone(),
        }
    }
}

impl<T> SliceWriter<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scope(&self) -> &ProducerScope {
        &self.scope
    }

    /// Replace the whole slice. Returns false when the scope is closed.
    pub fn replace(&self, value: T) -> bool {
        self.scope
            .within(|| {
                self.tx.send_replace(value);
            })
            .is_some()
    }
}

impl<T> SliceWriter<Vec<T>> {
    /// Apply one fetch result: fresh data replaces the slice, a failure keeps it.
    ///
    /// Returns true only when the slice was replaced.
    pub fn apply(&self, outcome: FetchOutcome<T>) -> bool {
        match outcome {
            FetchOutcome::Fresh(items) => {
                let count = items.len();
                if self.replace(items) {
                    debug!("Refreshed {} slice with {} items", self.name, count);
                    true
                } else {
                    debug!("Discarding late {} response after teardown", self.name);
                    false
                }
            }
            FetchOutcome::Failed(e) => {
                if self.scope.is_open() {
                    warn!(
                        "Failed to refresh {}, keeping {} previous items: {}",
                        self.name,
                        self.tx.borrow().len(),
                        e
                    );
                }
                false
            }
        }
    }
}

/// Exclusive write access to the incident feed and connection state
#[derive(Debug, Clone)]
pub struct LiveWriter {
    incidents: Arc<watch::Sender<IncidentBuffer>>,
    connection: Arc<watch::Sender<ConnectionState>>,
    scope: ProducerScope,
}

impl LiveWriter {
    pub fn scope(&self) -> &ProducerScope {
        &self.scope
    }

    /// Record a connection state change. Returns false when the scope is closed.
    pub fn set_connection(&self, state: ConnectionState) -> bool {
        self.scope
            .within(|| {
                self.connection.send_replace(state);
            })
            .is_some()
    }

    /// Prepend an incident to the feed. Returns false when the scope is closed.
    pub fn push_incident(&self, incident: IncidentEvent) -> bool {
        self.scope
            .within(|| {
                self.incidents.send_modify(|buffer| {
                    buffer.push(incident);
                });
            })
            .is_some()
    }

    /// Mark the channel disconnected and close the scope in one step
    pub fn shut(&self) {
        self.scope.close_with(|| {
            self.connection.send_replace(ConnectionState::Disconnected);
        });
    }
}

/// The writer handles for a fresh view, one per producer
#[derive(Debug)]
pub struct Producers {
    pub services: SliceWriter<Vec<Service>>,
    pub alerts: SliceWriter<Vec<Alert>>,
    pub live: LiveWriter,
}

/// Read side of the aggregated view
#[derive(Debug, Clone)]
pub struct ViewModel {
    services: watch::Receiver<Vec<Service>>,
    alerts: watch::Receiver<Vec<Alert>>,
    incidents: watch::Receiver<IncidentBuffer>,
    connection: watch::Receiver<ConnectionState>,
}

/// Owned copy of all four cells at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub services: Vec<Service>,
    pub alerts: Vec<Alert>,
    pub incidents: Vec<IncidentEvent>,
    pub connection: ConnectionState,
}

impl ViewModel {
    /// Create an empty view and the writer handles that feed it
    pub fn new(incident_capacity: usize) -> (ViewModel, Producers) {
        let (services_tx, services) = watch::channel(Vec::new());
        let (alerts_tx, alerts) = watch::channel(Vec::new());
        let (incidents_tx, incidents) = watch::channel(IncidentBuffer::new(incident_capacity));
        let (connection_tx, connection) = watch::channel(ConnectionState::Disconnected);

        let producers = Producers {
            services: SliceWriter {
                name: "services",
                tx: Arc::new(services_tx),
                scope: ProducerScope::new(),
            },
            alerts: SliceWriter {
                name: "alerts",
                tx: Arc::new(alerts_tx),
                scope: ProducerScope::new(),
            },
            live: LiveWriter {
                incidents: Arc::new(incidents_tx),
                connection: Arc::new(connection_tx),
                scope: ProducerScope::new(),
            },
        };

        let view = ViewModel {
            services,
            alerts,
            incidents,
            connection,
        };

        (view, producers)
    }

    pub fn services(&self) -> Vec<Service> {
        self.services.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.borrow().clone()
    }

    /// Live incidents, newest first
    pub fn incidents(&self) -> Vec<IncidentEvent> {
        self.incidents.borrow().to_vec()
    }

    pub fn connection(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            services: self.services(),
            alerts: self.alerts(),
            incidents: self.incidents(),
            connection: self.connection(),
        }
    }

    /// Wait until any cell changes.
    ///
    /// Returns false once a producer side has gone away for good.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            r = self.services.changed() => r.is_ok(),
            r = self.alerts.changed() => r.is_ok(),
            r = self.incidents.changed() => r.is_ok(),
            r = self.connection.changed() => r.is_ok(),
        }
    }
}
