//! Fire-and-forget incident simulation

use crate::api::MonitoringApi;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Asks the backend to synthesize an incident for a service.
///
/// The command never touches the view; its effect shows up through the live
/// feed or the next poll.
#[derive(Clone)]
pub struct IncidentTrigger {
    api: Arc<dyn MonitoringApi>,
}

impl IncidentTrigger {
    pub fn new(api: Arc<dyn MonitoringApi>) -> Self {
        Self { api }
    }

    /// Send one request in the background. Failures are logged, never returned.
    ///
    /// The returned handle may be ignored; awaiting it only tells the caller
    /// the request has finished.
    pub fn fire(&self, service_name: impl Into<String>) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let service_name = service_name.into();

        tokio::spawn(async move {
            match api.simulate_incident(&service_name).await {
                Ok(()) => info!("Requested simulated incident for {}", service_name),
                Err(e) => warn!("Failed to simulate incident for {}: {}", service_name, e),
            }
        })
    }
}

impl std::fmt::Debug for IncidentTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentTrigger").finish_non_exhaustive()
    }
}
