//! Dashboard session: wires the producers into one view

use crate::api::{HttpApi, MonitoringApi};
use crate::config::Config;
use crate::errors::{DashboardError, Result};
use crate::live::{ConnectionState, LiveClient, LiveHandle};
use crate::poller::{PollStats, Poller, PollerHandle};
use crate::trigger::IncidentTrigger;
use crate::view::ViewModel;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

/// A running dashboard: two pollers and one live client feeding a view.
///
/// Dropping the dashboard tears every producer down.
#[derive(Debug)]
pub struct Dashboard {
    session_id: String,
    view: ViewModel,
    trigger: IncidentTrigger,
    services: PollerHandle,
    alerts: PollerHandle,
    live: LiveHandle,
}

impl Dashboard {
    /// Start a session against the configured HTTP backend.
    ///
    /// The producers start first; the backend health probe runs in the
    /// background and only logs its result. Must be called from within a
    /// tokio runtime.
    pub fn start(config: Config) -> Result<Self> {
        config.validate().map_err(DashboardError::Config)?;
        let api = Arc::new(HttpApi::new(config.api_url.clone(), config.http_timeout)?);

        let dashboard = Self::start_with(config, Arc::clone(&api) as Arc<dyn MonitoringApi>)?;

        tokio::spawn(async move {
            api.test_connectivity().await;
        });

        Ok(dashboard)
    }

    /// Start a session using any backend implementation for the REST side
    #[instrument(skip_all)]
    pub fn start_with(config: Config, api: Arc<dyn MonitoringApi>) -> Result<Self> {
        config.validate().map_err(DashboardError::Config)?;

        let session_id = Uuid::new_v4().to_string();
        info!("Starting dashboard session {} against {}", session_id, config.api_url);

        let (view, producers) = ViewModel::new(config.incident_capacity);

        let services = {
            let api = Arc::clone(&api);
            Poller::new(producers.services, config.services_interval)?.spawn(move || {
                let api = Arc::clone(&api);
                async move { api.services().await }
            })
        };

        let alerts = {
            let api = Arc::clone(&api);
            Poller::new(producers.alerts, config.alerts_interval)?.spawn(move || {
                let api = Arc::clone(&api);
                async move { api.alerts().await }
            })
        };

        let live = LiveClient::new(config.push_url(), config.http_timeout).spawn(producers.live);

        Ok(Self {
            session_id,
            view,
            trigger: IncidentTrigger::new(api),
            services,
            alerts,
            live,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// A read handle on the aggregated view
    pub fn view(&self) -> ViewModel {
        self.view.clone()
    }

    /// Fire-and-forget incident simulation for `service_name`
    pub fn simulate_incident(&self, service_name: impl Into<String>) -> JoinHandle<()> {
        self.trigger.fire(service_name)
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            session_id: self.session_id.clone(),
            services: self.services.stats(),
            alerts: self.alerts.stats(),
            connection: self.view.connection(),
        }
    }

    /// Stop all producers. Returns immediately; in-flight requests finish
    /// without touching the view.
    pub fn shutdown(&self) {
        self.services.stop();
        self.alerts.stop();
        self.live.stop();

        let stats = self.stats();
        info!(
            "Dashboard session {} stopped - services polls: {} ok / {} failed, alerts polls: {} ok / {} failed",
            stats.session_id,
            stats.services.successes,
            stats.services.failures,
            stats.alerts.successes,
            stats.alerts.failures
        );
    }
}

/// Session diagnostics
#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub session_id: String,
    pub services: PollStats,
    pub alerts: PollStats,
    pub connection: ConnectionState,
}
