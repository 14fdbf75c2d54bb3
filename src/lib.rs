//! Live Operations Dashboard Client Library
//!
//! This library keeps a bounded, consistent view of service health, standing
//! alerts and freshly pushed incidents from a monitoring backend. Two pollers
//! and one push channel client each own one slice of the view.

pub mod api;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod live;
pub mod models;
pub mod poller;
pub mod render;
pub mod trigger;
pub mod view;

pub use api::{HttpApi, MonitoringApi};
pub use buffer::IncidentBuffer;
pub use classifier::Tone;
pub use config::Config;
pub use dashboard::{Dashboard, DashboardStats};
pub use errors::{DashboardError, Result};
pub use live::{ConnectionState, LiveClient, LiveFeed, LiveHandle, MessageDisposition};
pub use models::{Alert, HealthStatus, IncidentEvent, PushMessage, Service, Severity};
pub use poller::{FetchOutcome, PollStats, Poller, PollerHandle};
pub use trigger::IncidentTrigger;
pub use view::{ViewModel, ViewSnapshot};
