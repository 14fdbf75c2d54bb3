//! Wire data structures exchanged with the monitoring backend

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A monitored service as reported by `GET /api/services`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: u64,
    pub name: String,
    pub status: HealthStatus,
    /// Percentage in the range 0..=100
    pub uptime: f64,
    /// Epoch seconds
    pub last_check: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for HealthStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "healthy" | "up" | "ok" => HealthStatus::Healthy,
            "unhealthy" | "down" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}

impl From<String> for HealthStatus {
    fn from(s: String) -> Self {
        HealthStatus::from(s.as_str())
    }
}

/// A standing alert as reported by `GET /api/alerts`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: u64,
    /// Name of the owning service
    pub service: String,
    pub severity: Severity,
    pub message: String,
    /// Epoch seconds
    pub timestamp: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    Critical,
    Warning,
    Info,
    Other,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Other => write!(f, "other"),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "warning" | "warn" => Severity::Warning,
            "info" | "information" => Severity::Info,
            _ => Severity::Other,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from(s.as_str())
    }
}

/// A live incident pushed over the alerts channel
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IncidentEvent {
    pub service: String,
    pub severity: Severity,
    pub message: String,
    /// Epoch seconds, as stamped by the backend
    pub timestamp: f64,
}

/// A decoded push channel message
#[derive(Clone, Debug, PartialEq)]
pub enum PushMessage {
    Incident(IncidentEvent),
    Heartbeat { timestamp: Option<f64> },
    /// Any other discriminator, or none at all
    Other(Option<String>),
}

impl PushMessage {
    pub const INCIDENT_TYPE: &'static str = "incident";

    /// Decode a text frame.
    ///
    /// Fails when the frame is not JSON, or when it is tagged as an incident
    /// but lacks the incident fields. Unknown tags decode to `Other`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        match value.get("type").and_then(Value::as_str) {
            Some(Self::INCIDENT_TYPE) => Ok(PushMessage::Incident(serde_json::from_value(value)?)),
            Some("heartbeat") => Ok(PushMessage::Heartbeat {
                timestamp: value["timestamp"].as_f64(),
            }),
            Some(other) => Ok(PushMessage::Other(Some(other.to_string()))),
            None => Ok(PushMessage::Other(None)),
        }
    }
}

/// Response of the backend `GET /health` probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}
