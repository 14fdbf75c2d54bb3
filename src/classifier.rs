//! Presentation-neutral classification of health and severity values

use crate::models::{HealthStatus, Severity};

/// Visual identity a renderer should give a value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tone {
    Positive,
    Danger,
    Caution,
    Informational,
    Neutral,
}

impl HealthStatus {
    pub fn tone(&self) -> Tone {
        match self {
            HealthStatus::Healthy => Tone::Positive,
            _ => Tone::Danger,
        }
    }
}

impl Severity {
    pub fn tone(&self) -> Tone {
        match self {
            Severity::Critical => Tone::Danger,
            Severity::Warning => Tone::Caution,
            Severity::Info => Tone::Informational,
            Severity::Other => Tone::Neutral,
        }
    }

    /// Priority rank, higher is more urgent
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
            Severity::Other => 0,
        }
    }
}
