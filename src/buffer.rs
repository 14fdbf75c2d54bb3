//! Bounded, most-recent-first buffer for live incidents

use crate::models::IncidentEvent;
use std::collections::VecDeque;
use tracing::debug;

/// Fixed-capacity feed of incidents, newest at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentBuffer {
    entries: VecDeque<IncidentEvent>,
    capacity: usize,
}

impl IncidentBuffer {
    /// Create an empty buffer holding at most `capacity` incidents
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an incident at the front, evicting the oldest one when full.
    ///
    /// Returns the evicted incident, if any.
    pub fn push(&mut self, incident: IncidentEvent) -> Option<IncidentEvent> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_back()
        } else {
            None
        };

        self.entries.push_front(incident);

        if evicted.is_some() {
            debug!("Incident feed full, dropped oldest entry");
        }

        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest incident
    pub fn latest(&self) -> Option<&IncidentEvent> {
        self.entries.front()
    }

    pub fn get(&self, index: usize) -> Option<&IncidentEvent> {
        self.entries.get(index)
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &IncidentEvent> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<IncidentEvent> {
        self.entries.iter().cloned().collect()
    }
}
