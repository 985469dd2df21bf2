//! Event bus introspection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nestly_core::events::EventKind;

/// Snapshot of the bus handler table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Event kinds with at least one listener.
    pub total_events: usize,
    /// Listeners across all kinds.
    pub total_listeners: usize,
    /// Listeners per kind.
    pub per_event_counts: BTreeMap<EventKind, usize>,
    /// Events published since startup.
    pub published: u64,
}
