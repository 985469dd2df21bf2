//! Process-wide domain event bus.

pub mod event_bus;
pub mod stats;

pub use event_bus::{EventBus, SubscriptionId};
pub use stats::EventBusStats;
