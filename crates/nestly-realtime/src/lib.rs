//! # nestly-realtime
//!
//! In-process realtime plumbing for Nestly notifications:
//!
//! - [`EventBus`]: typed publish/subscribe between domain services and
//!   their consumers, with per-handler failure isolation
//! - [`ConnectionRegistry`]: live WebSocket sessions per user and group
//!   rooms for fan-out
//! - Wire messages sent to clients as JSON envelopes
//! - [`RealtimeEngine`]: owns the bus and registry and tears both down

pub mod bus;
pub mod connection;
pub mod message;
pub mod server;

pub use bus::{EventBus, EventBusStats, SubscriptionId};
pub use connection::{ConnectionHandle, ConnectionRegistry, RegistryStats, UserSnapshot};
pub use message::{MessageEnvelope, OutboundMessage};
pub use server::RealtimeEngine;
