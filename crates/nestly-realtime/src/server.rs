//! Top-level realtime engine owning the bus and the registry.

use std::sync::Arc;

use tracing::info;

use nestly_core::config::RealtimeConfig;

use crate::bus::EventBus;
use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::message::envelope::MessageEnvelope;

/// Lifetime scope for the in-process realtime subsystems.
///
/// Cloning shares the same bus and registry.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    /// Domain event bus.
    pub bus: Arc<EventBus>,
    /// Live sessions and rooms.
    pub registry: Arc<ConnectionRegistry>,
    config: RealtimeConfig,
}

impl RealtimeEngine {
    /// Create the engine with fresh subsystems.
    pub fn new(config: RealtimeConfig) -> Self {
        info!(
            channel_buffer_size = config.channel_buffer_size,
            live_room_refresh = config.live_room_refresh,
            "Realtime engine initialized"
        );
        Self {
            bus: Arc::new(EventBus::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            config,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Create a connection handle sized from configuration.
    pub fn new_connection(&self) -> (ConnectionHandle, tokio::sync::mpsc::Receiver<MessageEnvelope>) {
        ConnectionHandle::channel(self.config.channel_buffer_size)
    }

    /// Close every session, detach every handler and drain in-flight
    /// async handlers.
    pub async fn shutdown(&self) {
        info!("Shutting down realtime engine");
        self.registry.close_all();
        self.bus.shutdown().await;
        info!("Realtime engine shut down");
    }
}
