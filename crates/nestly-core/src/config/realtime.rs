//! Connection registry configuration.

use serde::{Deserialize, Serialize};

/// Realtime (WebSocket) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound buffer per connection; messages beyond it are dropped.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Whether group rooms follow membership events while sessions stay open.
    /// When disabled, rooms are only rebuilt on reconnect.
    #[serde(default = "default_true")]
    pub live_room_refresh: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            live_room_refresh: true,
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_true() -> bool {
    true
}
