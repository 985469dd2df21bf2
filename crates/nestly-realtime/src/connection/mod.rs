//! Live WebSocket sessions and group rooms.

pub mod handle;
pub mod registry;

pub use handle::{ConnectionHandle, UserSnapshot};
pub use registry::{ConnectionRegistry, RegistryStats};
