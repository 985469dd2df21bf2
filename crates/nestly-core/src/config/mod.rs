//! Configuration schema, one submodule per TOML section.

pub mod app;
pub mod delivery;
pub mod logging;
pub mod notification;
pub mod realtime;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{DatabaseConfig, ServerConfig};
pub use self::delivery::{DeliveryConfig, DeliveryProviderKind};
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::notification::{NotificationConfig, StoreBackend};
pub use self::realtime::RealtimeConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Every section the server reads. Missing sections and keys fall back
/// to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub realtime: RealtimeConfig,
    pub notifications: NotificationConfig,
    pub worker: WorkerConfig,
    /// Outbound email.
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    /// Layer `{dir}/default.toml`, then `{dir}/{env}.toml`, then
    /// `NESTLY__SECTION__KEY` variables. Either file may be absent.
    pub fn load(config_dir: &str, env: &str) -> Result<Self, AppError> {
        let overlay = |name: &str| {
            config::File::with_name(&format!("{config_dir}/{name}")).required(false)
        };

        let layered = config::Config::builder()
            .add_source(overlay("default"))
            .add_source(overlay(env))
            .add_source(
                config::Environment::with_prefix("NESTLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(layered.try_deserialize()?)
    }
}
