//! Outbound email delivery configuration.

use serde::{Deserialize, Serialize};

/// Which delivery provider sends transactional email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryProviderKind {
    /// Log the message instead of sending it.
    Log,
    /// POST the message to an HTTP mail API.
    Http,
}

/// Delivery provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Provider implementation.
    #[serde(default = "default_provider")]
    pub provider: DeliveryProviderKind,
    /// HTTP endpoint for the `http` provider.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer API key for the `http` provider.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from_address: String,
    /// Public base URL used to build action links in emails.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            api_key: None,
            from_address: default_from(),
            app_url: default_app_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_provider() -> DeliveryProviderKind {
    DeliveryProviderKind::Log
}

fn default_from() -> String {
    "Nestly <noreply@nestly.app>".to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout() -> u64 {
    10
}
