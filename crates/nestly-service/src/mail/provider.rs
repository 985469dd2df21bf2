//! Delivery provider implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use nestly_core::config::{DeliveryConfig, DeliveryProviderKind};
use nestly_core::error::{AppError, ErrorKind};
use nestly_core::result::AppResult;
use nestly_core::traits::{DeliveryOutcome, DeliveryProvider, EmailMessage};

/// Build the provider selected by `delivery.provider`.
pub fn build_provider(config: &DeliveryConfig) -> AppResult<Arc<dyn DeliveryProvider>> {
    match config.provider {
        DeliveryProviderKind::Log => Ok(Arc::new(LogDeliveryProvider::new(&config.from_address))),
        DeliveryProviderKind::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                AppError::configuration("delivery.endpoint is required for the http provider")
            })?;
            let provider = HttpDeliveryProvider::new(
                endpoint,
                config.api_key.clone(),
                &config.from_address,
                Duration::from_secs(config.timeout_seconds),
            )?;
            Ok(Arc::new(provider))
        }
    }
}

/// Development provider: logs the message and reports success.
#[derive(Debug, Clone)]
pub struct LogDeliveryProvider {
    from: String,
}

impl LogDeliveryProvider {
    /// Creates a new log provider.
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl DeliveryProvider for LogDeliveryProvider {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        let message_id = format!("log-{}", Uuid::new_v4());
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            message_id = %message_id,
            "Email (not sent)"
        );
        DeliveryOutcome::Sent { message_id }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Posts messages as JSON to a transactional mail API.
#[derive(Debug, Clone)]
pub struct HttpDeliveryProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpDeliveryProvider {
    /// Creates a new HTTP provider.
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        from: &str,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl DeliveryProvider for HttpDeliveryProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        let body = SendRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html_body,
            text: &message.text_body,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::Failed {
                    reason: format!("request failed: {e}"),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return DeliveryOutcome::Failed {
                reason: format!("provider returned {status}: {detail}"),
            };
        }

        // Some APIs answer 202 with an empty body.
        let message_id = match response.json::<SendResponse>().await {
            Ok(SendResponse { id: Some(id) }) => id,
            _ => Uuid::new_v4().to_string(),
        };
        debug!(to = %message.to, message_id = %message_id, "Email accepted");
        DeliveryOutcome::Sent { message_id }
    }
}
