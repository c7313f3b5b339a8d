//! Provider that writes every call as a structured `tracing` event.

use tracing::info;

use crate::error::ProviderError;
use crate::event::Event;
use crate::provider::Provider;

const DEFAULT_NAME: &str = "tracing";

/// Logs events and identity calls under the `analytics_relay::provider` target.
#[derive(Debug, Clone)]
pub struct TracingProvider {
    name: String,
}

impl TracingProvider {
    pub fn new() -> Self {
        Self::named(DEFAULT_NAME)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TracingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for TracingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn track(&self, event: &Event) -> Result<(), ProviderError> {
        let parameters = serde_json::to_string(event.parameters())
            .map_err(|e| ProviderError::Failed(format!("Failed to encode parameters: {}", e)))?;
        info!(
            target: "analytics_relay::provider",
            provider = %self.name,
            event = %event.name(),
            parameters = %parameters,
            "track"
        );
        Ok(())
    }

    fn set_user_property(&self, value: Option<&str>, property: &str) -> Result<(), ProviderError> {
        info!(
            target: "analytics_relay::provider",
            provider = %self.name,
            property = %property,
            value = ?value,
            "set_user_property"
        );
        Ok(())
    }

    fn identify(&self, user_id: Option<&str>) -> Result<(), ProviderError> {
        info!(
            target: "analytics_relay::provider",
            provider = %self.name,
            user_id = ?user_id,
            "identify"
        );
        Ok(())
    }

    fn reset(&self) -> Result<(), ProviderError> {
        info!(target: "analytics_relay::provider", provider = %self.name, "reset");
        Ok(())
    }
}
