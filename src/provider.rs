//! Provider Abstraction
//!
//! A provider is the sink end of the pipeline: it receives the final event after
//! every interceptor has run, plus identity operations that bypass interceptors.
//! One implementation per backend. Every operation except `name` has a no-op
//! default so a backend only implements what it supports.

use crate::error::ProviderError;
use crate::event::Event;

pub mod tracing_sink;

pub use tracing_sink::TracingProvider;

/// Backend sink for analytics events and identity operations.
pub trait Provider: Send + Sync {
    /// Provider name used in diagnostics and failure reports
    fn name(&self) -> &str;

    /// Record a fully intercepted event
    fn track(&self, event: &Event) -> Result<(), ProviderError> {
        let _ = event;
        Ok(())
    }

    /// Set or clear (`None`) a user property
    fn set_user_property(&self, value: Option<&str>, property: &str) -> Result<(), ProviderError> {
        let _ = (value, property);
        Ok(())
    }

    /// Associate subsequent events with a user; `None` means anonymous
    fn identify(&self, user_id: Option<&str>) -> Result<(), ProviderError> {
        let _ = user_id;
        Ok(())
    }

    /// Forget identity and any per-user state
    fn reset(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
