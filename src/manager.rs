//! Dispatch manager.
//!
//! Holds the registered providers and interceptor chain, applies the enable
//! toggle, runs the chain, and fans the surviving event out to every provider.
//!
//! Providers and interceptors live behind one lock as immutable shared slices.
//! Writers replace a slice; every operation clones both slice handles under the
//! lock and then runs without it, so a concurrent registration never changes an
//! operation already in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, Operation, ProviderError, ProviderFailure};
use crate::event::{Event, Parameters};
use crate::interceptor::Interceptor;
use crate::provider::Provider;

pub type SharedProvider = Arc<dyn Provider>;
pub type SharedInterceptor = Arc<dyn Interceptor>;

/// What happened to a manager operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Tracking is disabled; nothing ran.
    Disabled,
    /// An interceptor dropped the event; no provider saw it.
    Dropped { interceptor: String },
    /// Every provider in the snapshot was called successfully.
    Delivered { providers: usize },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

/// Point-in-time view of the provider list and interceptor chain.
#[derive(Clone)]
pub struct PipelineSnapshot {
    pub providers: Arc<[SharedProvider]>,
    pub interceptors: Arc<[SharedInterceptor]>,
}

impl PipelineSnapshot {
    fn empty() -> Self {
        Self {
            providers: Arc::from(Vec::<SharedProvider>::new()),
            interceptors: Arc::from(Vec::<SharedInterceptor>::new()),
        }
    }

    /// Run `event` through the interceptor chain.
    ///
    /// Returns the surviving event, or the name of the interceptor that dropped
    /// it. Interceptors after a drop are not called.
    pub fn apply_interceptors(&self, event: Event) -> Result<Event, String> {
        self.interceptors
            .iter()
            .try_fold(event, |event, interceptor| {
                interceptor
                    .intercept(event)
                    .ok_or_else(|| interceptor.name().to_string())
            })
    }
}

/// Thread-safe analytics dispatch point.
///
/// Construct once at startup, wrap in an `Arc`, and hand it to call sites.
pub struct Manager {
    pipeline: Mutex<PipelineSnapshot>,
    enabled: AtomicBool,
    logging_enabled: AtomicBool,
}

impl Manager {
    /// Enabled manager with logging off and nothing registered.
    pub fn new() -> Self {
        Self {
            pipeline: Mutex::new(PipelineSnapshot::empty()),
            enabled: AtomicBool::new(true),
            logging_enabled: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Takes effect on the next operation.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.logging_enabled.load(Ordering::Relaxed)
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.logging_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Atomic copy of both lists.
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.pipeline.lock().clone()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.snapshot()
            .providers
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn interceptor_names(&self) -> Vec<String> {
        self.snapshot()
            .interceptors
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Replace the provider list. An empty list is valid.
    pub fn register_providers(&self, providers: Vec<SharedProvider>) {
        let count = providers.len();
        self.pipeline.lock().providers = Arc::from(providers);
        if self.is_logging_enabled() {
            debug!(providers = count, "registered providers");
        }
    }

    /// Append one provider after the existing ones.
    pub fn add_provider(&self, provider: SharedProvider) {
        let name = provider.name().to_string();
        {
            let mut pipeline = self.pipeline.lock();
            let mut providers = pipeline.providers.to_vec();
            providers.push(provider);
            pipeline.providers = Arc::from(providers);
        }
        if self.is_logging_enabled() {
            debug!(provider = %name, "added provider");
        }
    }

    /// Replace the interceptor chain. An empty chain is valid.
    pub fn register_interceptors(&self, interceptors: Vec<SharedInterceptor>) {
        let count = interceptors.len();
        self.pipeline.lock().interceptors = Arc::from(interceptors);
        if self.is_logging_enabled() {
            debug!(interceptors = count, "registered interceptors");
        }
    }

    /// Append one interceptor to the end of the chain.
    pub fn add_interceptor(&self, interceptor: SharedInterceptor) {
        let name = interceptor.name().to_string();
        {
            let mut pipeline = self.pipeline.lock();
            let mut interceptors = pipeline.interceptors.to_vec();
            interceptors.push(interceptor);
            pipeline.interceptors = Arc::from(interceptors);
        }
        if self.is_logging_enabled() {
            debug!(interceptor = %name, "added interceptor");
        }
    }

    /// Run `event` through the interceptor chain and deliver it to every provider.
    ///
    /// No-op while disabled. A drop is reported as `DispatchOutcome::Dropped`,
    /// not as an error. Provider failures do not stop delivery to the remaining
    /// providers; they are collected into the returned error.
    pub fn track(&self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        if !self.is_enabled() {
            return Ok(DispatchOutcome::Disabled);
        }
        let snapshot = self.snapshot();
        let event = match snapshot.apply_interceptors(event) {
            Ok(event) => event,
            Err(interceptor) => {
                if self.is_logging_enabled() {
                    info!(interceptor = %interceptor, "event dropped by interceptor");
                }
                return Ok(DispatchOutcome::Dropped { interceptor });
            }
        };
        if self.is_logging_enabled() {
            debug!(
                event = %event,
                providers = snapshot.providers.len(),
                "dispatching event"
            );
        }
        self.fan_out(Operation::Track, &snapshot.providers, |provider| {
            provider.track(&event)
        })
    }

    /// Track an event built from a name and parameters.
    pub fn track_named(
        &self,
        name: impl Into<String>,
        parameters: impl Into<Parameters>,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.track(Event::with_parameters(name, parameters))
    }

    /// Set (or clear, with `None`) a user property on every provider.
    /// Bypasses interceptors.
    pub fn set_user_property(
        &self,
        value: Option<&str>,
        property: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !self.is_enabled() {
            return Ok(DispatchOutcome::Disabled);
        }
        let snapshot = self.snapshot();
        if self.is_logging_enabled() {
            debug!(property = %property, value = ?value, "setting user property");
        }
        self.fan_out(Operation::SetUserProperty, &snapshot.providers, |provider| {
            provider.set_user_property(value, property)
        })
    }

    /// Identify the current user on every provider; `None` means anonymous.
    pub fn identify(&self, user_id: Option<&str>) -> Result<DispatchOutcome, DispatchError> {
        if !self.is_enabled() {
            return Ok(DispatchOutcome::Disabled);
        }
        let snapshot = self.snapshot();
        if self.is_logging_enabled() {
            debug!(user_id = ?user_id, "identifying user");
        }
        self.fan_out(Operation::Identify, &snapshot.providers, |provider| {
            provider.identify(user_id)
        })
    }

    /// Reset every provider. Runs even while tracking is disabled.
    pub fn reset(&self) -> Result<DispatchOutcome, DispatchError> {
        let snapshot = self.snapshot();
        if self.is_logging_enabled() {
            debug!("resetting providers");
        }
        self.fan_out(Operation::Reset, &snapshot.providers, |provider| {
            provider.reset()
        })
    }

    fn fan_out<F>(
        &self,
        operation: Operation,
        providers: &[SharedProvider],
        mut call: F,
    ) -> Result<DispatchOutcome, DispatchError>
    where
        F: FnMut(&dyn Provider) -> Result<(), ProviderError>,
    {
        let mut failures = Vec::new();
        for provider in providers {
            if let Err(error) = call(provider.as_ref()) {
                if self.is_logging_enabled() {
                    warn!(
                        provider = %provider.name(),
                        operation = %operation,
                        error = %error,
                        "provider call failed"
                    );
                }
                failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    error,
                });
            }
        }
        if failures.is_empty() {
            Ok(DispatchOutcome::Delivered {
                providers: providers.len(),
            })
        } else {
            Err(DispatchError::ProviderFailures {
                operation,
                failures,
                attempted: providers.len(),
            })
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
