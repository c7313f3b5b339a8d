//! Application-level handle: a configured manager plus its session interceptor.
//!
//! Build one at startup and pass clones to call sites.

use std::sync::Arc;

use tracing::debug;

use crate::config::RelayConfig;
use crate::error::ApiError;
use crate::interceptor::{
    EventFilterInterceptor, GlobalParametersInterceptor, SessionInterceptor,
};
use crate::manager::{Manager, SharedInterceptor, SharedProvider};

/// Shared analytics context.
#[derive(Clone)]
pub struct Relay {
    manager: Arc<Manager>,
    session: Option<Arc<SessionInterceptor>>,
}

impl Relay {
    /// Relay around an existing manager with no session handle.
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            session: None,
        }
    }

    /// Build a manager from configuration.
    ///
    /// Interceptors are installed in a fixed order: session, global parameters,
    /// filter. Sections that are disabled or empty are skipped.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ApiError> {
        let config = config.clone().validated()?;
        let manager = Manager::new();
        manager.set_enabled(config.enabled);
        manager.set_logging_enabled(config.logging_enabled);

        let mut interceptors: Vec<SharedInterceptor> = Vec::new();
        let session = if config.session.enabled {
            let session = Arc::new(SessionInterceptor::with_keys(config.session.keys()));
            interceptors.push(session.clone());
            Some(session)
        } else {
            None
        };
        if !config.global_parameters.is_empty() {
            interceptors.push(Arc::new(GlobalParametersInterceptor::new(
                config.global_parameters.clone(),
            )));
        }
        if !config.filter.is_empty() {
            interceptors.push(Arc::new(EventFilterInterceptor::new(
                config.filter.allow.clone(),
                config.filter.deny.clone(),
            )));
        }
        let count = interceptors.len();
        manager.register_interceptors(interceptors);
        if config.logging_enabled {
            debug!(interceptors = count, "relay configured");
        }

        Ok(Self {
            manager: Arc::new(manager),
            session,
        })
    }

    /// Build from configuration and register `providers`.
    pub fn with_providers(
        config: &RelayConfig,
        providers: Vec<SharedProvider>,
    ) -> Result<Self, ApiError> {
        let relay = Self::from_config(config)?;
        relay.manager.register_providers(providers);
        Ok(relay)
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Session interceptor installed from configuration, if any.
    pub fn session(&self) -> Option<&Arc<SessionInterceptor>> {
        self.session.as_ref()
    }
}
