//! Interceptor that fills a fixed parameter set into every event.

use crate::event::{Event, ParameterMap, Value};
use crate::interceptor::Interceptor;

/// Adds configured parameters to events that do not already carry them.
/// Values already on the event always win.
#[derive(Debug, Clone)]
pub struct GlobalParametersInterceptor {
    parameters: ParameterMap,
}

impl GlobalParametersInterceptor {
    pub fn new(parameters: ParameterMap) -> Self {
        Self { parameters }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }
}

impl Interceptor for GlobalParametersInterceptor {
    fn name(&self) -> &str {
        "global_parameters"
    }

    fn intercept(&self, event: Event) -> Option<Event> {
        let (name, parameters) = event.into_parts();
        Some(Event::with_parameters(
            name,
            parameters.merged_with_defaults(&self.parameters),
        ))
    }
}
