//! Interceptors: ordered transform / filter stages run before providers.
//!
//! An interceptor consumes an event and either returns the event to pass on
//! (possibly a different one) or `None` to drop it. A drop halts the chain.

use crate::event::Event;

pub mod filter;
pub mod global_parameters;
pub mod session;

pub use filter::EventFilterInterceptor;
pub use global_parameters::GlobalParametersInterceptor;
pub use session::{SessionInterceptor, SessionKeys};

/// A chainable event transform.
pub trait Interceptor: Send + Sync {
    /// Name used when reporting drops
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Return the event to pass on, or `None` to drop it.
    fn intercept(&self, event: Event) -> Option<Event>;
}

/// Interceptor backed by a closure.
pub struct FnInterceptor<F> {
    name: String,
    f: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(Event) -> Option<Event> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(Event) -> Option<Event> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(&self, event: Event) -> Option<Event> {
        (self.f)(event)
    }
}
