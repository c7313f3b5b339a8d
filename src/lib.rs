//! Analytics Relay: In-Process Analytics Event Dispatch
//!
//! Application code emits named events; the relay runs them through an ordered
//! chain of interceptors and fans the survivors out to every registered
//! provider. Providers and interceptors are trait objects, so backends and
//! transforms plug in without the call sites knowing about them.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod interceptor;
pub mod logging;
pub mod manager;
pub mod provider;
pub mod relay;

pub use config::{ConfigLoader, RelayConfig};
pub use error::{ApiError, DispatchError, ProviderError};
pub use event::{Event, Parameters, Value};
pub use interceptor::{
    EventFilterInterceptor, FnInterceptor, GlobalParametersInterceptor, Interceptor,
    SessionInterceptor, SessionKeys,
};
pub use manager::{DispatchOutcome, Manager};
pub use provider::{Provider, TracingProvider};
pub use relay::Relay;
