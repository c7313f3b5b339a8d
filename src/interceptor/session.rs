//! Session lifecycle interceptor.
//!
//! Stamps every event with the current session id and, while the session is
//! active, the seconds elapsed since it started. Ending a session keeps the id
//! but stops the duration stamp until the next `start_session`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::event::{Event, Value};
use crate::interceptor::Interceptor;

pub const DEFAULT_SESSION_ID_KEY: &str = "session_id";
pub const DEFAULT_SESSION_DURATION_KEY: &str = "session_duration";

/// Parameter keys written by the session interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    #[serde(default = "default_id_key")]
    pub id_key: String,
    #[serde(default = "default_duration_key")]
    pub duration_key: String,
}

fn default_id_key() -> String {
    DEFAULT_SESSION_ID_KEY.to_string()
}

fn default_duration_key() -> String {
    DEFAULT_SESSION_DURATION_KEY.to_string()
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            id_key: default_id_key(),
            duration_key: default_duration_key(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone)]
struct SessionState {
    id: String,
    started_at: Instant,
    status: SessionStatus,
}

impl SessionState {
    fn fresh(started_at: Instant) -> Self {
        Self {
            id: new_session_id(),
            started_at,
            status: SessionStatus::Active,
        }
    }
}

/// Generate an opaque, unique session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Interceptor that attaches session id and duration to every event.
pub struct SessionInterceptor {
    keys: SessionKeys,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
}

impl SessionInterceptor {
    /// Active session with default keys and the system clock.
    pub fn new() -> Self {
        Self::with_keys(SessionKeys::default())
    }

    pub fn with_keys(keys: SessionKeys) -> Self {
        Self::with_clock(keys, Arc::new(SystemClock))
    }

    pub fn with_clock(keys: SessionKeys, clock: Arc<dyn Clock>) -> Self {
        let state = SessionState::fresh(clock.now());
        Self {
            keys,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Begin a new session and return its id. Works from either state.
    pub fn start_session(&self) -> String {
        let fresh = SessionState::fresh(self.clock.now());
        let id = fresh.id.clone();
        *self.state.lock() = fresh;
        id
    }

    /// End the current session and return its length.
    ///
    /// Ending an already ended session is allowed: the id is kept and the
    /// returned duration is measured again from the original start.
    pub fn end_session(&self) -> Duration {
        let mut state = self.state.lock();
        state.status = SessionStatus::Ended;
        self.clock.elapsed_since(state.started_at)
    }

    pub fn session_id(&self) -> String {
        self.state.lock().id.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }
}

impl Default for SessionInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for SessionInterceptor {
    fn name(&self) -> &str {
        "session"
    }

    fn intercept(&self, event: Event) -> Option<Event> {
        let (id, elapsed) = {
            let state = self.state.lock();
            let elapsed = match state.status {
                SessionStatus::Active => Some(self.clock.elapsed_since(state.started_at)),
                SessionStatus::Ended => None,
            };
            (state.id.clone(), elapsed)
        };

        let event = event.with_parameter(self.keys.id_key.clone(), id);
        let event = match elapsed {
            Some(elapsed) => event.with_parameter(
                self.keys.duration_key.clone(),
                Value::Float(elapsed.as_secs_f64()),
            ),
            None => {
                let (name, parameters) = event.into_parts();
                Event::with_parameters(name, parameters.without(&self.keys.duration_key))
            }
        };
        Some(event)
    }
}
