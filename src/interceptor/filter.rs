//! Name-based allow / deny filtering.

use std::collections::BTreeSet;

use crate::event::Event;
use crate::interceptor::Interceptor;

/// Drops events by name. Deny wins over allow; an empty allow list allows all.
#[derive(Debug, Clone, Default)]
pub struct EventFilterInterceptor {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
}

impl EventFilterInterceptor {
    pub fn new<A, D, S>(allow: A, deny: D) -> Self
    where
        A: IntoIterator<Item = S>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: allow.into_iter().map(Into::into).collect(),
            deny: deny.into_iter().map(Into::into).collect(),
        }
    }

    pub fn deny<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(Vec::<String>::new(), names.into_iter().map(Into::into))
    }

    pub fn allow<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(names.into_iter().map(Into::into), Vec::<String>::new())
    }

    pub fn permits(&self, name: &str) -> bool {
        if self.deny.contains(name) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(name)
    }
}

impl Interceptor for EventFilterInterceptor {
    fn name(&self) -> &str {
        "event_filter"
    }

    fn intercept(&self, event: Event) -> Option<Event> {
        self.permits(event.name()).then_some(event)
    }
}
