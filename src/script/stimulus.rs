//! Event kinds
//!
//! A [`Stimulus`] is what an event waits for between `start` and
//! `trigger`: a timer expiring or a state notification.

use std::time::Duration;

use crate::context::Caller;
use crate::schedule::TimerHandle;
use crate::state::{StateKey, Value};

use super::event::Event;

/// The external occurrence that fires an event.
pub trait Stimulus {
    /// Short label used in logs, e.g. `"timer 1s"`.
    fn label(&self) -> String;

    /// State keys the event subscribes to. Subscription happens once per
    /// event lifetime, not once per loop.
    fn watched_keys(&self) -> Vec<StateKey> {
        Vec::new()
    }

    /// Filters notifications on the watched keys.
    fn accepts(&self, _key: &StateKey, _value: &Value) -> bool {
        true
    }

    /// Called on every `start`. Timer kinds schedule
    /// [`Event::deferred_trigger`] here and return the handle.
    fn arm(&self, _event: &Event, _caller: &Caller) -> Option<TimerHandle> {
        None
    }
}

/// Fires once, `after` each (re)start.
#[derive(Debug, Clone, Copy)]
pub struct TimerFires {
    after: Duration,
}

impl TimerFires {
    #[must_use]
    pub const fn after(after: Duration) -> Self {
        Self { after }
    }

    #[must_use]
    pub const fn after_secs(secs: u64) -> Self {
        Self::after(Duration::from_secs(secs))
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.after
    }
}

impl Stimulus for TimerFires {
    fn label(&self) -> String {
        format!("timer {}", humantime::format_duration(self.after))
    }

    fn arm(&self, event: &Event, caller: &Caller) -> Option<TimerHandle> {
        Some(caller.scheduler().schedule(self.after, event.deferred_trigger()))
    }
}

/// Fires on every notification of a state key, optionally filtered by
/// value.
pub struct StateChange {
    key: StateKey,
    filter: Option<Box<dyn Fn(&Value) -> bool>>,
}

impl StateChange {
    #[must_use]
    pub fn on(key: impl Into<StateKey>) -> Self {
        Self {
            key: key.into(),
            filter: None,
        }
    }

    /// Fires whenever an enemy dies; the dying entity is the payload.
    #[must_use]
    pub fn enemy_dies() -> Self {
        Self::on(StateKey::ENEMY_DIED)
    }

    #[must_use]
    pub fn player_dies() -> Self {
        Self::on(StateKey::PLAYER_DIED)
    }

    /// Only notifications whose value passes `filter` fire the event.
    #[must_use]
    pub fn where_value(mut self, filter: impl Fn(&Value) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl Stimulus for StateChange {
    fn label(&self) -> String {
        format!("on {}", self.key)
    }

    fn watched_keys(&self) -> Vec<StateKey> {
        vec![self.key.clone()]
    }

    fn accepts(&self, key: &StateKey, value: &Value) -> bool {
        *key == self.key && self.filter.as_ref().is_none_or(|f| f(value))
    }
}

/// Fires only when triggered by hand, e.g. from host input glue.
#[derive(Debug, Clone, Default)]
pub struct Manual {
    label: String,
}

impl Manual {
    #[must_use]
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Stimulus for Manual {
    fn label(&self) -> String {
        if self.label.is_empty() {
            "manual".to_string()
        } else {
            self.label.clone()
        }
    }
}
