//! Stop conditions
//!
//! A looping event re-checks its stop condition after every trigger and
//! keeps re-arming itself until the condition is satisfied.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::context::Caller;
use crate::state::{StateKey, StateListener, Value};

use super::action::CallerSlot;

/// Predicate controlling whether an event repeats.
pub trait StopCondition {
    /// Binds the level context. Conditions that measure from a baseline
    /// capture it here.
    ///
    /// Called again when the owning event is reset, which starts the
    /// measurement over.
    fn set_caller(&mut self, caller: &Caller);

    /// Returns `true` once the owning event should stop repeating.
    fn is_satisfied(&self) -> bool;
}

impl<C: StopCondition + ?Sized> StopCondition for Box<C> {
    fn set_caller(&mut self, caller: &Caller) {
        (**self).set_caller(caller);
    }

    fn is_satisfied(&self) -> bool {
        (**self).is_satisfied()
    }
}

/// Satisfied once an integer key has grown by `target` since binding.
///
/// The baseline is the key's value (default 0) at `set_caller` time, so
/// a counter that already holds progress from an earlier phase is not
/// double counted. Unbound conditions are never satisfied.
#[derive(Debug)]
pub struct CounterReaches {
    key: StateKey,
    target: i64,
    caller: CallerSlot,
    baseline: Cell<i64>,
}

impl CounterReaches {
    #[must_use]
    pub fn new(key: impl Into<StateKey>, target: i64) -> Self {
        Self {
            key: key.into(),
            target,
            caller: CallerSlot::default(),
            baseline: Cell::new(0),
        }
    }

    /// Satisfied once `count` more enemies have been spawned.
    #[must_use]
    pub fn enemies_spawned(count: i64) -> Self {
        Self::new(StateKey::ENEMIES_SPAWNED, count)
    }

    /// Progress since the baseline.
    #[must_use]
    pub fn progress(&self) -> i64 {
        self.caller.get().map_or(0, |caller| {
            caller.store().get_int(&self.key, 0) - self.baseline.get()
        })
    }
}

impl StopCondition for CounterReaches {
    fn set_caller(&mut self, caller: &Caller) {
        self.baseline.set(caller.store().get_int(&self.key, 0));
        self.caller.bind(caller);
    }

    fn is_satisfied(&self) -> bool {
        if !self.caller.is_bound() {
            trace!(key = %self.key, "counter condition unbound");
            return false;
        }
        self.progress() >= self.target
    }
}

/// Counts notifications of a key from the moment it is bound.
///
/// Works for both `set` and `inform` traffic, which makes it the natural
/// condition for ephemeral keys such as [`StateKey::ENEMY_DIED`].
pub struct Occurrences {
    key: StateKey,
    target: u64,
    counter: Option<Rc<OccurrenceCounter>>,
}

struct OccurrenceCounter {
    count: Cell<u64>,
}

impl StateListener for OccurrenceCounter {
    fn on_change(&self, _key: &StateKey, _value: &Value) {
        self.count.set(self.count.get().saturating_add(1));
    }
}

impl Occurrences {
    #[must_use]
    pub fn of(key: impl Into<StateKey>, target: u64) -> Self {
        Self {
            key: key.into(),
            target,
            counter: None,
        }
    }

    /// Notifications observed so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.counter.as_ref().map_or(0, |c| c.count.get())
    }
}

impl StopCondition for Occurrences {
    fn set_caller(&mut self, caller: &Caller) {
        // Rebinding starts a fresh count; the old counter's subscription
        // dies with it.
        let counter = Rc::new(OccurrenceCounter {
            count: Cell::new(0),
        });
        caller.store().subscribe(&counter, self.key.clone());
        self.counter = Some(counter);
    }

    fn is_satisfied(&self) -> bool {
        self.counter.is_some() && self.count() >= self.target
    }
}

impl std::fmt::Debug for Occurrences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Occurrences")
            .field("key", &self.key)
            .field("target", &self.target)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameSettings;
    use crate::context::LevelContext;
    use crate::host::HeadlessHost;
    use crate::schedule::FrameScheduler;

    fn caller() -> Caller {
        let clock = Rc::new(FrameScheduler::new());
        let host = Rc::new(HeadlessHost::new(clock.clone()));
        LevelContext::new(clock, host, GameSettings::default())
    }

    #[test]
    fn test_counter_measures_from_baseline() {
        let ctx = caller();
        ctx.store().set(StateKey::ENEMIES_SPAWNED, 5_i64);

        let mut condition = CounterReaches::enemies_spawned(2);
        condition.set_caller(&ctx);
        assert!(!condition.is_satisfied());

        ctx.store().set(StateKey::ENEMIES_SPAWNED, 6_i64);
        assert!(!condition.is_satisfied());
        ctx.store().set(StateKey::ENEMIES_SPAWNED, 7_i64);
        assert!(condition.is_satisfied());
        assert_eq!(condition.progress(), 2);
    }

    #[test]
    fn test_unbound_counter_never_satisfied() {
        let condition = CounterReaches::new("kills", 0);
        assert!(!condition.is_satisfied());
    }

    #[test]
    fn test_occurrences_count_informs() {
        let ctx = caller();
        let mut condition = Occurrences::of(StateKey::ENEMY_DIED, 3);
        condition.set_caller(&ctx);

        for _ in 0..2 {
            ctx.store().inform_flag(StateKey::ENEMY_DIED);
        }
        assert!(!condition.is_satisfied());
        ctx.store().inform_flag(StateKey::ENEMY_DIED);
        assert!(condition.is_satisfied());
    }

    #[test]
    fn test_occurrences_ignore_traffic_before_binding() {
        let ctx = caller();
        ctx.store().inform_flag(StateKey::ENEMY_DIED);

        let mut condition = Occurrences::of(StateKey::ENEMY_DIED, 1);
        assert!(!condition.is_satisfied());
        condition.set_caller(&ctx);
        assert_eq!(condition.count(), 0);
    }

    #[test]
    fn test_rebinding_occurrences_does_not_double_count() {
        let ctx = caller();
        let mut condition = Occurrences::of("hit", 10);
        condition.set_caller(&ctx);
        condition.set_caller(&ctx);

        ctx.store().inform_flag("hit");

        assert_eq!(condition.count(), 1);
        assert_eq!(ctx.store().listener_count(&"hit".into()), 1);
    }
}
