//! Publish/subscribe state store
//!
//! One store exists per running level. It is single-threaded by design:
//! all notification happens synchronously on the frame thread, so the
//! store uses `RefCell` rather than locks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::trace;

use super::key::StateKey;
use super::value::{Point, Value};

/// Capability implemented by anything that subscribes to state changes.
pub trait StateListener {
    /// Called once per subscription each time `key` is set or informed.
    fn on_change(&self, key: &StateKey, value: &Value);
}

/// Keyed value map plus per-key ordered listener lists.
///
/// Listeners are held weakly. A listener whose owner has been dropped is
/// skipped and pruned on the next notification, so subscriptions never
/// keep an event alive after its level is torn down.
///
/// The store performs no deduplication: subscribing the same listener
/// twice yields two notifications per change.
#[derive(Default)]
pub struct StateStore {
    values: RefCell<HashMap<StateKey, Value>>,
    listeners: RefCell<HashMap<StateKey, Vec<Weak<dyn StateListener>>>>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, then notifies every subscriber of `key`
    /// in subscription order.
    pub fn set(&self, key: impl Into<StateKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.values.borrow_mut().insert(key.clone(), value.clone());
        self.notify(&key, &value);
    }

    /// Notifies subscribers of `key` without touching the stored value.
    ///
    /// Used for ephemeral occurrences such as "an enemy died", where the
    /// payload (the dying entity) has no persistent slot.
    pub fn inform(&self, key: impl Into<StateKey>, value: impl Into<Value>) {
        let key = key.into();
        self.notify(&key, &value.into());
    }

    /// [`inform`](Self::inform) with a `true` payload.
    pub fn inform_flag(&self, key: impl Into<StateKey>) {
        self.inform(key, true);
    }

    /// Appends `listener` to the subscribers of `key`.
    ///
    /// The store keeps only a weak reference. The caller must hold the
    /// `Rc` for as long as notifications should arrive: subscribing a
    /// temporary, as in `store.subscribe(&Rc::new(listener), key)`,
    /// delivers nothing once that temporary is dropped.
    pub fn subscribe<L>(&self, listener: &Rc<L>, key: impl Into<StateKey>)
    where
        L: StateListener + 'static,
    {
        let key = key.into();
        // Coerce to the trait object before downgrading.
        let listener: Rc<dyn StateListener> = listener.clone();
        let weak = Rc::downgrade(&listener);
        trace!(key = %key, "state subscription");
        self.listeners.borrow_mut().entry(key).or_default().push(weak);
    }

    /// Removes every subscription of `listener` to `key`.
    pub fn unsubscribe<L>(&self, listener: &Rc<L>, key: &StateKey)
    where
        L: StateListener + 'static,
    {
        let target = Rc::as_ptr(listener).cast::<()>();
        if let Some(list) = self.listeners.borrow_mut().get_mut(key) {
            list.retain(|weak| weak.as_ptr().cast::<()>() != target);
        }
    }

    /// Returns a clone of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &StateKey) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &StateKey) -> bool {
        self.values.borrow().contains_key(key)
    }

    #[must_use]
    pub fn get_int(&self, key: &StateKey, default: i64) -> i64 {
        self.read(key, Value::as_int).unwrap_or(default)
    }

    /// Integers are widened; any other shape yields `default`.
    #[must_use]
    pub fn get_float(&self, key: &StateKey, default: f64) -> f64 {
        self.read(key, Value::as_float).unwrap_or(default)
    }

    #[must_use]
    pub fn get_duration(&self, key: &StateKey, default: Duration) -> Duration {
        self.read(key, Value::as_duration).unwrap_or(default)
    }

    #[must_use]
    pub fn get_point(&self, key: &StateKey, default: Point) -> Point {
        self.read(key, Value::as_point).unwrap_or(default)
    }

    #[must_use]
    pub fn get_bool(&self, key: &StateKey, default: bool) -> bool {
        self.read(key, Value::as_bool).unwrap_or(default)
    }

    #[must_use]
    pub fn get_text(&self, key: &StateKey, default: &str) -> String {
        self.values
            .borrow()
            .get(key)
            .and_then(Value::as_text)
            .map_or_else(|| default.to_string(), str::to_string)
    }

    /// Number of live subscriptions for `key`.
    #[must_use]
    pub fn listener_count(&self, key: &StateKey) -> usize {
        self.listeners
            .borrow()
            .get(key)
            .map_or(0, |list| list.iter().filter(|w| w.strong_count() > 0).count())
    }

    /// Drops every value and subscription. Called on level teardown.
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
    }

    fn read<T>(&self, key: &StateKey, shape: impl Fn(&Value) -> Option<T>) -> Option<T> {
        self.values.borrow().get(key).and_then(shape)
    }

    fn notify(&self, key: &StateKey, value: &Value) {
        // Snapshot live listeners and release the borrow before fanning
        // out: listeners may set, inform or subscribe reentrantly.
        let live: Vec<Rc<dyn StateListener>> = {
            let mut listeners = self.listeners.borrow_mut();
            let Some(list) = listeners.get_mut(key) else {
                return;
            };
            list.retain(|weak| weak.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        trace!(key = %key, kind = value.kind(), listeners = live.len(), "state notify");
        for listener in live {
            listener.on_change(key, value);
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("values", &self.values.borrow().len())
            .field("keys_with_listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}
