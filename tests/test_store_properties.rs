//! Property tests for state store delivery.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use sortie::state::{StateKey, StateListener, StateStore, Value};

#[derive(Default)]
struct Recorder(RefCell<Vec<(String, i64)>>);

impl StateListener for Recorder {
    fn on_change(&self, key: &StateKey, value: &Value) {
        self.0
            .borrow_mut()
            .push((key.to_string(), value.as_int().unwrap_or(-1)));
    }
}

fn key_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string)
}

proptest! {
    #[test]
    fn every_set_is_delivered_once_in_order(
        writes in prop::collection::vec((key_name(), any::<i64>()), 0..64)
    ) {
        let store = StateStore::new();
        let recorder = Rc::new(Recorder::default());
        for key in ["a", "b", "c"] {
            store.subscribe(&recorder, key);
        }

        for (key, value) in &writes {
            store.set(key.as_str(), *value);
        }

        prop_assert_eq!(&*recorder.0.borrow(), &writes);
    }

    #[test]
    fn last_write_wins(values in prop::collection::vec(any::<i64>(), 1..32)) {
        let store = StateStore::new();
        for value in &values {
            store.set("score", *value);
        }
        let last = *values.last().unwrap();
        prop_assert_eq!(store.get_int(&StateKey::new("score"), 0), last);
    }

    #[test]
    fn informs_are_never_stored(values in prop::collection::vec(any::<i64>(), 0..16)) {
        let store = StateStore::new();
        let recorder = Rc::new(Recorder::default());
        store.subscribe(&recorder, "ping");
        for value in &values {
            store.inform("ping", *value);
        }
        prop_assert!(!store.contains(&StateKey::new("ping")));
        prop_assert_eq!(recorder.0.borrow().len(), values.len());
    }

    #[test]
    fn duplicate_subscriptions_deliver_per_subscription(times in 1_usize..5) {
        let store = StateStore::new();
        let recorder = Rc::new(Recorder::default());
        for _ in 0..times {
            store.subscribe(&recorder, "x");
        }
        store.set("x", 5_i64);
        prop_assert_eq!(recorder.0.borrow().len(), times);
    }
}

#[test]
fn dropped_listener_is_pruned() {
    let store = StateStore::new();
    let recorder = Rc::new(Recorder::default());
    store.subscribe(&recorder, "x");
    assert_eq!(store.listener_count(&StateKey::new("x")), 1);

    drop(recorder);
    store.set("x", 1_i64);
    assert_eq!(store.listener_count(&StateKey::new("x")), 0);
}
