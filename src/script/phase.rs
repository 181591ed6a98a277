//! Phases
//!
//! A [`Phase`] bundles the events and start-time actions of one stage of
//! a level. Completion is counted per owned event chain: the phase
//! finishes once every event it owns has finished, then starts the next
//! phase.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::context::Caller;

use super::action::{Action, ActionCell};
use super::event::{Event, Triggerable};

struct PhaseInner {
    name: String,
    caller: Caller,
    events: RefCell<Vec<Event>>,
    actions: RefCell<Vec<ActionCell>>,
    completed: Cell<usize>,
    next: RefCell<Option<Phase>>,
    /// Events `0..hooked` already carry this phase's completion hook.
    hooked: Cell<usize>,
    running: Cell<bool>,
    finished: Cell<bool>,
}

/// One stage of a level script.
#[derive(Clone)]
pub struct Phase {
    inner: Rc<PhaseInner>,
}

impl Phase {
    #[must_use]
    pub fn new(name: impl Into<String>, caller: &Caller) -> Self {
        Self {
            inner: Rc::new(PhaseInner {
                name: name.into(),
                caller: Rc::clone(caller),
                events: RefCell::new(Vec::new()),
                actions: RefCell::new(Vec::new()),
                completed: Cell::new(0),
                next: RefCell::new(None),
                hooked: Cell::new(0),
                running: Cell::new(false),
                finished: Cell::new(false),
            }),
        }
    }

    /// Adopts `event`, binding it to this phase's caller, and returns it
    /// for further configuration.
    pub fn when(&self, event: Event) -> Event {
        event.set_caller(&self.inner.caller);
        self.inner.events.borrow_mut().push(event.clone());
        event
    }

    /// Adds an action run every time the phase starts, after its events
    /// are armed.
    pub fn execute(&self, action: impl Action + 'static) -> &Self {
        let cell = ActionCell::new(action);
        cell.bind(&self.inner.caller);
        self.inner.actions.borrow_mut().push(cell);
        self
    }

    pub fn set_next_phase(&self, next: Option<Self>) {
        *self.inner.next.borrow_mut() = next;
    }

    /// Arms every owned event, then runs the start-time actions. Does
    /// nothing if the phase is already running.
    pub fn start(&self) {
        let inner = &self.inner;
        if inner.running.get() {
            debug!(phase = %inner.name, "phase already running");
            return;
        }
        inner.completed.set(0);
        inner.finished.set(false);
        inner.running.set(true);
        info!(phase = %inner.name, events = self.event_count(), "phase started");

        self.install_hooks();

        let events = inner.events.borrow().clone();
        for event in &events {
            event.start();
        }

        let actions = inner.actions.borrow().clone();
        for action in &actions {
            action.run(None);
        }

        if events.is_empty() && inner.running.get() {
            self.finish();
        }
    }

    /// Disarms every owned event chain. Completion progress is kept.
    pub fn stop(&self) {
        self.inner.running.set(false);
        for event in self.inner.events.borrow().iter() {
            event.stop_chain();
        }
        debug!(phase = %self.inner.name, "phase stopped");
    }

    /// Stops the phase and returns every owned event chain to its
    /// constructed state.
    pub fn reset(&self) {
        self.stop();
        for event in self.inner.events.borrow().iter() {
            event.reset_chain();
        }
        self.inner.completed.set(0);
        self.inner.finished.set(false);
    }

    /// Resets, then starts again from the beginning.
    pub fn restart(&self) {
        self.reset();
        self.start();
    }

    fn install_hooks(&self) {
        let events = self.inner.events.borrow();
        for event in events.iter().skip(self.inner.hooked.get()) {
            let phase: Weak<PhaseInner> = Rc::downgrade(&self.inner);
            event.on_chain_finished(move || {
                if let Some(inner) = phase.upgrade() {
                    Self { inner }.event_finished();
                }
            });
        }
        self.inner.hooked.set(events.len());
    }

    fn event_finished(&self) {
        let inner = &self.inner;
        if !inner.running.get() {
            debug!(phase = %inner.name, "event finished while phase not running");
            return;
        }
        inner.completed.set(inner.completed.get() + 1);
        debug!(
            phase = %inner.name,
            completed = inner.completed.get(),
            total = self.event_count(),
            "phase event finished"
        );
        if inner.completed.get() >= self.event_count() {
            self.finish();
        }
    }

    fn finish(&self) {
        let inner = &self.inner;
        inner.running.set(false);
        inner.finished.set(true);
        info!(phase = %inner.name, "phase finished");

        let next = inner.next.borrow().clone();
        if let Some(next) = next {
            info!(from = %inner.name, to = %next.name(), "phase transition");
            next.start();
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn next_phase(&self) -> Option<Self> {
        self.inner.next.borrow().clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.borrow().clone()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.events.borrow().len()
    }

    #[must_use]
    pub fn completed_events(&self) -> usize {
        self.inner.completed.get()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.finished.get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.inner.name)
            .field("events", &self.event_count())
            .field("completed", &self.inner.completed.get())
            .field("running", &self.inner.running.get())
            .field("finished", &self.inner.finished.get())
            .finish_non_exhaustive()
    }
}
