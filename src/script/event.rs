//! Events
//!
//! An [`Event`] is a triggerable node of level choreography. Once
//! started it waits for its [`Stimulus`]; each trigger runs its actions,
//! then either re-arms (stop condition unsatisfied) or finishes. A
//! finished event runs its on-finish actions and hands over to the next
//! event in its chain, or, at the end of the chain, runs the chain-final
//! actions collected along the way.
//!
//! `Event` is a cheap handle: clones refer to the same node, which is
//! what lets timers, state listeners and phases all point at it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::context::Caller;
use crate::schedule::{TimerCallback, TimerHandle};
use crate::state::{StateKey, StateListener, Value};

use super::action::{Action, ActionCell};
use super::condition::StopCondition;
use super::stimulus::{Manual, StateChange, Stimulus, TimerFires};

/// Something that can be armed, disarmed and fired.
pub trait Triggerable {
    /// Arms the node. Resets the triggered flag on every call.
    fn start(&self);

    /// Disarms the node; stimuli are ignored until the next `start`.
    fn stop(&self);

    /// Delivers a stimulus.
    fn trigger(&self, payload: Option<&Value>);

    fn is_active(&self) -> bool;
}

/// Entry of the chain-final list: either a scripted action or an
/// engine-registered completion callback.
#[derive(Clone)]
enum Finale {
    Action(ActionCell),
    Hook(Rc<dyn Fn()>),
}

impl Finale {
    fn run(&self) {
        match self {
            Self::Action(action) => action.run(None),
            Self::Hook(hook) => hook(),
        }
    }
}

struct EventInner {
    stimulus: Box<dyn Stimulus>,
    caller: RefCell<Option<Caller>>,
    actions: RefCell<Vec<ActionCell>>,
    on_finish: RefCell<Vec<ActionCell>>,
    /// Registered on this event via `finally` / `on_chain_finished`.
    finals: RefCell<Vec<Finale>>,
    /// Handed over by the predecessor when it finished.
    inherited: RefCell<Vec<Finale>>,
    next: RefCell<Option<Event>>,
    stop_condition: RefCell<Option<Box<dyn StopCondition>>>,
    was_triggered: Cell<bool>,
    is_active: Cell<bool>,
    is_subscribed: Cell<bool>,
    /// Bumped on every start; stale timer callbacks compare against it.
    epoch: Cell<u64>,
    timer: RefCell<Option<TimerHandle>>,
    listener: RefCell<Option<Rc<EventListener>>>,
    trigger_count: Cell<u64>,
    finish_count: Cell<u64>,
}

/// Triggerable, optionally repeating, optionally chained unit of level
/// choreography.
#[derive(Clone)]
pub struct Event {
    inner: Rc<EventInner>,
}

impl Event {
    /// Creates an inert event waiting on `stimulus`.
    pub fn new(stimulus: impl Stimulus + 'static) -> Self {
        Self {
            inner: Rc::new(EventInner {
                stimulus: Box::new(stimulus),
                caller: RefCell::new(None),
                actions: RefCell::new(Vec::new()),
                on_finish: RefCell::new(Vec::new()),
                finals: RefCell::new(Vec::new()),
                inherited: RefCell::new(Vec::new()),
                next: RefCell::new(None),
                stop_condition: RefCell::new(None),
                was_triggered: Cell::new(false),
                is_active: Cell::new(false),
                is_subscribed: Cell::new(false),
                epoch: Cell::new(0),
                timer: RefCell::new(None),
                listener: RefCell::new(None),
                trigger_count: Cell::new(0),
                finish_count: Cell::new(0),
            }),
        }
    }

    /// Fires `after` each start.
    #[must_use]
    pub fn timer(after: Duration) -> Self {
        Self::new(TimerFires::after(after))
    }

    /// Fires on every notification of `key`.
    #[must_use]
    pub fn on_state(key: impl Into<StateKey>) -> Self {
        Self::new(StateChange::on(key))
    }

    /// Fires whenever an enemy dies.
    #[must_use]
    pub fn enemy_dies() -> Self {
        Self::new(StateChange::enemy_dies())
    }

    /// Fires when the player dies.
    #[must_use]
    pub fn player_dies() -> Self {
        Self::new(StateChange::player_dies())
    }

    /// Fires only through [`Triggerable::trigger`].
    #[must_use]
    pub fn manual(label: impl Into<String>) -> Self {
        Self::new(Manual::named(label))
    }

    // ========================================================================
    // Fluent builder
    // ========================================================================

    /// Adds an action run on every trigger.
    pub fn execute(self, action: impl Action + 'static) -> Self {
        self.push_action(ActionCell::new(action));
        self
    }

    /// Adds several trigger-time actions at once.
    pub fn execute_all(self, actions: impl IntoIterator<Item = Box<dyn Action>>) -> Self {
        for action in actions {
            self.push_action(ActionCell::from_box(action));
        }
        self
    }

    /// Repeats the event until `condition` is satisfied.
    ///
    /// Without a stop condition the event fires once and finishes.
    pub fn until(self, condition: impl StopCondition + 'static) -> Self {
        let mut condition: Box<dyn StopCondition> = Box::new(condition);
        if let Some(caller) = self.caller() {
            condition.set_caller(&caller);
        }
        *self.inner.stop_condition.borrow_mut() = Some(condition);
        self
    }

    /// Adds an action run once, when the event stops repeating.
    pub fn on_finish(self, action: impl Action + 'static) -> Self {
        let cell = ActionCell::new(action);
        if let Some(caller) = self.caller() {
            cell.bind(&caller);
        }
        self.inner.on_finish.borrow_mut().push(cell);
        self
    }

    /// Chains `next` after this event and returns `next`, so further
    /// builder calls configure the successor.
    pub fn then(self, next: Self) -> Self {
        if let Some(caller) = self.caller() {
            next.set_caller(&caller);
        }
        *self.inner.next.borrow_mut() = Some(next.clone());
        next
    }

    /// Adds an action run once, when the last event of the chain this
    /// event starts finishes.
    pub fn finally(self, action: impl Action + 'static) -> Self {
        let cell = ActionCell::new(action);
        if let Some(caller) = self.caller() {
            cell.bind(&caller);
        }
        self.inner.finals.borrow_mut().push(Finale::Action(cell));
        self
    }

    /// Registers a callback fired alongside the chain-final actions.
    pub fn on_chain_finished(&self, hook: impl Fn() + 'static) {
        self.inner
            .finals
            .borrow_mut()
            .push(Finale::Hook(Rc::new(hook)));
    }

    /// Binds the level context to this event, its actions, its stop
    /// condition and every successor that has no caller yet.
    pub fn set_caller(&self, caller: &Caller) {
        *self.inner.caller.borrow_mut() = Some(Rc::clone(caller));

        for action in self.inner.actions.borrow().iter() {
            action.bind(caller);
        }
        for action in self.inner.on_finish.borrow().iter() {
            action.bind(caller);
        }
        for finale in self.inner.finals.borrow().iter() {
            if let Finale::Action(action) = finale {
                action.bind(caller);
            }
        }
        if let Some(condition) = self.inner.stop_condition.borrow_mut().as_mut() {
            condition.set_caller(caller);
        }

        let next = self.inner.next.borrow().clone();
        if let Some(next) = next.filter(|n| n.caller().is_none()) {
            next.set_caller(caller);
        }
    }

    fn push_action(&self, cell: ActionCell) {
        if let Some(caller) = self.caller() {
            cell.bind(&caller);
        }
        self.inner.actions.borrow_mut().push(cell);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Full reset for a level restart: disarms, forgets the triggered
    /// flag, drops the state subscription so the next start subscribes
    /// afresh, and rebinds the stop condition.
    pub fn reset(&self) {
        self.stop();
        let inner = &self.inner;
        inner.was_triggered.set(false);
        inner.is_subscribed.set(false);
        inner.trigger_count.set(0);
        inner.finish_count.set(0);
        inner.inherited.borrow_mut().clear();
        // The store holds the listener weakly; dropping it unsubscribes.
        inner.listener.borrow_mut().take();
        // Rebinding restarts baselines and occurrence counts.
        if let Some(caller) = self.caller() {
            if let Some(condition) = inner.stop_condition.borrow_mut().as_mut() {
                condition.set_caller(&caller);
            }
        }
        trace!(event = %self.label(), "event reset");
    }

    /// Stops this event and every successor.
    pub fn stop_chain(&self) {
        for event in self.chain() {
            event.stop();
        }
    }

    /// Resets this event and every successor.
    pub fn reset_chain(&self) {
        for event in self.chain() {
            event.reset();
        }
    }

    /// Returns a callback that triggers this event, or does nothing if
    /// the event has been restarted or dropped in the meantime.
    #[must_use]
    pub fn deferred_trigger(&self) -> TimerCallback {
        let weak = Rc::downgrade(&self.inner);
        let epoch = self.inner.epoch.get();
        Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.epoch.get() != epoch {
                trace!("stale timer ignored");
                return;
            }
            Self { inner }.trigger(None);
        })
    }

    fn arm(&self) {
        let Some(caller) = self.caller() else {
            debug!(event = %self.label(), "event started without caller; stimulus not armed");
            return;
        };

        if !self.inner.is_subscribed.get() {
            self.subscribe(&caller);
            self.inner.is_subscribed.set(true);
        }

        let handle = self.inner.stimulus.arm(self, &caller);
        if let Some(previous) = self.inner.timer.replace(handle) {
            previous.cancel();
        }
    }

    fn subscribe(&self, caller: &Caller) {
        let keys = self.inner.stimulus.watched_keys();
        if keys.is_empty() {
            return;
        }
        let listener = Rc::new(EventListener {
            event: Rc::downgrade(&self.inner),
        });
        for key in keys {
            trace!(event = %self.label(), key = %key, "event subscribed");
            caller.store().subscribe(&listener, key);
        }
        *self.inner.listener.borrow_mut() = Some(listener);
    }

    /// `None` when no stop condition is set.
    fn stop_satisfied(&self) -> Option<bool> {
        self.inner
            .stop_condition
            .borrow()
            .as_ref()
            .map(|condition| condition.is_satisfied())
    }

    fn finish(&self) {
        let inner = &self.inner;
        inner.is_active.set(false);
        inner.finish_count.set(inner.finish_count.get() + 1);
        if let Some(timer) = inner.timer.borrow_mut().take() {
            timer.cancel();
        }
        debug!(event = %self.label(), "event finished");

        let on_finish = inner.on_finish.borrow().clone();
        for action in &on_finish {
            action.run(None);
        }

        // This event's own finals run ahead of those inherited from
        // earlier links, which carry the owning phase's completion hook.
        let mut chain_final = inner.finals.borrow().clone();
        chain_final.extend(inner.inherited.borrow().iter().cloned());

        let next = inner.next.borrow().clone();
        match next {
            Some(next) => {
                trace!(from = %self.label(), to = %next.label(), "chain advance");
                *next.inner.inherited.borrow_mut() = chain_final;
                next.start();
            }
            None => {
                for finale in &chain_final {
                    finale.run();
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn label(&self) -> String {
        self.inner.stimulus.label()
    }

    #[must_use]
    pub fn caller(&self) -> Option<Caller> {
        self.inner.caller.borrow().clone()
    }

    /// The chained successor, if any.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.inner.next.borrow().clone()
    }

    /// This event followed by every successor.
    #[must_use]
    pub fn chain(&self) -> Vec<Self> {
        let mut chain = vec![self.clone()];
        let mut cursor = self.next();
        while let Some(event) = cursor {
            if chain.iter().any(|seen| seen.ptr_eq(&event)) {
                debug!(event = %event.label(), "cyclic event chain truncated");
                break;
            }
            cursor = event.next();
            chain.push(event);
        }
        chain
    }

    #[must_use]
    pub fn was_triggered(&self) -> bool {
        self.inner.was_triggered.get()
    }

    /// Triggers delivered while active since the last reset.
    #[must_use]
    pub fn trigger_count(&self) -> u64 {
        self.inner.trigger_count.get()
    }

    /// How many times this event has finished since the last reset.
    #[must_use]
    pub fn finish_count(&self) -> u64 {
        self.inner.finish_count.get()
    }

    #[must_use]
    pub fn has_stop_condition(&self) -> bool {
        self.inner.stop_condition.borrow().is_some()
    }

    /// Returns `true` if both handles refer to the same event.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Triggerable for Event {
    fn start(&self) {
        let inner = &self.inner;
        inner.was_triggered.set(false);
        inner.is_active.set(true);
        inner.epoch.set(inner.epoch.get() + 1);
        trace!(event = %self.label(), epoch = inner.epoch.get(), "event armed");
        self.arm();
    }

    fn stop(&self) {
        self.inner.is_active.set(false);
        if let Some(timer) = self.inner.timer.borrow_mut().take() {
            timer.cancel();
        }
    }

    fn trigger(&self, payload: Option<&Value>) {
        let inner = &self.inner;
        if !inner.is_active.get() {
            trace!(event = %self.label(), "trigger ignored; event inactive");
            return;
        }

        inner.was_triggered.set(true);
        inner.trigger_count.set(inner.trigger_count.get() + 1);
        debug!(event = %self.label(), count = inner.trigger_count.get(), "event triggered");

        if self.stop_satisfied() == Some(true) {
            debug!(event = %self.label(), "stop condition already satisfied; actions skipped");
        } else {
            let actions = inner.actions.borrow().clone();
            for action in &actions {
                action.run(payload);
            }
        }

        // An action may have stopped this event (e.g. the level halted),
        // or a reentrant trigger may already have finished it.
        if !inner.is_active.get() {
            return;
        }

        match self.stop_satisfied() {
            Some(false) => {
                trace!(event = %self.label(), "stop condition unsatisfied; repeating");
                self.start();
            }
            Some(true) | None => self.finish(),
        }
    }

    fn is_active(&self) -> bool {
        self.inner.is_active.get()
    }
}

/// An event used as a stop condition is satisfied once it has fired.
impl StopCondition for Event {
    fn set_caller(&mut self, _caller: &Caller) {}

    fn is_satisfied(&self) -> bool {
        self.was_triggered()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("label", &self.label())
            .field("is_active", &self.inner.is_active.get())
            .field("was_triggered", &self.inner.was_triggered.get())
            .field("actions", &self.inner.actions.borrow().len())
            .field("has_next", &self.inner.next.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// Bridges state notifications to an event without keeping it alive.
struct EventListener {
    event: Weak<EventInner>,
}

impl StateListener for EventListener {
    fn on_change(&self, key: &StateKey, value: &Value) {
        let Some(inner) = self.event.upgrade() else {
            return;
        };
        if inner.stimulus.accepts(key, value) {
            Event { inner }.trigger(Some(value));
        }
    }
}
