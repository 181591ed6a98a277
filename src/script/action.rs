//! Actions
//!
//! One-shot effects run when an event fires, when an event finishes, or
//! when a phase starts. An action owns its side effects; it never reports
//! failure back to the engine.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::context::{Caller, LevelContext};
use crate::state::Value;

/// A one-shot effect executed against its bound caller.
pub trait Action {
    /// Binds the level context. Called by the owning event or phase as
    /// soon as the context is known.
    fn set_caller(&mut self, caller: &Caller);

    /// Runs the effect. `payload` is the stimulus value when the action
    /// was fired by a state notification (e.g. the entity that died).
    ///
    /// Implementations must be a silent no-op when no caller is bound.
    fn execute(&self, payload: Option<&Value>);

    /// Human-readable description for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("action")
            .to_string()
    }
}

impl<A: Action + ?Sized> Action for Box<A> {
    fn set_caller(&mut self, caller: &Caller) {
        (**self).set_caller(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        (**self).execute(payload);
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Optional bound caller, for use inside [`Action`] and
/// [`StopCondition`](super::StopCondition) implementations.
#[derive(Debug, Clone, Default)]
pub struct CallerSlot(Option<Caller>);

impl CallerSlot {
    pub fn bind(&mut self, caller: &Caller) {
        self.0 = Some(Rc::clone(caller));
    }

    #[must_use]
    pub fn get(&self) -> Option<&LevelContext> {
        self.0.as_deref()
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.0.is_some()
    }
}

/// Shared, individually borrowable action.
///
/// Events clone their action lists before running them, so an action
/// that causes its own event to trigger again (through the state store)
/// recurses instead of tripping a borrow.
#[derive(Clone)]
pub struct ActionCell(Rc<RefCell<Box<dyn Action>>>);

impl ActionCell {
    pub fn new(action: impl Action + 'static) -> Self {
        Self::from_box(Box::new(action))
    }

    #[must_use]
    pub fn from_box(action: Box<dyn Action>) -> Self {
        Self(Rc::new(RefCell::new(action)))
    }

    pub fn bind(&self, caller: &Caller) {
        match self.0.try_borrow_mut() {
            Ok(mut action) => action.set_caller(caller),
            Err(_) => debug!("action busy; caller not rebound"),
        }
    }

    pub fn run(&self, payload: Option<&Value>) {
        match self.0.try_borrow() {
            Ok(action) => action.execute(payload),
            Err(_) => debug!("action is being rebound; skipped"),
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.0
            .try_borrow()
            .map_or_else(|_| "<busy>".to_string(), |action| action.describe())
    }
}

impl std::fmt::Debug for ActionCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActionCell").field(&self.describe()).finish()
    }
}

/// Action backed by a closure.
pub struct FnAction<F> {
    name: String,
    caller: CallerSlot,
    func: F,
}

impl<F> Action for FnAction<F>
where
    F: Fn(&LevelContext, Option<&Value>),
{
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        if let Some(caller) = self.caller.get() {
            (self.func)(caller, payload);
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Wraps a closure as an [`Action`].
pub fn from_fn<F>(name: impl Into<String>, func: F) -> FnAction<F>
where
    F: Fn(&LevelContext, Option<&Value>),
{
    FnAction {
        name: name.into(),
        caller: CallerSlot::default(),
        func,
    }
}
