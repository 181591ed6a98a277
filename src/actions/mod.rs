//! Built-in actions
//!
//! Gameplay effects level scripts can attach to events and phases. Every
//! action here is a silent no-op until a caller is bound.

mod loot;
mod player;

use std::time::Duration;

use tracing::{debug, info};

use crate::context::Caller;
use crate::host::{EntitySpec, Scene};
use crate::script::{Action, CallerSlot};
use crate::state::{Point, StateKey, Value};

pub use loot::{DropLoot, HealthDrop, Loot, LootPackage};
pub use player::{GrantExperience, HandlePlayerDeath, Progression};

// ============================================================================
// Messages
// ============================================================================

/// Shows on-screen text.
///
/// Hold and fade default to the level's message settings.
#[derive(Debug, Clone)]
pub struct DisplayText {
    text: String,
    hold: Option<Duration>,
    fade: Option<Duration>,
    caller: CallerSlot,
}

impl DisplayText {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hold: None,
            fade: None,
            caller: CallerSlot::default(),
        }
    }

    /// Text with explicit hold and fade times.
    #[must_use]
    pub fn timed(text: impl Into<String>, hold: Duration, fade: Duration) -> Self {
        Self {
            hold: Some(hold),
            fade: Some(fade),
            ..Self::new(text)
        }
    }

    /// Overrides the hold time.
    #[must_use]
    pub const fn hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Overrides the fade time.
    #[must_use]
    pub const fn fade(mut self, fade: Duration) -> Self {
        self.fade = Some(fade);
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Action for DisplayText {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, _payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        let settings = caller.settings();
        caller.host().display_message(
            &self.text,
            self.hold.unwrap_or(settings.message_hold),
            self.fade.unwrap_or(settings.message_fade),
        );
    }

    fn describe(&self) -> String {
        format!("display {:?}", self.text)
    }
}

/// Writes a line to the log.
#[derive(Debug, Clone)]
pub struct LogMessage {
    text: String,
    caller: CallerSlot,
}

impl LogMessage {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            caller: CallerSlot::default(),
        }
    }
}

impl Action for LogMessage {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        if self.caller.is_bound() {
            info!(message = %self.text, ?payload, "script log");
        }
    }

    fn describe(&self) -> String {
        format!("log {:?}", self.text)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Hands a new enemy to the host and bumps
/// [`StateKey::ENEMIES_SPAWNED`].
#[derive(Debug, Clone)]
pub struct SpawnEnemy {
    kind: String,
    position: Option<Point>,
    caller: CallerSlot,
}

impl SpawnEnemy {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            position: None,
            caller: CallerSlot::default(),
        }
    }

    /// Spawns at a fixed position instead of a host-chosen entry point.
    #[must_use]
    pub const fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }
}

impl Action for SpawnEnemy {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, _payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        caller.host().add_entity(EntitySpec::Enemy {
            kind: self.kind.clone(),
            position: self.position,
        });

        let store = caller.store();
        let spawned = store.get_int(&StateKey::ENEMIES_SPAWNED, 0) + 1;
        debug!(kind = %self.kind, spawned, "enemy spawned");
        store.set(StateKey::ENEMIES_SPAWNED, spawned);
    }

    fn describe(&self) -> String {
        format!("spawn {}", self.kind)
    }
}

// ============================================================================
// State
// ============================================================================

/// Stores a value (and notifies its listeners).
#[derive(Debug, Clone)]
pub struct SetState {
    key: StateKey,
    value: Value,
    caller: CallerSlot,
}

impl SetState {
    #[must_use]
    pub fn new(key: impl Into<StateKey>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            caller: CallerSlot::default(),
        }
    }
}

impl Action for SetState {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, _payload: Option<&Value>) {
        if let Some(caller) = self.caller.get() {
            caller.store().set(self.key.clone(), self.value.clone());
        }
    }

    fn describe(&self) -> String {
        format!("set {}", self.key)
    }
}

/// Broadcasts a value without storing it.
///
/// Without an explicit value the triggering payload is forwarded, and
/// without a payload `true` is sent.
#[derive(Debug, Clone)]
pub struct Inform {
    key: StateKey,
    value: Option<Value>,
    caller: CallerSlot,
}

impl Inform {
    #[must_use]
    pub fn new(key: impl Into<StateKey>) -> Self {
        Self {
            key: key.into(),
            value: None,
            caller: CallerSlot::default(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl Action for Inform {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        let value = self
            .value
            .clone()
            .or_else(|| payload.cloned())
            .unwrap_or(Value::Bool(true));
        caller.store().inform(self.key.clone(), value);
    }

    fn describe(&self) -> String {
        format!("inform {}", self.key)
    }
}

// ============================================================================
// Scenes
// ============================================================================

/// Switches the host to another scene.
#[derive(Debug, Clone)]
pub struct SetScene {
    scene: Scene,
    caller: CallerSlot,
}

impl SetScene {
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            caller: CallerSlot::default(),
        }
    }

    #[must_use]
    pub fn main_menu() -> Self {
        Self::new(Scene::MainMenu)
    }
}

impl Action for SetScene {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, _payload: Option<&Value>) {
        if let Some(caller) = self.caller.get() {
            caller.host().set_scene(self.scene.clone());
        }
    }

    fn describe(&self) -> String {
        format!("scene {}", self.scene)
    }
}
