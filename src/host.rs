//! Host engine boundary
//!
//! Rendering, physics, audio and input belong to the host game engine.
//! Scripted content reaches them only through [`GameHost`]; everything
//! here is fire-and-forget from the script's point of view.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schedule::Scheduler;
use crate::state::Point;

/// Scenes the host can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    MainMenu,
    Level(String),
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainMenu => write!(f, "main menu"),
            Self::Level(name) => write!(f, "level '{name}'"),
        }
    }
}

/// Reward carried by a loot item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootItem {
    Experience(u64),
    Health(f64),
}

/// An entity handed to the host for placement in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntitySpec {
    /// Enemy of the given kind; the host picks an entry point if no
    /// position is given.
    Enemy {
        kind: String,
        position: Option<Point>,
    },
    /// Loot dropped in the world, pushed by `impulse` on spawn.
    Loot {
        item: LootItem,
        position: Point,
        impulse: Point,
    },
}

/// Operations the choreography core consumes from the host engine.
pub trait GameHost {
    /// Shows transient text, held for `hold` then faded over `fade`.
    fn display_message(&self, text: &str, hold: Duration, fade: Duration);

    /// Adds an entity to the scene.
    fn add_entity(&self, entity: EntitySpec);

    /// Replaces the active scene.
    fn set_scene(&self, scene: Scene);

    /// Scales simulation speed (1.0 is normal).
    fn set_game_speed(&self, speed: f64);

    /// Drops any touch currently held by the player.
    fn release_touches(&self);
}

/// What a [`HeadlessHost`] was asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest {
    Message {
        text: String,
        hold: Duration,
        fade: Duration,
    },
    Entity {
        spec: EntitySpec,
    },
    Scene {
        scene: Scene,
    },
    GameSpeed {
        speed: f64,
    },
    ReleaseTouches,
}

/// A timestamped [`HostRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    pub at: Duration,
    pub request: HostRequest,
}

/// Host that renders nothing and records every request.
///
/// Drives the command-line runner and the test suite.
pub struct HeadlessHost {
    clock: Rc<dyn Scheduler>,
    records: RefCell<Vec<HostRecord>>,
}

impl HeadlessHost {
    /// Creates a host stamping records with `clock`'s time.
    #[must_use]
    pub fn new(clock: Rc<dyn Scheduler>) -> Self {
        Self {
            clock,
            records: RefCell::new(Vec::new()),
        }
    }

    /// Every request so far, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<HostRecord> {
        self.records.borrow().clone()
    }

    /// Texts of every displayed message, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match &r.request {
                HostRequest::Message { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(time, text)` for every displayed message.
    #[must_use]
    pub fn timed_messages(&self) -> Vec<(Duration, String)> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match &r.request {
                HostRequest::Message { text, .. } => Some((r.at, text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every entity added, in order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntitySpec> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match &r.request {
                HostRequest::Entity { spec } => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recently requested scene.
    #[must_use]
    pub fn current_scene(&self) -> Option<Scene> {
        self.records.borrow().iter().rev().find_map(|r| match &r.request {
            HostRequest::Scene { scene } => Some(scene.clone()),
            _ => None,
        })
    }

    fn record(&self, request: HostRequest) {
        let at = self.clock.now();
        self.records.borrow_mut().push(HostRecord { at, request });
    }
}

impl GameHost for HeadlessHost {
    fn display_message(&self, text: &str, hold: Duration, fade: Duration) {
        info!(text, "display message");
        self.record(HostRequest::Message {
            text: text.to_string(),
            hold,
            fade,
        });
    }

    fn add_entity(&self, entity: EntitySpec) {
        debug!(?entity, "add entity");
        self.record(HostRequest::Entity { spec: entity });
    }

    fn set_scene(&self, scene: Scene) {
        info!(%scene, "set scene");
        self.record(HostRequest::Scene { scene });
    }

    fn set_game_speed(&self, speed: f64) {
        debug!(speed, "set game speed");
        self.record(HostRequest::GameSpeed { speed });
    }

    fn release_touches(&self) {
        self.record(HostRequest::ReleaseTouches);
    }
}

impl std::fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessHost")
            .field("records", &self.records.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::FrameScheduler;

    #[test]
    fn test_records_are_timestamped() {
        let clock = Rc::new(FrameScheduler::new());
        let host = HeadlessHost::new(clock.clone());

        host.display_message("hello", Duration::ZERO, Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        host.set_scene(Scene::MainMenu);

        let records = host.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].at, Duration::ZERO);
        assert_eq!(records[1].at, Duration::from_secs(2));
        assert_eq!(host.messages(), vec!["hello".to_string()]);
        assert_eq!(host.current_scene(), Some(Scene::MainMenu));
    }

    #[test]
    fn test_entities_filter() {
        let clock = Rc::new(FrameScheduler::new());
        let host = HeadlessHost::new(clock);
        host.add_entity(EntitySpec::Enemy {
            kind: "basic".into(),
            position: None,
        });
        host.set_game_speed(0.5);

        assert_eq!(host.entities().len(), 1);
        assert!(host.messages().is_empty());
    }

    #[test]
    fn test_scene_display() {
        assert_eq!(Scene::MainMenu.to_string(), "main menu");
        assert_eq!(Scene::Level("two".into()).to_string(), "level 'two'");
    }
}
