//! Level script schema
//!
//! Serde types for YAML level scripts. A script names a level, optionally
//! tunes its [`GameSettings`], and lists phases of events and actions:
//!
//! ```yaml
//! level:
//!   name: first-contact
//!   countdown: 3
//! phases:
//!   - name: wave-1
//!     execute:
//!       - spawn: basic
//!     events:
//!       - when: { on: enemy_died }
//!         execute:
//!           - spawn: basic
//!         until: { spawned: 3 }
//!         then_execute:
//!           - display: "Wave cleared"
//! ```
//!
//! Durations are humantime strings (`"1s"`, `"250ms"`, `"2m 30s"`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::{LootPackage, Progression};
use crate::host::Scene;
use crate::state::Value;

use super::loader::env_or;

// ============================================================================
// Level
// ============================================================================

/// Root of a level script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelConfig {
    /// Level metadata.
    pub level: LevelMeta,

    /// Tuning overrides; environment defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GameSettings>,

    /// Phases in play order.
    #[serde(default)]
    pub phases: Vec<PhaseConfig>,
}

/// Level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelMeta {
    /// Level name.
    pub name: String,

    /// Countdown shown before the first phase (0 disables it).
    #[serde(default)]
    pub countdown: u32,
}

/// One stage of the level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    /// Phase name, unique within the level.
    pub name: String,

    /// Actions run when the phase starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "action_list")]
    pub execute: Vec<ActionConfig>,

    /// Events owned by the phase; it finishes once all of them finish.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventConfig>,
}

// ============================================================================
// Events
// ============================================================================

/// A scripted event, optionally chained to a successor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    /// Identifier other events can reference in `until: { fired: ... }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// What fires the event.
    pub when: TriggerConfig,

    /// Actions run on every trigger.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "action_list")]
    pub execute: Vec<ActionConfig>,

    /// Repeat until this holds; without it the event fires once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<StopConfig>,

    /// Actions run once when the event stops repeating.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "action_list")]
    pub then_execute: Vec<ActionConfig>,

    /// Actions run once when the last event of this chain finishes.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "action_list")]
    pub finally: Vec<ActionConfig>,

    /// Successor started when this event finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<EventConfig>>,
}

impl EventConfig {
    /// This event followed by every chained successor.
    #[must_use]
    pub fn chain(&self) -> Vec<&Self> {
        let mut chain = vec![self];
        let mut cursor = self.then.as_deref();
        while let Some(next) = cursor {
            chain.push(next);
            cursor = next.then.as_deref();
        }
        chain
    }
}

/// Event trigger: exactly one of `after` or `on`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Fire this long after each start (e.g. `"1s"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,

    /// Fire on every notification of this state key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,

    /// With `on`: only fire when the notified value equals this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
}

/// Stop condition: exactly one form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    /// Satisfied once this many more enemies have spawned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned: Option<i64>,

    /// Integer state key to watch, together with `reaches`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,

    /// Growth of `counter` that satisfies the condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaches: Option<i64>,

    /// State key whose notifications are counted, together with `count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<String>,

    /// Number of `occurrences` that satisfies the condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Satisfied once the event with this id has fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fired: Option<String>,
}

// ============================================================================
// Actions
// ============================================================================

/// A built-in action, written as a single-key map (or a bare name for
/// actions without arguments).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfig {
    /// `display: "text"` or `display: { text, hold, fade }`
    Display(DisplayConfig),
    /// `spawn: basic` or `spawn: { kind, at: { x, y } }`
    Spawn(SpawnConfig),
    /// `set: { key, value }`
    Set { key: String, value: Value },
    /// `inform: { key, value? }`
    Inform {
        key: String,
        #[serde(default)]
        value: Option<Value>,
    },
    /// `log: "text"`
    Log(String),
    /// `scene: main_menu` or `scene: { level: name }`
    Scene(Scene),
    /// `grant_experience: 40`
    GrantExperience(u64),
    /// `drop_loot: { experience, health: { min, max, drop_rate } }`
    DropLoot(LootPackage),
    /// `player_death`
    PlayerDeath,
}

impl ActionConfig {
    /// Short name used in validation messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Display(_) => "display",
            Self::Spawn(_) => "spawn",
            Self::Set { .. } => "set",
            Self::Inform { .. } => "inform",
            Self::Log(_) => "log",
            Self::Scene(_) => "scene",
            Self::GrantExperience(_) => "grant_experience",
            Self::DropLoot(_) => "drop_loot",
            Self::PlayerDeath => "player_death",
        }
    }
}

/// Arguments of a `display` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayConfig {
    Text(String),
    Timed {
        text: String,
        #[serde(default)]
        hold: Option<String>,
        #[serde(default)]
        fade: Option<String>,
    },
}

/// Arguments of a `spawn` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpawnConfig {
    Kind(String),
    Placed {
        kind: String,
        #[serde(default)]
        at: Option<crate::state::Point>,
    },
}

// ============================================================================
// Settings
// ============================================================================

/// Gameplay tuning shared by every action of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameSettings {
    /// How long a message stays fully visible.
    #[serde(with = "duration_text")]
    pub message_hold: Duration,

    /// How long a message takes to fade out.
    #[serde(with = "duration_text")]
    pub message_fade: Duration,

    /// Fade time of each countdown number.
    #[serde(with = "duration_text")]
    pub countdown_fade: Duration,

    /// Maximum experience carried by one loot orb.
    pub experience_per_orb: u64,

    /// Strength of the random push given to dropped loot.
    pub loot_impulse: f64,

    /// Game speed while the player-death screen is up.
    pub death_slowdown: f64,

    /// Install the standing player-death handler.
    pub halt_on_player_death: bool,

    /// Player experience curve.
    pub progression: Progression,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            message_hold: Duration::from_secs(2),
            message_fade: Duration::from_secs(1),
            countdown_fade: Duration::from_secs(1),
            experience_per_orb: 5,
            loot_impulse: 0.5,
            death_slowdown: 0.1,
            halt_on_player_death: true,
            progression: Progression::default(),
        }
    }
}

impl GameSettings {
    /// Defaults with `SORTIE_*` environment overrides applied.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            message_hold: env_duration("SORTIE_MESSAGE_HOLD", defaults.message_hold),
            message_fade: env_duration("SORTIE_MESSAGE_FADE", defaults.message_fade),
            countdown_fade: env_duration("SORTIE_COUNTDOWN_FADE", defaults.countdown_fade),
            experience_per_orb: env_or("SORTIE_EXPERIENCE_PER_ORB", defaults.experience_per_orb),
            loot_impulse: env_or("SORTIE_LOOT_IMPULSE", defaults.loot_impulse),
            death_slowdown: env_or("SORTIE_DEATH_SLOWDOWN", defaults.death_slowdown),
            halt_on_player_death: env_or(
                "SORTIE_HALT_ON_PLAYER_DEATH",
                defaults.halt_on_player_death,
            ),
            progression: defaults.progression,
        }
    }
}

fn env_duration(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| humantime::parse_duration(&v).ok())
        .unwrap_or(default)
}

/// Serde adapter for humantime duration strings.
mod duration_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}

/// Serde adapter for action lists.
///
/// Actions are written as one-key maps (`spawn: basic`) or bare names
/// (`player_death`) rather than YAML tags, at every nesting depth.
mod action_list {
    use serde::{Deserializer, Serializer};
    use serde_yaml::with::singleton_map_recursive;

    use super::ActionConfig;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(
        actions: &Vec<ActionConfig>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        singleton_map_recursive::serialize(actions, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<ActionConfig>, D::Error> {
        singleton_map_recursive::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_level() {
        let config: LevelConfig = serde_yaml::from_str("level: { name: empty }").unwrap();
        assert_eq!(config.level.name, "empty");
        assert_eq!(config.level.countdown, 0);
        assert!(config.phases.is_empty());
        assert!(config.settings.is_none());
    }

    #[test]
    fn test_parse_actions() {
        let yaml = r#"
- display: "hello"
- display: { text: "later", hold: 500ms, fade: 1s }
- spawn: basic
- spawn: { kind: boss, at: { x: 0.0, y: 1.0 } }
- set: { key: boss_awake, value: true }
- inform: { key: alarm }
- log: "note"
- scene: main_menu
- grant_experience: 40
- drop_loot: { experience: 12, health: { min: 5.0, max: 10.0, drop_rate: 0.25 } }
- player_death
"#;
        let actions = action_list::deserialize(serde_yaml::Deserializer::from_str(yaml)).unwrap();
        let kinds: Vec<_> = actions.iter().map(ActionConfig::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "display",
                "display",
                "spawn",
                "spawn",
                "set",
                "inform",
                "log",
                "scene",
                "grant_experience",
                "drop_loot",
                "player_death"
            ]
        );
        assert!(matches!(
            &actions[4],
            ActionConfig::Set { value: Value::Bool(true), .. }
        ));
    }

    #[test]
    fn test_action_forms_in_level_script() {
        let yaml = r#"
level: { name: forms }
phases:
  - name: one
    execute:
      - player_death
      - log: "scalar"
      - spawn: { kind: boss, at: { x: 1.0, y: 2.0 } }
    events:
      - when: { on: enemy_died }
        execute:
          - drop_loot: { experience: 12 }
        then_execute:
          - scene: { level: second }
        finally:
          - scene: main_menu
"#;
        let config: LevelConfig = serde_yaml::from_str(yaml).unwrap();
        let phase = &config.phases[0];
        assert!(matches!(phase.execute[0], ActionConfig::PlayerDeath));
        assert!(matches!(&phase.execute[1], ActionConfig::Log(text) if text == "scalar"));
        assert!(matches!(
            &phase.execute[2],
            ActionConfig::Spawn(SpawnConfig::Placed { kind, at: Some(_) }) if kind == "boss"
        ));

        let event = &phase.events[0];
        assert!(matches!(
            event.execute[0],
            ActionConfig::DropLoot(LootPackage { experience: 12, health: None })
        ));
        assert!(matches!(
            &event.then_execute[0],
            ActionConfig::Scene(Scene::Level(name)) if name == "second"
        ));
        assert!(matches!(event.finally[0], ActionConfig::Scene(Scene::MainMenu)));
    }

    #[test]
    fn test_serialized_actions_reload() {
        let yaml = r#"
level: { name: again }
phases:
  - name: one
    execute: [ player_death, { display: "hi" }, { grant_experience: 5 } ]
"#;
        let config: LevelConfig = serde_yaml::from_str(yaml).unwrap();
        let text = serde_yaml::to_string(&config).unwrap();
        assert!(!text.contains('!'));

        let reloaded: LevelConfig = serde_yaml::from_str(&text).unwrap();
        let kinds: Vec<_> = reloaded.phases[0].execute.iter().map(ActionConfig::kind).collect();
        assert_eq!(kinds, vec!["player_death", "display", "grant_experience"]);
    }

    #[test]
    fn test_event_chain() {
        let yaml = r#"
when: { after: 1s }
then:
  when: { after: 2s }
  then:
    when: { on: enemy_died }
"#;
        let event: EventConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(event.chain().len(), 3);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "level: { name: x }\nphasez: []";
        assert!(serde_yaml::from_str::<LevelConfig>(yaml).is_err());
    }

    #[test]
    fn test_settings_durations() {
        let settings: GameSettings =
            serde_yaml::from_str("message_hold: 3s\nexperience_per_orb: 10").unwrap();
        assert_eq!(settings.message_hold, Duration::from_secs(3));
        assert_eq!(settings.experience_per_orb, 10);
        assert_eq!(settings.message_fade, GameSettings::default().message_fade);
    }

    #[test]
    fn test_bad_settings_duration() {
        assert!(serde_yaml::from_str::<GameSettings>("message_hold: soon").is_err());
    }
}
