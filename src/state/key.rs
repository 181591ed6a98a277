//! State keys

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Newtype wrapper for state store keys.
///
/// Well-known keys used by the built-in events and actions are provided
/// as associated constants; level scripts may use any other string.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(Cow<'static, str>);

impl StateKey {
    /// Informed with the dying enemy as payload.
    pub const ENEMY_DIED: Self = Self::from_static("enemy_died");
    /// Informed when the player dies.
    pub const PLAYER_DIED: Self = Self::from_static("player_died");
    /// Running count of enemies spawned in this level.
    pub const ENEMIES_SPAWNED: Self = Self::from_static("enemies_spawned");
    /// Experience accumulated toward the next player level.
    pub const PLAYER_EXPERIENCE: Self = Self::from_static("player_experience");
    /// Current player level (starts at 1).
    pub const PLAYER_LEVEL: Self = Self::from_static("player_level");
    /// Informed with the new level each time the player levels up.
    pub const PLAYER_LEVELED_UP: Self = Self::from_static("player_leveled_up");
    /// Informed whenever experience is granted.
    pub const PLAYER_EXPERIENCE_CHANGED: Self = Self::from_static("player_experience_changed");
    /// Whether the pause menu may currently be opened.
    pub const CAN_PAUSE_GAME: Self = Self::from_static("can_pause_game");
    /// Informed when scripted play must stop (e.g. the player died).
    pub const LEVEL_HALTED: Self = Self::from_static("level_halted");
    /// Touch input broadcasts.
    pub const SCREEN_TOUCH_DOWN: Self = Self::from_static("screen_touch_down");
    pub const SCREEN_TOUCH_MOVED: Self = Self::from_static("screen_touch_moved");
    pub const SCREEN_TOUCH_UP: Self = Self::from_static("screen_touch_up");

    /// Every well-known key, used for suggestions when validating scripts.
    pub const WELL_KNOWN: &'static [Self] = &[
        Self::ENEMY_DIED,
        Self::PLAYER_DIED,
        Self::ENEMIES_SPAWNED,
        Self::PLAYER_EXPERIENCE,
        Self::PLAYER_LEVEL,
        Self::PLAYER_LEVELED_UP,
        Self::PLAYER_EXPERIENCE_CHANGED,
        Self::CAN_PAUSE_GAME,
        Self::LEVEL_HALTED,
        Self::SCREEN_TOUCH_DOWN,
        Self::SCREEN_TOUCH_MOVED,
        Self::SCREEN_TOUCH_UP,
    ];

    /// Creates a key from a static string, usable in `const` context.
    #[must_use]
    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Creates a key from any string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is one of [`StateKey::WELL_KNOWN`].
    #[must_use]
    pub fn is_well_known(&self) -> bool {
        Self::WELL_KNOWN.contains(self)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StateKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StateKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
