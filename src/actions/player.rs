//! Player progression and death handling.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::Caller;
use crate::script::{Action, CallerSlot};
use crate::state::{StateKey, Value};

/// Experience curve: reaching level `n + 1` from level `n` costs
/// `base_requirement * floor(n ^ growth_rate)` experience.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progression {
    pub base_requirement: u64,
    pub growth_rate: f64,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            base_requirement: 100,
            growth_rate: 1.5,
        }
    }
}

impl Progression {
    /// Experience needed to advance from `level` to the next one.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn requirement(&self, level: u64) -> u64 {
        let scale = (level.max(1) as f64).powf(self.growth_rate).floor();
        self.base_requirement.saturating_mul(scale as u64)
    }

    /// Applies `gained` experience at `(level, experience)`.
    ///
    /// Returns the new level, the experience left toward the next level,
    /// and every level reached along the way. A zero requirement never
    /// levels up.
    #[must_use]
    pub fn advance(&self, level: u64, experience: u64, gained: u64) -> (u64, u64, Vec<u64>) {
        let mut level = level.max(1);
        let mut experience = experience.saturating_add(gained);
        let mut reached = Vec::new();
        loop {
            let needed = self.requirement(level);
            if needed == 0 || experience < needed {
                break;
            }
            experience -= needed;
            level += 1;
            reached.push(level);
        }
        (level, experience, reached)
    }
}

/// Adds experience to the player, levelling up as the curve allows.
///
/// Without a fixed amount, an integer payload is granted instead.
#[derive(Debug, Clone)]
pub struct GrantExperience {
    amount: Option<u64>,
    caller: CallerSlot,
}

impl GrantExperience {
    #[must_use]
    pub fn new(amount: u64) -> Self {
        Self {
            amount: Some(amount),
            caller: CallerSlot::default(),
        }
    }

    /// Grants whatever integer the triggering notification carries.
    #[must_use]
    pub fn from_payload() -> Self {
        Self {
            amount: None,
            caller: CallerSlot::default(),
        }
    }
}

impl Action for GrantExperience {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        let gained = self.amount.or_else(|| {
            payload
                .and_then(Value::as_int)
                .and_then(|n| u64::try_from(n).ok())
        });
        let Some(gained) = gained else {
            debug!("experience grant without amount skipped");
            return;
        };

        let store = caller.store();
        let level = u64::try_from(store.get_int(&StateKey::PLAYER_LEVEL, 1)).unwrap_or(1);
        let experience = u64::try_from(store.get_int(&StateKey::PLAYER_EXPERIENCE, 0)).unwrap_or(0);
        let (level, experience, reached) =
            caller.settings().progression.advance(level, experience, gained);

        store.set(StateKey::PLAYER_EXPERIENCE, to_int(experience));
        store.set(StateKey::PLAYER_LEVEL, to_int(level));
        for new_level in reached {
            info!(level = new_level, "player leveled up");
            store.inform(StateKey::PLAYER_LEVELED_UP, to_int(new_level));
        }
        store.inform(StateKey::PLAYER_EXPERIENCE_CHANGED, to_int(gained));
    }

    fn describe(&self) -> String {
        self.amount
            .map_or_else(|| "grant payload xp".to_string(), |n| format!("grant {n} xp"))
    }
}

fn to_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Halts scripted play after the player died.
///
/// Slows the game down, drops any held touch, forbids pausing and
/// informs [`StateKey::LEVEL_HALTED`] so the level stops its current
/// phase until a retry.
#[derive(Debug, Clone, Default)]
pub struct HandlePlayerDeath {
    caller: CallerSlot,
}

impl HandlePlayerDeath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for HandlePlayerDeath {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, _payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        info!("player died; halting level");
        let host = caller.host();
        host.set_game_speed(caller.settings().death_slowdown);
        host.release_touches();
        caller.store().set(StateKey::CAN_PAUSE_GAME, false);
        caller.store().inform_flag(StateKey::LEVEL_HALTED);
    }
}
