//! Loot drops for dying enemies.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Caller;
use crate::host::{EntitySpec, LootItem};
use crate::script::{Action, CallerSlot};
use crate::state::{Point, Value};

/// Optional health reward of a [`LootPackage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthDrop {
    pub min: f64,
    pub max: f64,
    /// Probability in `[0, 1]` that the health orb drops at all.
    pub drop_rate: f64,
}

impl HealthDrop {
    /// Health in `[min, max]`, dropped with probability `drop_rate`
    /// (clamped to `[0, 1]`).
    #[must_use]
    pub fn new(min: f64, max: f64, drop_rate: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            drop_rate: drop_rate.clamp(0.0, 1.0),
        }
    }

    /// `true` when the bounds form a finite, non-empty range.
    #[must_use]
    pub fn is_rollable(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Fixed health amount that always drops.
    #[must_use]
    pub fn always(amount: f64) -> Self {
        Self::new(amount, amount, 1.0)
    }
}

/// Rolled rewards of one drop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Loot {
    pub experience: u64,
    pub health: f64,
}

/// Loot table for one enemy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LootPackage {
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub health: Option<HealthDrop>,
}

impl LootPackage {
    #[must_use]
    pub const fn experience(experience: u64) -> Self {
        Self {
            experience,
            health: None,
        }
    }

    #[must_use]
    pub const fn with_health(mut self, health: HealthDrop) -> Self {
        self.health = Some(health);
        self
    }

    /// Rolls the random parts of the package.
    ///
    /// A health drop with non-finite or inverted bounds never drops.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Loot {
        let health = self.health.map_or(0.0, |drop| {
            if !drop.is_rollable() {
                debug!(?drop, "unusable health drop skipped");
                return 0.0;
            }
            if rng.random::<f64>() < drop.drop_rate {
                rng.random_range(drop.min..=drop.max).round()
            } else {
                0.0
            }
        });
        Loot {
            experience: self.experience,
            health,
        }
    }
}

/// Scatters a [`LootPackage`] around the entity carried as payload.
///
/// Experience is split into orbs of at most
/// `settings.experience_per_orb` each; every orb gets a random position
/// inside the entity's bounds and a random push. Without an entity
/// payload nothing drops.
#[derive(Debug, Clone)]
pub struct DropLoot {
    package: LootPackage,
    caller: CallerSlot,
}

impl DropLoot {
    #[must_use]
    pub fn new(package: LootPackage) -> Self {
        Self {
            package,
            caller: CallerSlot::default(),
        }
    }
}

impl Action for DropLoot {
    fn set_caller(&mut self, caller: &Caller) {
        self.caller.bind(caller);
    }

    fn execute(&self, payload: Option<&Value>) {
        let Some(caller) = self.caller.get() else {
            return;
        };
        let Some(entity) = payload.and_then(Value::as_entity) else {
            debug!("loot drop without entity payload skipped");
            return;
        };

        let settings = caller.settings();
        let mut rng = rand::rng();
        let loot = self.package.roll(&mut rng);
        let per_orb = settings.experience_per_orb.max(1);

        let mut remaining = loot.experience;
        let mut orbs = 0_u32;
        while remaining > 0 {
            let amount = remaining.min(per_orb);
            caller.host().add_entity(EntitySpec::Loot {
                item: LootItem::Experience(amount),
                position: entity.bounds.random_point(&mut rng),
                impulse: random_impulse(&mut rng, settings.loot_impulse),
            });
            remaining -= amount;
            orbs += 1;
        }

        if loot.health > 0.0 {
            caller.host().add_entity(EntitySpec::Loot {
                item: LootItem::Health(loot.health),
                position: entity.bounds.random_point(&mut rng),
                impulse: random_impulse(&mut rng, settings.loot_impulse),
            });
        }

        debug!(
            entity = entity.id,
            experience = loot.experience,
            orbs,
            health = loot.health,
            "loot dropped"
        );
    }

    fn describe(&self) -> String {
        format!("drop loot ({} xp)", self.package.experience)
    }
}

fn random_impulse<R: Rng + ?Sized>(rng: &mut R, strength: f64) -> Point {
    let angle = rng.random_range(0.0..TAU);
    Point::new(angle.cos() * strength, angle.sin() * strength)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::tests::{harness, run};
    use crate::state::EntitySnapshot;

    fn dying_enemy() -> Value {
        Value::Entity(EntitySnapshot::at(7, "basic", Point::new(10.0, 20.0)))
    }

    fn orb_amounts(entities: &[EntitySpec]) -> Vec<u64> {
        entities
            .iter()
            .filter_map(|e| match e {
                EntitySpec::Loot {
                    item: LootItem::Experience(n),
                    ..
                } => Some(*n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_experience_split_into_orbs() {
        let (ctx, host) = harness();
        run(
            DropLoot::new(LootPackage::experience(12)),
            &ctx,
            Some(&dying_enemy()),
        );

        assert_eq!(orb_amounts(&host.entities()), vec![5, 5, 2]);
    }

    #[test]
    fn test_orbs_land_inside_entity_bounds() {
        let (ctx, host) = harness();
        let enemy = dying_enemy();
        run(DropLoot::new(LootPackage::experience(50)), &ctx, Some(&enemy));

        let bounds = enemy.as_entity().map(|e| e.bounds).unwrap_or_default();
        for entity in host.entities() {
            if let EntitySpec::Loot { position, .. } = entity {
                assert!(bounds.contains(position), "{position:?} outside {bounds:?}");
            }
        }
    }

    #[test]
    fn test_no_payload_drops_nothing() {
        let (ctx, host) = harness();
        run(DropLoot::new(LootPackage::experience(10)), &ctx, None);
        run(
            DropLoot::new(LootPackage::experience(10)),
            &ctx,
            Some(&Value::Int(1)),
        );
        assert!(host.entities().is_empty());
    }

    #[test]
    fn test_guaranteed_health_drop() {
        let (ctx, host) = harness();
        let package = LootPackage::experience(0).with_health(HealthDrop::always(25.0));
        run(DropLoot::new(package), &ctx, Some(&dying_enemy()));

        let entities = host.entities();
        assert_eq!(entities.len(), 1);
        assert!(matches!(
            entities[0],
            EntitySpec::Loot {
                item: LootItem::Health(h),
                ..
            } if (h - 25.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_drop_rate_clamped() {
        let never = HealthDrop::new(1.0, 5.0, -3.0);
        assert!(never.drop_rate.abs() < f64::EPSILON);
        let always = HealthDrop::new(5.0, 1.0, 7.0);
        assert!((always.drop_rate - 1.0).abs() < f64::EPSILON);
        assert!(always.min <= always.max);

        let mut rng = rand::rng();
        for _ in 0..50 {
            let loot = LootPackage::default().with_health(never).roll(&mut rng);
            assert!(loot.health.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_unusable_health_bounds_drop_nothing() {
        let (ctx, host) = harness();
        let drops = [
            HealthDrop::new(f64::NAN, 5.0, 1.0),
            HealthDrop::new(1.0, f64::INFINITY, 1.0),
            HealthDrop {
                min: 9.0,
                max: 3.0,
                drop_rate: 1.0,
            },
        ];
        for drop in drops {
            assert!(!drop.is_rollable());
            let package = LootPackage::experience(0).with_health(drop);
            run(DropLoot::new(package), &ctx, Some(&dying_enemy()));
        }
        assert!(host.entities().is_empty());
    }
}
