//! Per-unit combat state and timed modifier bookkeeping.

use glam::Vec2;
use lanebound_core::{Archetype, ModifierKind, Team, UnitId, UnitState};

use crate::{config::ArchetypeStats, pool::PoolHandle, pool::Poolable};

impl PoolHandle for UnitId {
    fn from_parts(index: u32, generation: u32) -> Self {
        UnitId::new(index, generation)
    }

    fn slot(&self) -> u32 {
        self.index()
    }

    fn generation(&self) -> u32 {
        UnitId::generation(self)
    }
}

/// Exact factors a modifier applied, stored so its expiry can undo them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum AppliedModifier {
    Shield,
    Rush { factor: f32 },
    Haste { factor: f32 },
    Rage { damage: f32, taken: f32 },
    AreaDamage { radius: f32 },
    LifeSteal { fraction: f32 },
}

impl AppliedModifier {
    pub(crate) const fn kind(&self) -> ModifierKind {
        match self {
            Self::Shield => ModifierKind::Shield,
            Self::Rush { .. } => ModifierKind::Rush,
            Self::Haste { .. } => ModifierKind::Haste,
            Self::Rage { .. } => ModifierKind::Rage,
            Self::AreaDamage { .. } => ModifierKind::AreaDamage,
            Self::LifeSteal { .. } => ModifierKind::LifeSteal,
        }
    }
}

/// Flags and multipliers altered by timed modifiers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Modifiers {
    pub(crate) invulnerable: bool,
    pub(crate) movement_locked: bool,
    pub(crate) move_multiplier: f32,
    pub(crate) attack_speed_multiplier: f32,
    pub(crate) damage_multiplier: f32,
    pub(crate) damage_taken_multiplier: f32,
    pub(crate) area_damage: bool,
    pub(crate) area_radius_multiplier: f32,
    pub(crate) life_steal: Option<f32>,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            invulnerable: false,
            movement_locked: false,
            move_multiplier: 1.0,
            attack_speed_multiplier: 1.0,
            damage_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
            area_damage: false,
            area_radius_multiplier: 1.0,
            life_steal: None,
        }
    }
}

impl Modifiers {
    /// Multiplies factors in and raises flags. Reapplication compounds.
    pub(crate) fn apply(&mut self, modifier: AppliedModifier) {
        match modifier {
            AppliedModifier::Shield => {
                self.invulnerable = true;
                self.movement_locked = true;
            }
            AppliedModifier::Rush { factor } => self.move_multiplier *= factor,
            AppliedModifier::Haste { factor } => self.attack_speed_multiplier *= factor,
            AppliedModifier::Rage { damage, taken } => {
                self.damage_multiplier *= damage;
                self.damage_taken_multiplier *= taken;
            }
            AppliedModifier::AreaDamage { radius } => {
                self.area_damage = true;
                self.area_radius_multiplier *= radius;
            }
            AppliedModifier::LifeSteal { fraction } => self.life_steal = Some(fraction),
        }
    }

    /// Divides out exactly the factors `apply` multiplied in and drops flags.
    pub(crate) fn revert(&mut self, modifier: AppliedModifier) {
        match modifier {
            AppliedModifier::Shield => {
                self.invulnerable = false;
                self.movement_locked = false;
            }
            AppliedModifier::Rush { factor } => divide(&mut self.move_multiplier, factor),
            AppliedModifier::Haste { factor } => {
                divide(&mut self.attack_speed_multiplier, factor)
            }
            AppliedModifier::Rage { damage, taken } => {
                divide(&mut self.damage_multiplier, damage);
                divide(&mut self.damage_taken_multiplier, taken);
            }
            AppliedModifier::AreaDamage { radius } => {
                self.area_damage = false;
                divide(&mut self.area_radius_multiplier, radius);
            }
            AppliedModifier::LifeSteal { .. } => self.life_steal = None,
        }
    }
}

fn divide(value: &mut f32, factor: f32) {
    if factor > 0.0 {
        *value /= factor;
    }
}

/// Result of a damage application that was not ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DamageTaken {
    pub(crate) amount: i32,
    pub(crate) remaining: i32,
    pub(crate) lethal: bool,
}

/// Combat entity stored in the unit pool.
#[derive(Clone, Debug)]
pub(crate) struct Unit {
    pub(crate) archetype: Archetype,
    pub(crate) stats: ArchetypeStats,
    pub(crate) team: Team,
    pub(crate) health: i32,
    pub(crate) position: Vec2,
    pub(crate) facing: f32,
    pub(crate) state: UnitState,
    pub(crate) target: Option<UnitId>,
    pub(crate) designated: Option<Vec2>,
    pub(crate) wait_slot: Vec2,
    pub(crate) modifiers: Modifiers,
    pub(crate) busy: bool,
    pub(crate) last_attack_at: Option<std::time::Duration>,
    pub(crate) stride: f32,
    pub(crate) gold_primed: bool,
}

impl Poolable for Unit {
    fn place(&mut self, position: Vec2, facing: f32) {
        self.position = position;
        self.facing = facing;
        self.wait_slot = position;
    }
}

impl Unit {
    /// Fresh, full-health template for an archetype.
    pub(crate) fn prefab(archetype: Archetype, stats: ArchetypeStats) -> Self {
        Self {
            archetype,
            stats,
            team: Team::Friendly,
            health: stats.max_health,
            position: Vec2::ZERO,
            facing: 0.0,
            state: UnitState::Waiting,
            target: None,
            designated: None,
            wait_slot: Vec2::ZERO,
            modifiers: Modifiers::default(),
            busy: false,
            last_attack_at: None,
            stride: 0.0,
            gold_primed: false,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state != UnitState::Dead
    }

    /// Subtracts damage scaled by the damage-taken multiplier.
    ///
    /// Dead and invulnerable units ignore the hit.
    pub(crate) fn take_damage(&mut self, amount: f32) -> Option<DamageTaken> {
        if !self.is_alive() || self.modifiers.invulnerable {
            return None;
        }
        let scaled = (amount * self.modifiers.damage_taken_multiplier).round() as i32;
        self.health = self.health.saturating_sub(scaled).clamp(0, self.stats.max_health);
        Some(DamageTaken {
            amount: scaled,
            remaining: self.health,
            lethal: self.health <= 0,
        })
    }

    /// Restores rounded health clamped at max health; returns the amount gained.
    pub(crate) fn heal(&mut self, amount: f32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.health;
        let gained = amount.round() as i32;
        self.health = self.health.saturating_add(gained).clamp(0, self.stats.max_health);
        self.health - before
    }

    /// Moves the unit into `Dead`; only the first call reports `true`.
    pub(crate) fn mark_dead(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state = UnitState::Dead;
        self.health = 0;
        self.busy = false;
        self.target = None;
        true
    }

    /// Walks toward `goal` by at most `max_step` and faces the walking direction.
    ///
    /// Returns the distance covered and whether the goal was reached.
    pub(crate) fn step_toward(&mut self, goal: Vec2, max_step: f32) -> (f32, bool) {
        let delta = goal - self.position;
        let distance = delta.length();
        if distance <= max_step || distance <= f32::EPSILON {
            self.position = goal;
            return (distance, true);
        }
        self.face(goal);
        self.position += delta / distance * max_step;
        (max_step, false)
    }

    /// Turns toward a point on the ground plane.
    pub(crate) fn face(&mut self, point: Vec2) {
        let delta = point - self.position;
        if delta.length_squared() > f32::EPSILON {
            self.facing = delta.x.atan2(delta.y);
        }
    }

    /// Adds walked distance and reports whether a full stride was completed.
    pub(crate) fn accumulate_stride(&mut self, distance: f32, stride: f32) -> bool {
        self.stride += distance;
        if stride > 0.0 && self.stride >= stride {
            self.stride %= stride;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppliedModifier, Unit};
    use crate::config::MatchConfig;
    use glam::Vec2;
    use lanebound_core::{Archetype, Tier, UnitKind, UnitState};

    fn viking() -> Unit {
        let archetype = Archetype::new(UnitKind::Viking, Tier::Base);
        let mut stats = *MatchConfig::default()
            .stats(archetype)
            .expect("default stats");
        stats.max_health = 100;
        Unit::prefab(archetype, stats)
    }

    #[test]
    fn damage_is_scaled_rounded_and_clamped() {
        let mut unit = viking();
        unit.modifiers.apply(AppliedModifier::Rage {
            damage: 2.0,
            taken: 1.5,
        });
        let taken = unit.take_damage(5.0).expect("applied");
        assert_eq!(taken.amount, 8);
        assert_eq!(taken.remaining, 92);

        let lethal = unit.take_damage(500.0).expect("applied");
        assert_eq!(lethal.remaining, 0);
        assert!(lethal.lethal);
    }

    #[test]
    fn shield_blocks_damage_until_it_expires() {
        let mut unit = viking();
        unit.modifiers.apply(AppliedModifier::Shield);
        assert!(unit.take_damage(50.0).is_none());
        assert!(unit.modifiers.movement_locked);

        unit.modifiers.revert(AppliedModifier::Shield);
        assert_eq!(unit.take_damage(50.0).map(|taken| taken.remaining), Some(50));
    }

    #[test]
    fn heal_is_clamped_to_max_health() {
        let mut unit = viking();
        let _ = unit.take_damage(10.0);
        assert_eq!(unit.heal(7.4), 7);
        assert_eq!(unit.heal(40.0), 3);
        assert_eq!(unit.health, 100);
    }

    #[test]
    fn stacked_multipliers_unwind_to_identity() {
        let mut unit = viking();
        let first = AppliedModifier::Haste { factor: 1.5 };
        let second = AppliedModifier::Haste { factor: 2.0 };
        unit.modifiers.apply(first);
        unit.modifiers.apply(second);
        assert!((unit.modifiers.attack_speed_multiplier - 3.0).abs() < 1e-6);

        unit.modifiers.revert(first);
        unit.modifiers.revert(second);
        assert!((unit.modifiers.attack_speed_multiplier - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mark_dead_reports_only_the_first_transition() {
        let mut unit = viking();
        assert!(unit.mark_dead());
        assert!(!unit.mark_dead());
        assert_eq!(unit.state, UnitState::Dead);
        assert!(unit.take_damage(1.0).is_none());
    }

    #[test]
    fn step_toward_stops_on_goal() {
        let mut unit = viking();
        let (moved, arrived) = unit.step_toward(Vec2::new(0.0, 3.0), 2.0);
        assert!(!arrived);
        assert!((moved - 2.0).abs() < 1e-6);
        let (_, arrived) = unit.step_toward(Vec2::new(0.0, 3.0), 2.0);
        assert!(arrived);
        assert_eq!(unit.position, Vec2::new(0.0, 3.0));
    }
}
