//! Power-ups thrown during combat and the augment bonuses that shape them.

use glam::Vec2;
use lanebound_core::{
    AugmentId, Event, ModifierKind, PowerUpError, PowerUpKind, PresentationCue, UnitId,
};
use tracing::debug;

use crate::{config::seconds, schedule::Task, units::AppliedModifier, World};

impl World {
    pub(crate) fn apply_power_up(
        &mut self,
        kind: PowerUpKind,
        center: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        if !self.combat_input_enabled {
            out_events.push(Event::PowerUpRejected {
                kind,
                reason: PowerUpError::CombatInputDisabled,
            });
            return;
        }
        if kind == PowerUpKind::EnemyGold {
            let limit = self.enemy_gold_limit();
            if self.enemy_gold_uses >= limit {
                out_events.push(Event::PowerUpRejected {
                    kind,
                    reason: PowerUpError::UsesExhausted { limit },
                });
                return;
            }
            self.enemy_gold_uses += 1;
        }

        let team = kind.affected_team();
        let radius = self.config.modifiers.power_up_radius;
        let affected: Vec<UnitId> = self
            .units
            .iter_active()
            .filter(|(_, unit)| {
                unit.team == team && unit.is_alive() && unit.position.distance(center) <= radius
            })
            .map(|(id, _)| id)
            .collect();

        for &unit in &affected {
            match kind.modifier() {
                Some(modifier) => {
                    self.vital_boost(unit, out_events);
                    self.apply_modifier(unit, modifier, out_events);
                }
                None => {
                    if let Some(enemy) = self.units.get_mut(unit) {
                        enemy.gold_primed = true;
                    }
                }
            }
        }

        debug!(?kind, affected = affected.len(), "power-up applied");
        out_events.push(Event::PowerUpApplied {
            kind,
            affected: u32::try_from(affected.len()).unwrap_or(u32::MAX),
        });
    }

    /// Enemy-gold uses allowed in the current wave.
    pub(crate) fn enemy_gold_limit(&self) -> u32 {
        self.config
            .modifiers
            .enemy_gold_uses_per_wave
            .saturating_add(self.augments.stacks(AugmentId::GOLDEN_OPPORTUNITY))
    }

    fn vital_boost(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let stacks = self.augments.stacks(AugmentId::VITAL_BOOST);
        if stacks == 0 {
            return;
        }
        let fraction = self.config.modifiers.vital_boost_heal_fraction * stacks as f32;
        let Some(max_health) = self.units.get(unit).map(|unit| unit.stats.max_health) else {
            return;
        };
        self.heal_unit(unit, max_health as f32 * fraction, out_events);
    }

    /// Resolves the factors and duration of a modifier from tuning and augment stacks.
    fn resolve_modifier(&self, kind: ModifierKind) -> (AppliedModifier, f32) {
        let tuning = &self.config.modifiers;
        let stacks = |augment| self.augments.stacks(augment) as f32;
        let owned = |augment| self.augments.is_purchased(augment);
        match kind {
            ModifierKind::Shield => (
                AppliedModifier::Shield,
                tuning.shield_duration_secs
                    + tuning.shield_bonus_secs_per_stack * stacks(AugmentId::FORTIFIED_SHIELD),
            ),
            ModifierKind::Rush => {
                let factor = if owned(AugmentId::OVERDRIVE_RUSH) {
                    tuning.overdrive_rush_multiplier
                } else {
                    tuning.rush_multiplier
                };
                (AppliedModifier::Rush { factor }, tuning.rush_duration_secs)
            }
            ModifierKind::Haste => (
                AppliedModifier::Haste {
                    factor: tuning.haste_multiplier
                        + tuning.haste_bonus_per_stack * stacks(AugmentId::ENHANCED_HASTE),
                },
                tuning.haste_duration_secs,
            ),
            ModifierKind::Rage => {
                let damage = if owned(AugmentId::BRUTAL_RAGE) {
                    tuning.brutal_rage_damage_multiplier
                } else {
                    tuning.rage_damage_multiplier
                };
                let taken = if owned(AugmentId::CONTROLLED_RAGE) {
                    tuning.controlled_rage_damage_taken_multiplier
                } else {
                    tuning.rage_damage_taken_multiplier
                };
                (
                    AppliedModifier::Rage { damage, taken },
                    tuning.rage_duration_secs,
                )
            }
            ModifierKind::AreaDamage => (
                AppliedModifier::AreaDamage {
                    radius: tuning.area_radius_multiplier
                        * tuning
                            .area_radius_growth_per_stack
                            .powf(stacks(AugmentId::EXPANDED_DESTRUCTION)),
                },
                tuning.area_damage_duration_secs,
            ),
            ModifierKind::LifeSteal => (
                AppliedModifier::LifeSteal {
                    fraction: tuning.life_steal_fraction
                        + tuning.life_steal_bonus_per_stack
                            * stacks(AugmentId::IMPROVED_LIFE_STEAL),
                },
                tuning.life_steal_duration_secs,
            ),
        }
    }

    /// Applies a timed modifier and schedules the expiry that undoes it.
    pub(crate) fn apply_modifier(
        &mut self,
        id: UnitId,
        kind: ModifierKind,
        out_events: &mut Vec<Event>,
    ) {
        let (modifier, duration) = self.resolve_modifier(kind);
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        unit.modifiers.apply(modifier);
        out_events.push(Event::ModifierApplied {
            unit: id,
            modifier: kind,
        });
        out_events.push(Event::PresentationCue {
            cue: PresentationCue::ModifierApplied(kind),
            archetype: unit.archetype,
            position: unit.position,
        });
        self.scheduler.schedule_in(
            seconds(duration),
            Task::ModifierExpiry { unit: id, modifier },
        );
    }

    pub(crate) fn expire_modifier(
        &mut self,
        id: UnitId,
        modifier: AppliedModifier,
        out_events: &mut Vec<Event>,
    ) {
        let Some(unit) = self.units.get_mut(id) else {
            debug!(unit = ?id, "dropping modifier expiry of inactive unit");
            return;
        };
        unit.modifiers.revert(modifier);
        out_events.push(Event::ModifierExpired {
            unit: id,
            modifier: modifier.kind(),
        });
    }
}
