//! Per-tick unit state machine, attack sequences, damage and death.

use std::time::Duration;

use glam::Vec2;
use lanebound_core::{Archetype, Event, Phase, PresentationCue, Team, UnitId, UnitState};
use tracing::debug;

use crate::{projectiles::Payload, schedule::Task, World};

/// Placement of a unit taken from the pool.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Spawn {
    pub(crate) archetype: Archetype,
    pub(crate) team: Team,
    pub(crate) position: Vec2,
    pub(crate) facing: f32,
    pub(crate) designated: Option<Vec2>,
    pub(crate) wait_slot: Vec2,
}

impl World {
    /// Acquires, places and registers a unit.
    ///
    /// Units with somewhere to walk start in `Deploying`, the rest in `Waiting`.
    pub(crate) fn spawn_unit(
        &mut self,
        spawn: Spawn,
        out_events: &mut Vec<Event>,
    ) -> Option<UnitId> {
        let id = self
            .units
            .acquire(spawn.archetype, spawn.position, spawn.facing)?;
        if let Some(unit) = self.units.get_mut(id) {
            unit.team = spawn.team;
            unit.designated = spawn.designated;
            unit.wait_slot = spawn.wait_slot;
            unit.state = if spawn.designated.is_some() || spawn.position != spawn.wait_slot {
                UnitState::Deploying
            } else {
                UnitState::Waiting
            };
        }
        let _ = self.rosters.side_mut(spawn.team).register(id);
        out_events.push(Event::UnitSpawned {
            unit: id,
            archetype: spawn.archetype,
            team: spawn.team,
            position: spawn.position,
        });
        Some(id)
    }

    /// Takes a unit off the field without the death path.
    pub(crate) fn remove_unit(&mut self, id: UnitId, out_events: &mut Vec<Event>) -> bool {
        let Some((archetype, team)) = self.units.get(id).map(|unit| (unit.archetype, unit.team))
        else {
            return false;
        };
        let _ = self.rosters.side_mut(team).unregister(id);
        if !self.units.release(id, archetype) {
            return false;
        }
        out_events.push(Event::UnitRemoved { unit: id, team });
        true
    }

    pub(crate) fn advance_units(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.phase.is_terminal() {
            return;
        }
        let seconds = dt.as_secs_f32();
        for id in self.units.handles() {
            let Some(state) = self.units.get(id).map(|unit| unit.state) else {
                continue;
            };
            match state {
                UnitState::Deploying => self.advance_deployment(id, seconds, out_events),
                UnitState::Waiting => self.hold_wait_slot(id, seconds, out_events),
                UnitState::Engaging => self.advance_engagement(id, seconds, out_events),
                UnitState::Attacking | UnitState::Dead => {}
            }
        }
    }

    fn advance_deployment(&mut self, id: UnitId, seconds: f32, out_events: &mut Vec<Event>) {
        let speed = self.config.combat.deployment_speed;
        let stride = self.config.combat.walk_stride;
        let settled = if self.phase == Phase::Combat {
            UnitState::Engaging
        } else {
            UnitState::Waiting
        };
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };

        let goal = unit.designated.unwrap_or(unit.wait_slot);
        let (moved, arrived) = unit.step_toward(goal, speed * seconds);
        if arrived && unit.designated.take().is_none() {
            unit.state = settled;
        }
        if unit.accumulate_stride(moved, stride) {
            out_events.push(Event::PresentationCue {
                cue: PresentationCue::WalkStep,
                archetype: unit.archetype,
                position: unit.position,
            });
        }
    }

    fn hold_wait_slot(&mut self, id: UnitId, seconds: f32, out_events: &mut Vec<Event>) {
        let stride = self.config.combat.walk_stride;
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        if unit.position == unit.wait_slot || unit.modifiers.movement_locked {
            return;
        }
        let speed = unit.stats.move_speed * unit.modifiers.move_multiplier;
        let (moved, _) = unit.step_toward(unit.wait_slot, speed * seconds);
        if unit.accumulate_stride(moved, stride) {
            out_events.push(Event::PresentationCue {
                cue: PresentationCue::WalkStep,
                archetype: unit.archetype,
                position: unit.position,
            });
        }
    }

    fn advance_engagement(&mut self, id: UnitId, seconds: f32, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Combat {
            return;
        }
        let now = self.scheduler.now();
        let stride = self.config.combat.walk_stride;
        let attack_duration = self.config.combat.attack_duration();

        let target_position = self.live_opponent_of(id).map(|(_, position)| position);
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        let Some(target_position) = target_position else {
            unit.target = None;
            out_events.push(Event::TargetNeeded { unit: id });
            return;
        };

        let distance = unit.position.distance(target_position);
        let range = unit.stats.attack_range;
        if distance > range {
            if unit.modifiers.movement_locked || unit.busy {
                return;
            }
            let speed = unit.stats.move_speed * unit.modifiers.move_multiplier;
            let (moved, _) =
                unit.step_toward(target_position, (speed * seconds).min(distance - range));
            if unit.accumulate_stride(moved, stride) {
                out_events.push(Event::PresentationCue {
                    cue: PresentationCue::WalkStep,
                    archetype: unit.archetype,
                    position: unit.position,
                });
            }
            return;
        }

        unit.face(target_position);
        let interval = unit
            .stats
            .attack_interval(unit.modifiers.attack_speed_multiplier);
        let ready = unit
            .last_attack_at
            .map_or(true, |last| now.saturating_sub(last) >= interval);
        if !ready || unit.busy {
            return;
        }

        unit.state = UnitState::Attacking;
        unit.busy = true;
        unit.last_attack_at = Some(now);
        out_events.push(Event::PresentationCue {
            cue: PresentationCue::AttackStarted,
            archetype: unit.archetype,
            position: unit.position,
        });
        self.scheduler
            .schedule_in(attack_duration / 2, Task::AttackMidpoint { unit: id });
        self.scheduler
            .schedule_in(attack_duration, Task::AttackEnd { unit: id });
    }

    /// Current target of the unit if it is alive and on the opposing team.
    fn live_opponent_of(&self, id: UnitId) -> Option<(UnitId, Vec2)> {
        let unit = self.units.get(id)?;
        let target = unit.target?;
        self.units
            .get(target)
            .filter(|other| other.is_alive() && other.team != unit.team)
            .map(|other| (target, other.position))
    }

    /// Runs every scheduled task whose due time has been reached.
    pub(crate) fn run_due_tasks(&mut self, out_events: &mut Vec<Event>) {
        while let Some(task) = self.scheduler.pop_due() {
            match task {
                Task::AttackMidpoint { unit } => self.resolve_attack(unit, out_events),
                Task::AttackEnd { unit } => self.finish_attack(unit),
                Task::ModifierExpiry { unit, modifier } => {
                    self.expire_modifier(unit, modifier, out_events)
                }
                Task::SceneTransition { outcome } => {
                    out_events.push(Event::SceneTransitionRequested { outcome })
                }
            }
        }
    }

    fn resolve_attack(&mut self, id: UnitId, out_events: &mut Vec<Event>) {
        let Some(attacker) = self
            .units
            .get(id)
            .filter(|unit| unit.state == UnitState::Attacking)
        else {
            debug!(unit = ?id, "dropping attack of inactive unit");
            return;
        };
        let archetype = attacker.archetype;
        let team = attacker.team;
        let origin = attacker.position;
        let damage = attacker.stats.base_damage * attacker.modifiers.damage_multiplier;
        let area_radius = attacker
            .modifiers
            .area_damage
            .then(|| attacker.stats.area_radius * attacker.modifiers.area_radius_multiplier);
        let life_steal = attacker.modifiers.life_steal;
        let projectile = attacker.stats.projectile;

        let Some((target, target_position)) = self.live_opponent_of(id) else {
            debug!(unit = ?id, "target gone before the attack landed");
            return;
        };

        let dispatched = match projectile {
            Some(stats) => {
                let launched = self.launch_projectile(
                    stats.kind,
                    stats.speed,
                    origin,
                    target,
                    Payload {
                        source: archetype,
                        team,
                        damage,
                        area_radius,
                    },
                );
                if launched {
                    out_events.push(Event::PresentationCue {
                        cue: PresentationCue::ProjectileLaunched,
                        archetype,
                        position: origin,
                    });
                }
                launched
            }
            None => {
                match area_radius {
                    Some(radius) => {
                        self.splash_damage(team, target_position, radius, damage, out_events)
                    }
                    None => self.deal_damage(target, damage, out_events),
                }
                true
            }
        };

        if dispatched {
            if let Some(fraction) = life_steal {
                self.heal_unit(id, damage * fraction, out_events);
            }
        }
        out_events.push(Event::PresentationCue {
            cue: PresentationCue::AttackLanded,
            archetype,
            position: origin,
        });
    }

    fn finish_attack(&mut self, id: UnitId) {
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        unit.busy = false;
        if unit.state == UnitState::Attacking {
            unit.state = UnitState::Engaging;
        }
    }

    /// Applies one hit of damage to a single unit.
    pub(crate) fn deal_damage(&mut self, target: UnitId, amount: f32, out_events: &mut Vec<Event>) {
        let Some(taken) = self
            .units
            .get_mut(target)
            .and_then(|unit| unit.take_damage(amount))
        else {
            return;
        };
        out_events.push(Event::DamageApplied {
            unit: target,
            amount: taken.amount,
            remaining: taken.remaining,
        });
        if taken.lethal {
            let _ = self.kill_unit(target, out_events);
        }
    }

    /// Damages every living opponent of `team` within `radius` of `center`.
    pub(crate) fn splash_damage(
        &mut self,
        team: Team,
        center: Vec2,
        radius: f32,
        amount: f32,
        out_events: &mut Vec<Event>,
    ) {
        let victims: Vec<UnitId> = self
            .units
            .iter_active()
            .filter(|(_, unit)| {
                unit.team == team.opponent()
                    && unit.is_alive()
                    && unit.position.distance(center) <= radius
            })
            .map(|(id, _)| id)
            .collect();
        for victim in victims {
            self.deal_damage(victim, amount, out_events);
        }
    }

    pub(crate) fn heal_unit(&mut self, id: UnitId, amount: f32, out_events: &mut Vec<Event>) {
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        let gained = unit.heal(amount);
        if gained > 0 {
            out_events.push(Event::UnitHealed {
                unit: id,
                amount: gained,
                health: unit.health,
            });
        }
    }

    /// Runs the death path once: reward, unregister, release.
    ///
    /// Returns `false` for units that are already dead or no longer pooled.
    pub(crate) fn kill_unit(&mut self, id: UnitId, out_events: &mut Vec<Event>) -> bool {
        let bonus = self.config.modifiers.enemy_gold_bonus;
        let Some(unit) = self.units.get_mut(id) else {
            debug!(unit = ?id, "ignoring death of inactive unit");
            return false;
        };
        if !unit.mark_dead() {
            debug!(unit = ?id, "ignoring repeated death");
            return false;
        }
        let archetype = unit.archetype;
        let team = unit.team;
        let position = unit.position;
        let reward = match team {
            Team::Enemy if unit.gold_primed => unit.stats.gold_value.saturating_add(bonus),
            Team::Enemy => unit.stats.gold_value,
            Team::Friendly => 0,
        };

        if reward > 0 {
            self.gold = self.gold.saturating_add(reward);
            out_events.push(Event::GoldChanged { balance: self.gold });
        }
        let _ = self.rosters.side_mut(team).unregister(id);
        out_events.push(Event::UnitDied {
            unit: id,
            archetype,
            team,
            position,
        });
        out_events.push(Event::PresentationCue {
            cue: PresentationCue::Death,
            archetype,
            position,
        });
        let _ = self.units.release(id, archetype);
        true
    }

    /// Accepts a target when both units are alive and on opposing teams.
    pub(crate) fn assign_target(
        &mut self,
        id: UnitId,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) {
        let Some(target_team) = self
            .units
            .get(target)
            .filter(|unit| unit.is_alive())
            .map(|unit| unit.team)
        else {
            debug!(unit = ?id, target = ?target, "rejecting inactive target");
            out_events.push(Event::TargetRejected { unit: id, target });
            return;
        };
        let Some(unit) = self.units.get_mut(id).filter(|unit| unit.is_alive()) else {
            debug!(unit = ?id, "rejecting target for inactive unit");
            out_events.push(Event::TargetRejected { unit: id, target });
            return;
        };
        if unit.team == target_team {
            debug!(unit = ?id, target = ?target, "rejecting friendly target");
            out_events.push(Event::TargetRejected { unit: id, target });
            return;
        }
        unit.target = Some(target);
        out_events.push(Event::TargetAssigned { unit: id, target });
    }

    /// Moves the wait slots of the team's deploying and waiting units one row back.
    pub(crate) fn shift_formation(&mut self, team: Team) {
        let step = match team {
            Team::Enemy => self.config.layout.formation_row_step,
            Team::Friendly => -self.config.layout.formation_row_step,
        };
        for id in self.units.handles() {
            if let Some(unit) = self.units.get_mut(id) {
                if unit.team == team
                    && matches!(unit.state, UnitState::Deploying | UnitState::Waiting)
                {
                    unit.wait_slot += step;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Spawn;
    use crate::{config::MatchConfig, World};
    use glam::Vec2;
    use lanebound_core::{Archetype, Event, Team, Tier, UnitKind};

    fn spawn(world: &mut World, team: Team, position: Vec2) -> lanebound_core::UnitId {
        let mut events = Vec::new();
        world
            .spawn_unit(
                Spawn {
                    archetype: Archetype::new(UnitKind::Viking, Tier::Base),
                    team,
                    position,
                    facing: 0.0,
                    designated: None,
                    wait_slot: position,
                },
                &mut events,
            )
            .expect("registered archetype")
    }

    #[test]
    fn death_path_is_idempotent() {
        let mut world = World::new(MatchConfig::default());
        let enemy = spawn(&mut world, Team::Enemy, Vec2::ZERO);
        let gold_before = world.gold;
        let idle_before = world
            .units
            .idle_count(Archetype::new(UnitKind::Viking, Tier::Base));

        let mut events = Vec::new();
        assert!(world.kill_unit(enemy, &mut events));
        assert!(!world.kill_unit(enemy, &mut events));

        let reward = world.gold - gold_before;
        assert_eq!(reward, 3);
        assert_eq!(
            world
                .units
                .idle_count(Archetype::new(UnitKind::Viking, Tier::Base)),
            idle_before + 1
        );
        let deaths = events
            .iter()
            .filter(|event| matches!(event, Event::UnitDied { .. }))
            .count();
        assert_eq!(deaths, 1);
        assert!(world.rosters.side(Team::Enemy).is_empty());
    }

    #[test]
    fn primed_enemy_pays_bonus_gold() {
        let mut world = World::new(MatchConfig::default());
        let enemy = spawn(&mut world, Team::Enemy, Vec2::ZERO);
        world.units.get_mut(enemy).expect("live").gold_primed = true;
        let gold_before = world.gold;

        let mut events = Vec::new();
        assert!(world.kill_unit(enemy, &mut events));
        assert_eq!(world.gold - gold_before, 3 + 5);
    }

    #[test]
    fn friendly_target_is_rejected() {
        let mut world = World::new(MatchConfig::default());
        let first = spawn(&mut world, Team::Friendly, Vec2::ZERO);
        let second = spawn(&mut world, Team::Friendly, Vec2::X);
        let enemy = spawn(&mut world, Team::Enemy, Vec2::Y);

        let mut events = Vec::new();
        world.assign_target(first, second, &mut events);
        assert_eq!(
            events,
            vec![Event::TargetRejected {
                unit: first,
                target: second
            }]
        );

        events.clear();
        world.assign_target(first, enemy, &mut events);
        assert_eq!(
            events,
            vec![Event::TargetAssigned {
                unit: first,
                target: enemy
            }]
        );
    }

    #[test]
    fn splash_only_hits_opponents_in_radius() {
        let mut world = World::new(MatchConfig::default());
        let near = spawn(&mut world, Team::Enemy, Vec2::new(1.0, 0.0));
        let far = spawn(&mut world, Team::Enemy, Vec2::new(10.0, 0.0));
        let ally = spawn(&mut world, Team::Friendly, Vec2::ZERO);

        let mut events = Vec::new();
        world.splash_damage(Team::Friendly, Vec2::ZERO, 2.0, 5.0, &mut events);

        let hit: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::DamageApplied { unit, .. } => Some(*unit),
                _ => None,
            })
            .collect();
        assert_eq!(hit, vec![near]);
        assert!(!hit.contains(&far));
        assert!(!hit.contains(&ally));
    }
}
