//! Pooled homing projectiles launched by ranged units.

use std::time::Duration;

use glam::Vec2;
use lanebound_core::{Archetype, Event, PresentationCue, ProjectileKind, Team, UnitId};
use tracing::debug;

use crate::{
    pool::{PoolHandle, Poolable},
    ProjectileSnapshot, World,
};

/// Generational handle to a projectile slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ProjectileId {
    index: u32,
    generation: u32,
}

impl PoolHandle for ProjectileId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    fn slot(&self) -> u32 {
        self.index
    }

    fn generation(&self) -> u32 {
        self.generation
    }
}

/// Attack payload carried from the attacker's midpoint to the impact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Payload {
    pub(crate) source: Archetype,
    pub(crate) team: Team,
    pub(crate) damage: f32,
    pub(crate) area_radius: Option<f32>,
}

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    kind: ProjectileKind,
    position: Vec2,
    facing: f32,
    speed: f32,
    target: Option<UnitId>,
    payload: Option<Payload>,
}

impl Poolable for Projectile {
    fn place(&mut self, position: Vec2, facing: f32) {
        self.position = position;
        self.facing = facing;
    }
}

impl Projectile {
    pub(crate) fn prefab(kind: ProjectileKind) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            facing: 0.0,
            speed: 0.0,
            target: None,
            payload: None,
        }
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            kind: self.kind,
            position: self.position,
            facing: self.facing,
        }
    }
}

enum Flight {
    Lost,
    Airborne,
    Arrived { target: UnitId, payload: Payload, at: Vec2 },
}

impl World {
    /// Acquires a projectile aimed at `target`. Returns `false` when none is available.
    pub(crate) fn launch_projectile(
        &mut self,
        kind: ProjectileKind,
        speed: f32,
        origin: Vec2,
        target: UnitId,
        payload: Payload,
    ) -> bool {
        let Some(handle) = self.projectiles.acquire(kind, origin, 0.0) else {
            return false;
        };
        let target_position = self.units.get(target).map(|unit| unit.position);
        if let Some(projectile) = self.projectiles.get_mut(handle) {
            projectile.speed = speed;
            projectile.target = Some(target);
            projectile.payload = Some(payload);
            if let Some(point) = target_position {
                let delta = point - origin;
                projectile.facing = delta.x.atan2(delta.y);
            }
        }
        true
    }

    /// Moves every projectile toward its target and resolves impacts.
    pub(crate) fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for handle in self.projectiles.handles() {
            match self.fly(handle, dt) {
                Flight::Airborne => {}
                Flight::Lost => {
                    debug!("projectile lost its target");
                    self.release_projectile(handle);
                }
                Flight::Arrived {
                    target,
                    payload,
                    at,
                } => {
                    out_events.push(Event::PresentationCue {
                        cue: PresentationCue::ProjectileImpact,
                        archetype: payload.source,
                        position: at,
                    });
                    match payload.area_radius {
                        Some(radius) => {
                            self.splash_damage(payload.team, at, radius, payload.damage, out_events)
                        }
                        None => self.deal_damage(target, payload.damage, out_events),
                    }
                    self.release_projectile(handle);
                }
            }
        }
    }

    fn fly(&mut self, handle: ProjectileId, dt: Duration) -> Flight {
        let Some(target) = self.projectiles.get(handle).and_then(|shot| shot.target) else {
            return Flight::Lost;
        };
        let Some(goal) = self
            .units
            .get(target)
            .filter(|unit| unit.is_alive())
            .map(|unit| unit.position)
        else {
            return Flight::Lost;
        };
        let Some(projectile) = self.projectiles.get_mut(handle) else {
            return Flight::Lost;
        };
        let Some(payload) = projectile.payload else {
            return Flight::Lost;
        };

        let delta = goal - projectile.position;
        let distance = delta.length();
        let step = projectile.speed * dt.as_secs_f32();
        if distance <= step {
            projectile.position = goal;
            return Flight::Arrived {
                target,
                payload,
                at: goal,
            };
        }
        projectile.facing = delta.x.atan2(delta.y);
        projectile.position += delta / distance * step;
        Flight::Airborne
    }

    fn release_projectile(&mut self, handle: ProjectileId) {
        let Some(kind) = self.projectiles.get(handle).map(|shot| shot.kind) else {
            return;
        };
        let _ = self.projectiles.release(handle, kind);
    }
}
