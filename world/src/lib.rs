#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Lanebound.
//!
//! The world owns the unit and projectile pools, the team rosters, the gold
//! balance, augment stacks and the timed-task scheduler. It is mutated only by
//! [`apply`] and observed through [`query`].

pub mod config;

mod combat;
mod phase;
mod pool;
mod powerups;
mod projectiles;
mod roster;
mod schedule;
mod shop;
mod units;

use glam::Vec2;
use lanebound_core::{
    AugmentStacks, Command, Event, Phase, ProjectileKind, UnitId, WaveIndex, WELCOME_BANNER,
};
use tracing::{debug, info};

use crate::{
    combat::Spawn,
    config::MatchConfig,
    pool::EntityPool,
    projectiles::{Projectile, ProjectileId},
    roster::Rosters,
    schedule::Scheduler,
    units::Unit,
};

pub use roster::{RosterSnapshot, SnapshotEntry};

/// Represents the authoritative Lanebound world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: MatchConfig,
    phase: Phase,
    units: EntityPool<lanebound_core::Archetype, Unit, UnitId>,
    projectiles: EntityPool<ProjectileKind, Projectile, ProjectileId>,
    scheduler: Scheduler,
    rosters: Rosters,
    snapshot: Option<RosterSnapshot>,
    gold: u32,
    wave: WaveIndex,
    level: u32,
    augments: AugmentStacks,
    purchasing_enabled: bool,
    combat_input_enabled: bool,
    enemy_gold_uses: u32,
    scene_transition_scheduled: bool,
    tick_index: u64,
}

impl World {
    /// Creates a world in the shopping phase with pools built from the configuration.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        let mut units = EntityPool::new();
        for (archetype, stats) in &config.archetypes {
            units.register(
                *archetype,
                Unit::prefab(*archetype, *stats),
                config.pool.units_per_archetype,
            );
        }

        let mut projectiles = EntityPool::new();
        for kind in ProjectileKind::ALL {
            projectiles.register(
                kind,
                Projectile::prefab(kind),
                config.pool.projectiles_per_kind,
            );
        }

        Self {
            banner: WELCOME_BANNER,
            gold: config.starting_gold,
            config,
            phase: Phase::Shopping,
            units,
            projectiles,
            scheduler: Scheduler::default(),
            rosters: Rosters::default(),
            snapshot: None,
            wave: WaveIndex::new(0),
            level: 0,
            augments: AugmentStacks::default(),
            purchasing_enabled: true,
            combat_input_enabled: false,
            enemy_gold_uses: 0,
            scene_transition_scheduled: false,
            tick_index: 0,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.scheduler.advance(dt);
            world.run_due_tasks(out_events);
            world.advance_units(dt, out_events);
            world.advance_projectiles(dt, out_events);
            if world.phase == Phase::Combat {
                world.evaluate_combat(out_events);
            }
        }
        Command::SetPhase { phase } => world.set_phase(phase, out_events),
        Command::PurchaseUnit {
            archetype,
            position,
        } => world.purchase_unit(archetype, position, out_events),
        Command::SellUnit { unit } => world.sell_unit(unit, out_events),
        Command::UpgradeUnit { unit } => world.upgrade_unit(unit, out_events),
        Command::RepositionUnit { unit, position } => {
            world.reposition_unit(unit, position, out_events)
        }
        Command::SpawnUnit {
            archetype,
            team,
            position,
            facing,
            designated,
            wait_slot,
        } => {
            if world.phase.is_terminal() {
                debug!(archetype = archetype.tag(), "ignoring spawn after match end");
                return;
            }
            let _ = world.spawn_unit(
                Spawn {
                    archetype,
                    team,
                    position,
                    facing,
                    designated,
                    wait_slot,
                },
                out_events,
            );
        }
        Command::AdvanceWaitingFormation { team } => world.shift_formation(team),
        Command::AssignTarget { unit, target } => world.assign_target(unit, target, out_events),
        Command::ApplyPowerUp { kind, center } => world.apply_power_up(kind, center, out_events),
        Command::PurchaseAugment { augment } => {
            if world.phase != Phase::Augmentation {
                debug!(
                    ?augment,
                    phase = ?world.phase,
                    "ignoring augment purchase outside augmentation"
                );
                return;
            }
            let stacks = world.augments.increment(augment);
            info!(?augment, stacks, "augment purchased");
            out_events.push(Event::AugmentPurchased { augment, stacks });
        }
    }
}

/// Read-only state of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Projectile family.
    pub kind: ProjectileKind,
    /// Ground position.
    pub position: Vec2,
    /// Flight direction in radians around the vertical axis.
    pub facing: f32,
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use lanebound_core::{
        Archetype, AugmentStacks, Phase, ProjectileKind, Team, UnitId, UnitSnapshot, UnitView,
        WaveConfig, WaveIndex,
    };

    use super::{ProjectileSnapshot, RosterSnapshot, World};
    use crate::config::MatchConfig;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(world: &World) -> &MatchConfig {
        &world.config
    }

    /// Current match phase.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Current gold balance.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Index of the wave being prepared or fought.
    #[must_use]
    pub fn wave(world: &World) -> WaveIndex {
        world.wave
    }

    /// Configuration of the wave being prepared or fought, if any remain.
    #[must_use]
    pub fn current_wave(world: &World) -> Option<&WaveConfig> {
        world.config.waves.get(world.wave.get() as usize)
    }

    /// Visible level counter, incremented on every augment selection.
    #[must_use]
    pub fn level(world: &World) -> u32 {
        world.level
    }

    /// Purchased augment stacks.
    #[must_use]
    pub fn augments(world: &World) -> &AugmentStacks {
        &world.augments
    }

    /// Reports whether shop commands are currently accepted.
    #[must_use]
    pub fn purchasing_enabled(world: &World) -> bool {
        world.purchasing_enabled
    }

    /// Reports whether power-ups are currently accepted.
    #[must_use]
    pub fn combat_input_enabled(world: &World) -> bool {
        world.combat_input_enabled
    }

    /// Enemy-gold uses left in the current wave.
    #[must_use]
    pub fn enemy_gold_uses_left(world: &World) -> u32 {
        world.enemy_gold_limit().saturating_sub(world.enemy_gold_uses)
    }

    /// Placed friendly units and the cap for the current wave.
    #[must_use]
    pub fn placement(world: &World) -> (u32, u32) {
        let placed = u32::try_from(world.rosters.side(Team::Friendly).len()).unwrap_or(u32::MAX);
        (placed, world.max_placeable_units())
    }

    /// Members of a team's roster in registration order.
    #[must_use]
    pub fn roster(world: &World, team: Team) -> &[UnitId] {
        world.rosters.side(team).members()
    }

    /// Friendly roster captured at the start of the most recent combat.
    #[must_use]
    pub fn roster_snapshot(world: &World) -> Option<&RosterSnapshot> {
        world.snapshot.as_ref()
    }

    /// Captures a read-only view of every active unit.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        let snapshots = world
            .units
            .iter_active()
            .map(|(id, unit)| UnitSnapshot {
                id,
                team: unit.team,
                archetype: unit.archetype,
                state: unit.state,
                position: unit.position,
                facing: unit.facing,
                health: unit.health,
                max_health: unit.stats.max_health,
                target: unit.target,
                attack_range: unit.stats.attack_range,
                wait_slot: unit.wait_slot,
                invulnerable: unit.modifiers.invulnerable,
            })
            .collect();
        UnitView::from_snapshots(snapshots)
    }

    /// Captures every in-flight projectile in slot order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter_active()
            .map(|(_, projectile)| projectile.snapshot())
            .collect()
    }

    /// Number of active unit instances across every archetype.
    #[must_use]
    pub fn active_units(world: &World) -> usize {
        world.units.active_count()
    }

    /// Number of idle pooled instances of an archetype.
    #[must_use]
    pub fn idle_units(world: &World, archetype: Archetype) -> usize {
        world.units.idle_count(archetype)
    }

    /// Number of idle pooled projectiles of a kind.
    #[must_use]
    pub fn idle_projectiles(world: &World, kind: ProjectileKind) -> usize {
        world.projectiles.idle_count(kind)
    }

    /// Reports whether the handle resolves to an active unit.
    #[must_use]
    pub fn is_active(world: &World, unit: UnitId) -> bool {
        world.units.is_live(unit)
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.scheduler.now()
    }

    /// Number of timed tasks waiting in the scheduler.
    #[must_use]
    pub fn pending_tasks(world: &World) -> usize {
        world.scheduler.pending()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
