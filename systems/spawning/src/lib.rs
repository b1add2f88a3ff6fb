#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner that releases enemy groups in staggered batches.
//!
//! When the world announces a released wave the spawner compiles it into a
//! [`WavePlan`]: an ordered list of spawn orders, formation shifts and pauses.
//! Simulated time reported through [`Event::TimeAdvanced`] pays for the pauses;
//! every step that becomes due is emitted as a command. The last step hands
//! the match over to combat. A wave without units compiles to an empty plan
//! and leaves the phase alone.

use std::{collections::VecDeque, f32::consts::PI, time::Duration};

use glam::Vec2;
use lanebound_core::{
    Archetype, Command, Event, LaneLayout, Phase, Team, Tier, UnitKind, WaveConfig,
};
use tracing::{debug, info};

const HEAVY_BATCH_SIZE: u32 = 1;
const BATCH_SIZE: u32 = 3;

/// Configuration parameters required to construct the wave spawner.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    layout: LaneLayout,
    group_pause: Duration,
    batch_interval: Duration,
    unit_interval: Duration,
}

impl Config {
    /// Creates a configuration with explicit stagger timings.
    #[must_use]
    pub const fn new(
        layout: LaneLayout,
        group_pause: Duration,
        batch_interval: Duration,
        unit_interval: Duration,
    ) -> Self {
        Self {
            layout,
            group_pause,
            batch_interval,
            unit_interval,
        }
    }

    /// Creates a configuration with the default stagger timings.
    #[must_use]
    pub const fn with_layout(layout: LaneLayout) -> Self {
        Self::new(
            layout,
            Duration::from_millis(250),
            Duration::from_millis(250),
            Duration::from_millis(200),
        )
    }
}

/// Single unit release described by a wave plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnOrder {
    /// Archetype to spawn.
    pub archetype: Archetype,
    /// Slot the unit settles into inside the waiting formation.
    pub wait_slot: Vec2,
}

/// Step of a compiled wave plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaveStep {
    /// Release one unit.
    Spawn(SpawnOrder),
    /// Push the enemy waiting formation one row back.
    ShiftFormation,
    /// Wait before running the next step.
    Pause(Duration),
    /// Every unit was released; start combat.
    Finish,
}

/// Ordered spawn schedule compiled from a wave configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct WavePlan {
    steps: VecDeque<WaveStep>,
    batches: Vec<u32>,
    group_pauses: u32,
}

impl WavePlan {
    /// Compiles the wave into steps, groups in priority order, base tier first.
    ///
    /// Empty groups contribute neither spawns nor pauses. A wave with no units
    /// yields a plan without steps, not even the hand-over to combat.
    #[must_use]
    pub fn build(wave: &WaveConfig, config: &Config) -> Self {
        let mut plan = Self {
            steps: VecDeque::new(),
            batches: Vec::new(),
            group_pauses: 0,
        };

        let mut first_group = true;
        for (kind, counts) in wave.groups() {
            let total = counts.total();
            if total == 0 {
                continue;
            }
            if !first_group {
                plan.steps.push_back(WaveStep::ShiftFormation);
                plan.steps.push_back(WaveStep::Pause(config.group_pause));
                plan.group_pauses += 1;
            }
            first_group = false;

            let tiers = std::iter::repeat(Tier::Base)
                .take(counts.base as usize)
                .chain(std::iter::repeat(Tier::Upgraded).take(counts.upgraded as usize));
            let batch_size = if kind.is_heavy() {
                HEAVY_BATCH_SIZE
            } else {
                BATCH_SIZE
            };
            plan.push_group(kind, tiers, total, batch_size, config);
        }

        if !plan.steps.is_empty() {
            plan.steps.push_back(WaveStep::Finish);
        }
        plan
    }

    fn push_group(
        &mut self,
        kind: UnitKind,
        tiers: impl Iterator<Item = Tier>,
        total: u32,
        batch_size: u32,
        config: &Config,
    ) {
        for (index, tier) in (0u32..).zip(tiers) {
            let position_in_batch = index % batch_size;
            if position_in_batch == 0 {
                if index > 0 {
                    self.steps.push_back(WaveStep::Pause(config.batch_interval));
                }
                self.batches.push(0);
            } else {
                self.steps.push_back(WaveStep::Pause(config.unit_interval));
            }
            if let Some(batch) = self.batches.last_mut() {
                *batch += 1;
            }
            self.steps.push_back(WaveStep::Spawn(SpawnOrder {
                archetype: Archetype::new(kind, tier),
                wait_slot: config.layout.wait_slot(index, total),
            }));
        }
    }

    /// Remaining steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &WaveStep> {
        self.steps.iter()
    }

    /// Number of units in each batch, in release order.
    #[must_use]
    pub fn batch_sizes(&self) -> &[u32] {
        &self.batches
    }

    /// Number of pauses inserted between non-empty groups.
    #[must_use]
    pub fn group_pauses(&self) -> u32 {
        self.group_pauses
    }

    /// Reports whether the plan has nothing left to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of units the plan releases.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, WaveStep::Spawn(_)))
            .count()
    }
}

/// Pure system that releases enemy waves onto the field.
#[derive(Debug)]
pub struct WaveSpawner {
    config: Config,
    plan: Option<WavePlan>,
    banked: Duration,
}

impl WaveSpawner {
    /// Creates a new spawner using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            plan: None,
            banked: Duration::ZERO,
        }
    }

    /// Reports whether a wave is still being released.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.plan.is_some()
    }

    /// Consumes world events and emits the spawn commands that became due.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::WaveReleased { wave, config } => {
                    let plan = WavePlan::build(config, &self.config);
                    self.banked = Duration::ZERO;
                    if plan.is_empty() {
                        debug!(wave = wave.get(), "wave has no units to release");
                        self.plan = None;
                        continue;
                    }
                    info!(
                        wave = wave.get(),
                        units = plan.spawn_count(),
                        "releasing wave"
                    );
                    self.plan = Some(plan);
                }
                Event::PhaseChanged {
                    from: Phase::Deployment,
                    ..
                } => {
                    if self.plan.take().is_some() {
                        debug!("deployment ended before the wave was fully released");
                    }
                    self.banked = Duration::ZERO;
                }
                Event::TimeAdvanced { dt } => {
                    if self.plan.is_some() {
                        self.banked = self.banked.saturating_add(*dt);
                    }
                }
                _ => {}
            }
        }

        self.release_due_steps(out);
    }

    fn release_due_steps(&mut self, out: &mut Vec<Command>) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };

        while let Some(step) = plan.steps.front().copied() {
            match step {
                WaveStep::Pause(pause) => {
                    if self.banked < pause {
                        return;
                    }
                    self.banked -= pause;
                }
                WaveStep::Spawn(order) => out.push(Command::SpawnUnit {
                    archetype: order.archetype,
                    team: Team::Enemy,
                    position: self.config.layout.enemy_spawn_point,
                    facing: PI,
                    designated: Some(self.config.layout.enemy_designated_point),
                    wait_slot: order.wait_slot,
                }),
                WaveStep::ShiftFormation => {
                    out.push(Command::AdvanceWaitingFormation { team: Team::Enemy })
                }
                WaveStep::Finish => out.push(Command::SetPhase {
                    phase: Phase::Combat,
                }),
            }
            let _ = plan.steps.pop_front();
        }

        self.plan = None;
        self.banked = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, WavePlan, WaveStep};
    use lanebound_core::{LaneLayout, TierCounts, WaveConfig};

    #[test]
    fn empty_wave_compiles_to_no_steps() {
        let plan = WavePlan::build(
            &WaveConfig::default(),
            &Config::with_layout(LaneLayout::default()),
        );
        assert!(plan.is_empty());
        assert_eq!(plan.steps().count(), 0);
        assert!(plan.batch_sizes().is_empty());
    }

    #[test]
    fn upgraded_units_follow_base_units_in_a_group() {
        let wave = WaveConfig {
            viking: TierCounts::new(1, 1),
            ..WaveConfig::default()
        };
        let plan = WavePlan::build(&wave, &Config::with_layout(LaneLayout::default()));
        let tags: Vec<_> = plan
            .steps()
            .filter_map(|step| match step {
                WaveStep::Spawn(order) => Some(order.archetype.tag()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["Viking", "Viking_lvl2"]);
    }
}
