//! Deterministic pump that wires the world to its systems.

use std::time::Duration;

use lanebound_core::{Command, Event, MatchOutcome, Team};
use lanebound_system_rewards::RewardSelector;
use lanebound_system_spawning::{Config as SpawnerConfig, WaveSpawner};
use lanebound_system_targeting::TargetAllocator;
use lanebound_world::{self as world, config::MatchConfig, query, World};
use tracing::info;

use crate::autoplay::Autoplayer;

/// Summary of a finished or abandoned run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MatchReport {
    pub(crate) outcome: Option<MatchOutcome>,
    pub(crate) ticks: u64,
    pub(crate) waves_cleared: u32,
    pub(crate) gold: u32,
    pub(crate) enemies_defeated: u32,
    pub(crate) units_lost: u32,
    pub(crate) augments: Vec<(&'static str, u32)>,
}

/// World, systems and scripted player driven in lockstep.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    spawner: WaveSpawner,
    allocator: TargetAllocator,
    rewards: RewardSelector,
    player: Autoplayer,
    outcome: Option<MatchOutcome>,
    enemies_defeated: u32,
    units_lost: u32,
}

impl Simulation {
    pub(crate) fn new(config: MatchConfig, seed: u64) -> Self {
        let spawner = WaveSpawner::new(SpawnerConfig::with_layout(config.layout));
        Self {
            world: World::new(config),
            spawner,
            allocator: TargetAllocator::new(),
            rewards: RewardSelector::new(seed),
            player: Autoplayer::new(seed.wrapping_add(1)),
            outcome: None,
            enemies_defeated: 0,
            units_lost: 0,
        }
    }

    pub(crate) fn welcome_banner(&self) -> &'static str {
        query::welcome_banner(&self.world)
    }

    /// Plays from the opening shop until the scene transition or the tick limit.
    pub(crate) fn run(&mut self, dt: Duration, max_ticks: u64) -> MatchReport {
        let _ = self.start();
        let mut ticks = 0;
        while self.outcome.is_none() && ticks < max_ticks {
            let _ = self.step(dt);
            ticks += 1;
        }
        self.report(ticks)
    }

    /// Lets the scripted player spend the starting gold.
    pub(crate) fn start(&mut self) -> Vec<Event> {
        let mut opening = Vec::new();
        self.player.shop(&self.world, &mut opening);
        self.execute(opening)
    }

    /// Advances the match by one tick.
    pub(crate) fn step(&mut self, dt: Duration) -> Vec<Event> {
        self.execute(vec![Command::Tick { dt }])
    }

    /// Applies commands and feeds the produced events through every system
    /// until no further commands are issued.
    fn execute(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut pending = commands;
        let mut produced = Vec::new();

        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            let mut offers = Vec::new();
            self.rewards.handle(&events, &mut offers);
            events.extend(offers);

            self.spawner.handle(&events, &mut pending);
            let view = query::unit_view(&self.world);
            self.allocator.handle(&events, &view, &mut pending);
            self.player
                .handle(&events, &self.world, &mut self.rewards, &mut pending);

            self.observe(&events);
            produced.extend(events);
        }

        produced
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::UnitDied { team, .. } => match team {
                    Team::Enemy => self.enemies_defeated += 1,
                    Team::Friendly => self.units_lost += 1,
                },
                Event::MatchEnded { outcome } => info!(outcome = ?outcome, "match ended"),
                Event::SceneTransitionRequested { outcome } => self.outcome = Some(*outcome),
                _ => {}
            }
        }
    }

    fn report(&self, ticks: u64) -> MatchReport {
        let augments = query::augments(&self.world)
            .iter()
            .filter_map(|(augment, stacks)| {
                self.rewards
                    .definition(augment)
                    .map(|definition| (definition.title, stacks))
            })
            .collect();
        MatchReport {
            outcome: self.outcome,
            ticks,
            waves_cleared: query::wave(&self.world).get(),
            gold: query::gold(&self.world),
            enemies_defeated: self.enemies_defeated,
            units_lost: self.units_lost,
            augments,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lanebound_core::{Event, MatchOutcome, Phase, TierCounts, WaveConfig};
    use lanebound_world::{config::MatchConfig, query};

    use super::Simulation;

    const TICK: Duration = Duration::from_millis(50);
    const MAX_TICKS: u64 = 20_000;

    fn record(seed: u64) -> Vec<Event> {
        let mut simulation = Simulation::new(MatchConfig::default(), seed);
        let mut log = simulation.start();
        for _ in 0..MAX_TICKS {
            let events = simulation.step(TICK);
            let finished = events
                .iter()
                .any(|event| matches!(event, Event::SceneTransitionRequested { .. }));
            log.extend(events);
            if finished {
                break;
            }
        }
        log
    }

    #[test]
    fn default_match_reaches_an_outcome() {
        let mut simulation = Simulation::new(MatchConfig::default(), 3);
        let report = simulation.run(TICK, MAX_TICKS);

        let outcome = report.outcome.expect("match decided");
        assert!(query::phase(&simulation.world).is_terminal());
        assert_eq!(query::phase(&simulation.world), outcome.phase());
        if outcome == MatchOutcome::Win {
            assert_eq!(report.waves_cleared, 4);
        }
        assert!(report.enemies_defeated > 0 || report.units_lost > 0);
    }

    #[test]
    fn identical_seeds_replay_identical_event_streams() {
        let first = record(17);
        let second = record(17);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn cleared_wave_offers_augments_and_returns_to_shopping() {
        let config = MatchConfig {
            waves: vec![
                WaveConfig {
                    scout: TierCounts::new(1, 0),
                    max_placeable_units: 3,
                    ..WaveConfig::default()
                },
                WaveConfig {
                    scout: TierCounts::new(1, 0),
                    max_placeable_units: 3,
                    ..WaveConfig::default()
                },
            ],
            ..MatchConfig::default()
        };
        let mut simulation = Simulation::new(config, 8);
        let mut log = simulation.start();
        for _ in 0..MAX_TICKS {
            if query::wave(&simulation.world).get() > 0 || simulation.outcome.is_some() {
                break;
            }
            log.extend(simulation.step(TICK));
        }

        assert!(log
            .iter()
            .any(|event| matches!(event, Event::AugmentsOffered { offers } if offers.len() == 3)));
        assert!(log.iter().any(|event| matches!(
            event,
            Event::PhaseChanged {
                from: Phase::Augmentation,
                to: Phase::Shopping
            }
        )));
        assert_eq!(query::level(&simulation.world), 1);
        let stacks: u32 = query::augments(&simulation.world)
            .iter()
            .map(|(_, stacks)| stacks)
            .sum();
        assert_eq!(stacks, 1);
    }
}
