//! Match phase controller: transitions, roster snapshot and end-of-combat checks.

use lanebound_core::{Event, MatchOutcome, Phase, Team, UnitState};
use tracing::{debug, info, warn};

use crate::{
    combat::Spawn,
    roster::{RosterSnapshot, SnapshotEntry},
    schedule::Task,
    World,
};

impl World {
    /// Runs `exit(old)` then `enter(new)`.
    ///
    /// Re-entering the current phase and leaving a terminal phase are ignored.
    pub(crate) fn set_phase(&mut self, next: Phase, out_events: &mut Vec<Event>) {
        let current = self.phase;
        if current == next {
            debug!(phase = ?next, "ignoring re-entry of current phase");
            return;
        }
        if current.is_terminal() {
            debug!(phase = ?current, requested = ?next, "match already ended");
            return;
        }

        self.exit_phase(current);
        self.phase = next;
        debug!(from = ?current, to = ?next, "phase changed");
        out_events.push(Event::PhaseChanged {
            from: current,
            to: next,
        });
        self.enter_phase(next, out_events);
    }

    fn exit_phase(&mut self, phase: Phase) {
        match phase {
            Phase::Shopping => self.purchasing_enabled = false,
            Phase::Combat => self.combat_input_enabled = false,
            Phase::Deployment | Phase::Augmentation | Phase::Win | Phase::Lose => {}
        }
    }

    fn enter_phase(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        match phase {
            Phase::Shopping => {
                self.purchasing_enabled = true;
                self.enemy_gold_uses = 0;
                out_events.push(Event::GoldChanged { balance: self.gold });
                self.push_placement_count(out_events);
            }
            Phase::Deployment => {
                self.purchasing_enabled = false;
                match self.config.waves.get(self.wave.get() as usize) {
                    Some(config) => out_events.push(Event::WaveReleased {
                        wave: self.wave,
                        config: *config,
                    }),
                    None => warn!(wave = self.wave.get(), "no wave configured for deployment"),
                }
            }
            Phase::Combat => {
                self.snapshot = Some(self.capture_snapshot());
                for id in self.units.handles() {
                    if let Some(unit) = self.units.get_mut(id) {
                        if unit.state == UnitState::Waiting {
                            unit.state = UnitState::Engaging;
                        }
                    }
                }
                self.combat_input_enabled = true;
            }
            Phase::Augmentation => {
                self.purchasing_enabled = false;
                self.combat_input_enabled = false;
                self.level = self.level.saturating_add(1);
                out_events.push(Event::AugmentSelectionOpened { level: self.level });
            }
            Phase::Win => self.end_match(MatchOutcome::Win, out_events),
            Phase::Lose => self.end_match(MatchOutcome::Lose, out_events),
        }
    }

    fn end_match(&mut self, outcome: MatchOutcome, out_events: &mut Vec<Event>) {
        self.purchasing_enabled = false;
        self.combat_input_enabled = false;
        info!(?outcome, wave = self.wave.get(), "match ended");
        out_events.push(Event::MatchEnded { outcome });
        if self.scene_transition_scheduled {
            return;
        }
        self.scene_transition_scheduled = true;
        let delay = self.config.combat.scene_transition_delay();
        self.scheduler
            .schedule_in(delay, Task::SceneTransition { outcome });
    }

    fn capture_snapshot(&self) -> RosterSnapshot {
        let entries = self
            .rosters
            .side(Team::Friendly)
            .members()
            .iter()
            .filter_map(|id| self.units.get(*id))
            .filter(|unit| unit.is_alive())
            .map(|unit| SnapshotEntry {
                archetype: unit.archetype,
                position: unit.position,
                facing: unit.facing,
                target_position: unit.wait_slot,
            })
            .collect();
        RosterSnapshot { entries }
    }

    /// Purges both rosters, then checks whether either side was wiped out.
    pub(crate) fn evaluate_combat(&mut self, out_events: &mut Vec<Event>) {
        let units = &self.units;
        let purged_friendly = self
            .rosters
            .side_mut(Team::Friendly)
            .purge(|id| units.get(id).map_or(false, |unit| unit.is_alive()));
        let purged_enemy = self
            .rosters
            .side_mut(Team::Enemy)
            .purge(|id| units.get(id).map_or(false, |unit| unit.is_alive()));
        if purged_friendly + purged_enemy > 0 {
            debug!(purged_friendly, purged_enemy, "purged inactive roster entries");
        }

        if self.rosters.side(Team::Enemy).is_empty() {
            self.restore_friendly_roster(out_events);
            self.wave = self.wave.next();
            let remaining = self.config.waves.len() > self.wave.get() as usize;
            info!(cleared = self.wave.get(), remaining, "wave cleared");
            let next = if remaining {
                Phase::Augmentation
            } else {
                Phase::Win
            };
            self.set_phase(next, out_events);
        } else if self.rosters.side(Team::Friendly).is_empty() {
            self.set_phase(Phase::Lose, out_events);
        }
    }

    /// Replaces every friendly unit by a fresh one built from the snapshot.
    pub(crate) fn restore_friendly_roster(&mut self, out_events: &mut Vec<Event>) {
        let Some(snapshot) = self.snapshot.clone() else {
            debug!("no roster snapshot to restore");
            return;
        };

        let current: Vec<_> = self
            .units
            .iter_active()
            .filter(|(_, unit)| unit.team == Team::Friendly)
            .map(|(id, _)| id)
            .collect();
        for id in current {
            let _ = self.remove_unit(id, out_events);
        }

        let mut restored = 0u32;
        for entry in &snapshot.entries {
            let spawned = self.spawn_unit(
                Spawn {
                    archetype: entry.archetype,
                    team: Team::Friendly,
                    position: entry.position,
                    facing: entry.facing,
                    designated: None,
                    wait_slot: entry.target_position,
                },
                out_events,
            );
            if spawned.is_some() {
                restored += 1;
            }
        }
        out_events.push(Event::RosterRestored { units: restored });
    }

    pub(crate) fn push_placement_count(&self, out_events: &mut Vec<Event>) {
        out_events.push(Event::PlacementCountChanged {
            placed: u32::try_from(self.rosters.side(Team::Friendly).len()).unwrap_or(u32::MAX),
            max: self.max_placeable_units(),
        });
    }

    /// Placement cap of the wave being prepared, zero once every wave is spent.
    pub(crate) fn max_placeable_units(&self) -> u32 {
        self.config
            .waves
            .get(self.wave.get() as usize)
            .map_or(0, |wave| wave.max_placeable_units)
    }
}
