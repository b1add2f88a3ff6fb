#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that spreads attackers across opposing units.
//!
//! Every unit is scored by how many attackers it already drew this combat
//! (its load) and by its distance to the selecting unit. Load dominates the
//! score, so distance only separates candidates with equal load.

use lanebound_core::{Command, Event, Phase, Team, UnitId, UnitSnapshot, UnitView};
use tracing::debug;

/// Score weight of one unit of load.
pub const LOAD_WEIGHT: f32 = 1000.0;
/// Score weight of one unit of distance.
pub const DISTANCE_WEIGHT: f32 = 1.0;

/// Cumulative number of attackers assigned to each candidate target.
///
/// Loads grow with every proposed assignment and shrink only when the world
/// refuses one. Entries of dead or recycled units stay until the table is
/// next read for a re-seek.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadTable {
    entries: Vec<(UnitId, u32)>,
}

impl LoadTable {
    /// Load recorded for the unit, if it is a candidate.
    #[must_use]
    pub fn load(&self, unit: UnitId) -> Option<u32> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == unit)
            .map(|(_, load)| *load)
    }

    /// Candidates and their loads in table order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, u32)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of candidates in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the table holds no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every recorded load.
    #[must_use]
    pub fn total_load(&self) -> u32 {
        self.entries.iter().map(|(_, load)| *load).sum()
    }

    fn rebuild<'a>(&mut self, candidates: impl Iterator<Item = &'a UnitSnapshot>) {
        self.entries.clear();
        self.entries
            .extend(candidates.map(|snapshot| (snapshot.id, 0)));
    }

    fn purge(&mut self, view: &UnitView) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(unit, _)| view.is_live(*unit));
        before - self.entries.len()
    }

    fn increment(&mut self, unit: UnitId) {
        if let Some((_, load)) = self
            .entries
            .iter_mut()
            .find(|(candidate, _)| *candidate == unit)
        {
            *load = load.saturating_add(1);
        }
    }

    fn decrement(&mut self, unit: UnitId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|(candidate, _)| *candidate == unit)
        {
            Some((_, load)) => {
                *load = load.saturating_sub(1);
                true
            }
            None => false,
        }
    }
}

/// Load-balanced target allocator for both teams.
#[derive(Debug, Default)]
pub struct TargetAllocator {
    friendly_loads: LoadTable,
    enemy_loads: LoadTable,
}

impl TargetAllocator {
    /// Creates an allocator with empty load tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load table of the units belonging to `team`.
    #[must_use]
    pub fn loads(&self, team: Team) -> &LoadTable {
        match team {
            Team::Friendly => &self.friendly_loads,
            Team::Enemy => &self.enemy_loads,
        }
    }

    fn loads_mut(&mut self, team: Team) -> &mut LoadTable {
        match team {
            Team::Friendly => &mut self.friendly_loads,
            Team::Enemy => &mut self.enemy_loads,
        }
    }

    /// Reacts to combat start, target requests and refused assignments.
    ///
    /// Loads are counted when a target is proposed. A refusal from the world
    /// gives the load back.
    pub fn handle(&mut self, events: &[Event], view: &UnitView, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::PhaseChanged {
                    to: Phase::Combat, ..
                } => self.assign_targets(view, out),
                Event::TargetNeeded { unit } => {
                    let Some(selector) = view.get(*unit) else {
                        continue;
                    };
                    match self.new_target(selector, view) {
                        Some(target) => out.push(Command::AssignTarget {
                            unit: *unit,
                            target,
                        }),
                        None => debug!(unit = ?unit, "no live target available"),
                    }
                }
                Event::TargetRejected { unit, target } => {
                    if !self.friendly_loads.decrement(*target) {
                        let _ = self.enemy_loads.decrement(*target);
                    }
                    debug!(unit = ?unit, target = ?target, "released load of refused target");
                }
                _ => {}
            }
        }
    }

    /// Rebuilds both load tables and assigns every live unit, friendly side first.
    pub fn assign_targets(&mut self, view: &UnitView, out: &mut Vec<Command>) {
        self.friendly_loads.rebuild(view.live_team(Team::Friendly));
        self.enemy_loads.rebuild(view.live_team(Team::Enemy));

        for team in [Team::Friendly, Team::Enemy] {
            for selector in view.live_team(team) {
                let table = self.loads_mut(team.opponent());
                if let Some(target) = find_best_target(selector, table, view) {
                    table.increment(target);
                    out.push(Command::AssignTarget {
                        unit: selector.id,
                        target,
                    });
                }
            }
        }
    }

    /// Picks a replacement target after purging stale candidates.
    pub fn new_target(&mut self, selector: &UnitSnapshot, view: &UnitView) -> Option<UnitId> {
        let table = self.loads_mut(selector.team.opponent());
        let purged = table.purge(view);
        if purged > 0 {
            debug!(purged, "purged inactive targets from load table");
        }
        let target = find_best_target(selector, table, view)?;
        table.increment(target);
        Some(target)
    }
}

/// Lowest `load * LOAD_WEIGHT + distance * DISTANCE_WEIGHT` among live candidates.
///
/// Ties keep the candidate met first in table order.
#[must_use]
pub fn find_best_target(
    selector: &UnitSnapshot,
    table: &LoadTable,
    view: &UnitView,
) -> Option<UnitId> {
    let mut best: Option<(UnitId, f32)> = None;
    for (candidate, load) in table.iter() {
        let Some(snapshot) = view.get(candidate) else {
            continue;
        };
        if !view.is_live(candidate) || snapshot.team == selector.team {
            continue;
        }
        let distance = selector.position.distance(snapshot.position);
        let score = load as f32 * LOAD_WEIGHT + distance * DISTANCE_WEIGHT;
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::LoadTable;
    use glam::Vec2;
    use lanebound_core::{
        Archetype, Team, Tier, UnitId, UnitKind, UnitSnapshot, UnitState, UnitView,
    };

    fn snapshot(index: u32, state: UnitState) -> UnitSnapshot {
        UnitSnapshot {
            id: UnitId::new(index, 0),
            team: Team::Enemy,
            archetype: Archetype::new(UnitKind::Scout, Tier::Base),
            state,
            position: Vec2::ZERO,
            facing: 0.0,
            health: 1,
            max_health: 1,
            target: None,
            attack_range: 1.0,
            wait_slot: Vec2::ZERO,
            invulnerable: false,
        }
    }

    #[test]
    fn purge_keeps_live_entries_and_their_loads() {
        let view = UnitView::from_snapshots(vec![
            snapshot(0, UnitState::Engaging),
            snapshot(1, UnitState::Dead),
            snapshot(2, UnitState::Attacking),
        ]);
        let mut table = LoadTable::default();
        table.rebuild(view.iter());
        table.increment(UnitId::new(2, 0));
        table.increment(UnitId::new(2, 0));
        table.increment(UnitId::new(9, 0));

        assert_eq!(table.purge(&view), 1);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![(UnitId::new(0, 0), 0), (UnitId::new(2, 0), 2)]
        );
        assert_eq!(table.total_load(), 2);
    }
}
