//! Team rosters and the pre-combat snapshot of the friendly roster.

use glam::Vec2;
use lanebound_core::{Archetype, Team, UnitId};
use serde::{Deserialize, Serialize};

/// Ordered membership of one team.
#[derive(Debug, Default)]
pub(crate) struct Roster {
    members: Vec<UnitId>,
}

impl Roster {
    /// Appends the unit unless it is already a member.
    pub(crate) fn register(&mut self, unit: UnitId) -> bool {
        if self.members.contains(&unit) {
            return false;
        }
        self.members.push(unit);
        true
    }

    pub(crate) fn unregister(&mut self, unit: UnitId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != unit);
        self.members.len() != before
    }

    /// Drops every member rejected by `is_live`, keeping order.
    pub(crate) fn purge(&mut self, mut is_live: impl FnMut(UnitId) -> bool) -> usize {
        let before = self.members.len();
        self.members.retain(|member| is_live(*member));
        before - self.members.len()
    }

    pub(crate) fn contains(&self, unit: UnitId) -> bool {
        self.members.contains(&unit)
    }

    pub(crate) fn members(&self) -> &[UnitId] {
        &self.members
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Friendly and enemy rosters.
#[derive(Debug, Default)]
pub(crate) struct Rosters {
    friendly: Roster,
    enemy: Roster,
}

impl Rosters {
    pub(crate) fn side(&self, team: Team) -> &Roster {
        match team {
            Team::Friendly => &self.friendly,
            Team::Enemy => &self.enemy,
        }
    }

    pub(crate) fn side_mut(&mut self, team: Team) -> &mut Roster {
        match team {
            Team::Friendly => &mut self.friendly,
            Team::Enemy => &mut self.enemy,
        }
    }
}

/// Recorded state of one friendly unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Archetype to re-acquire from the pool.
    pub archetype: Archetype,
    /// Position at combat start.
    pub position: Vec2,
    /// Facing at combat start.
    pub facing: f32,
    /// Position the unit returns to outside combat.
    pub target_position: Vec2,
}

/// Friendly roster composition captured when combat starts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// Entries in roster order.
    pub entries: Vec<SnapshotEntry>,
}

impl RosterSnapshot {
    /// Number of recorded units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no unit was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Roster;
    use lanebound_core::UnitId;

    #[test]
    fn register_rejects_duplicates() {
        let mut roster = Roster::default();
        assert!(roster.register(UnitId::new(0, 0)));
        assert!(!roster.register(UnitId::new(0, 0)));
        assert!(roster.register(UnitId::new(0, 1)));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn purge_keeps_order_of_survivors() {
        let mut roster = Roster::default();
        for index in 0..4 {
            let _ = roster.register(UnitId::new(index, 0));
        }
        let removed = roster.purge(|unit| unit.index() % 2 == 1);
        assert_eq!(removed, 2);
        assert_eq!(roster.members(), &[UnitId::new(1, 0), UnitId::new(3, 0)]);
        assert!(!roster.unregister(UnitId::new(0, 0)));
    }
}
