//! Between-wave roster management: purchase, sell, upgrade and reposition.

use glam::Vec2;
use lanebound_core::{Archetype, Event, ShopError, Team, UnitId};
use tracing::debug;

use crate::{combat::Spawn, World};

impl World {
    pub(crate) fn purchase_unit(
        &mut self,
        archetype: Archetype,
        position: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let result = self.try_purchase(archetype, position, out_events);
        self.settle(result, out_events);
    }

    fn try_purchase(
        &mut self,
        archetype: Archetype,
        position: Vec2,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ShopError> {
        self.ensure_shopping()?;
        let max = self.max_placeable_units();
        if self.rosters.side(Team::Friendly).len() >= max as usize {
            return Err(ShopError::RosterFull { max });
        }
        let price = self
            .config
            .stats(archetype)
            .map(|stats| stats.price)
            .ok_or(ShopError::UnknownArchetype(archetype))?;
        self.ensure_gold(price)?;

        let _ = self
            .spawn_unit(
                Spawn {
                    archetype,
                    team: Team::Friendly,
                    position,
                    facing: 0.0,
                    designated: None,
                    wait_slot: position,
                },
                out_events,
            )
            .ok_or(ShopError::UnknownArchetype(archetype))?;
        self.spend(price, out_events);
        Ok(())
    }

    pub(crate) fn sell_unit(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let result = self.try_sell(unit, out_events);
        self.settle(result, out_events);
    }

    fn try_sell(&mut self, unit: UnitId, out_events: &mut Vec<Event>) -> Result<(), ShopError> {
        self.ensure_shopping()?;
        let refund = self.friendly_unit(unit)?.stats.gold_value;
        if !self.remove_unit(unit, out_events) {
            return Err(ShopError::UnknownUnit);
        }
        self.gold = self.gold.saturating_add(refund);
        out_events.push(Event::GoldChanged { balance: self.gold });
        Ok(())
    }

    pub(crate) fn upgrade_unit(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let result = self.try_upgrade(unit, out_events);
        self.settle(result, out_events);
    }

    fn try_upgrade(&mut self, id: UnitId, out_events: &mut Vec<Event>) -> Result<(), ShopError> {
        self.ensure_shopping()?;
        let unit = self.friendly_unit(id)?;
        let upgraded = unit.archetype.upgraded().ok_or(ShopError::NotUpgradeable)?;
        let cost = unit.stats.upgrade_cost;
        let (position, facing, wait_slot) = (unit.position, unit.facing, unit.wait_slot);
        if self.config.stats(upgraded).is_none() {
            return Err(ShopError::UnknownArchetype(upgraded));
        }
        self.ensure_gold(cost)?;

        if !self.remove_unit(id, out_events) {
            return Err(ShopError::UnknownUnit);
        }
        let _ = self
            .spawn_unit(
                Spawn {
                    archetype: upgraded,
                    team: Team::Friendly,
                    position,
                    facing,
                    designated: None,
                    wait_slot,
                },
                out_events,
            )
            .ok_or(ShopError::UnknownArchetype(upgraded))?;
        self.spend(cost, out_events);
        Ok(())
    }

    pub(crate) fn reposition_unit(
        &mut self,
        unit: UnitId,
        position: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let result = self.try_reposition(unit, position);
        self.settle(result, out_events);
    }

    fn try_reposition(&mut self, id: UnitId, position: Vec2) -> Result<(), ShopError> {
        self.ensure_shopping()?;
        let _ = self.friendly_unit(id)?;
        if let Some(unit) = self.units.get_mut(id) {
            unit.position = position;
            unit.wait_slot = position;
        }
        Ok(())
    }

    fn ensure_shopping(&self) -> Result<(), ShopError> {
        if self.purchasing_enabled {
            Ok(())
        } else {
            Err(ShopError::InvalidPhase)
        }
    }

    fn ensure_gold(&self, required: u32) -> Result<(), ShopError> {
        if self.gold >= required {
            Ok(())
        } else {
            Err(ShopError::InsufficientGold {
                required,
                available: self.gold,
            })
        }
    }

    fn friendly_unit(&self, id: UnitId) -> Result<&crate::units::Unit, ShopError> {
        self.units
            .get(id)
            .filter(|unit| unit.team == Team::Friendly && unit.is_alive())
            .filter(|_| self.rosters.side(Team::Friendly).contains(id))
            .ok_or(ShopError::UnknownUnit)
    }

    fn spend(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        self.gold -= amount;
        out_events.push(Event::GoldChanged { balance: self.gold });
    }

    fn settle(&self, result: Result<(), ShopError>, out_events: &mut Vec<Event>) {
        match result {
            Ok(()) => self.push_placement_count(out_events),
            Err(reason) => {
                debug!(%reason, "shop request rejected");
                out_events.push(Event::ShopRejected { reason });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::MatchConfig, World};
    use glam::Vec2;
    use lanebound_core::{Archetype, Event, ShopError, Team, Tier, TierCounts, UnitKind, WaveConfig};

    fn shop_world(gold: u32, max: u32) -> World {
        let config = MatchConfig {
            starting_gold: gold,
            waves: vec![WaveConfig {
                viking: TierCounts::new(1, 0),
                max_placeable_units: max,
                ..WaveConfig::default()
            }],
            ..MatchConfig::default()
        };
        World::new(config)
    }

    fn viking() -> Archetype {
        Archetype::new(UnitKind::Viking, Tier::Base)
    }

    fn spawned(events: &[Event]) -> Option<lanebound_core::UnitId> {
        events.iter().rev().find_map(|event| match event {
            Event::UnitSpawned { unit, .. } => Some(*unit),
            _ => None,
        })
    }

    #[test]
    fn purchase_spends_gold_and_registers_unit() {
        let mut world = shop_world(10, 3);
        let mut events = Vec::new();
        world.purchase_unit(viking(), Vec2::new(1.0, -4.0), &mut events);

        assert_eq!(world.gold, 7);
        assert_eq!(world.rosters.side(Team::Friendly).len(), 1);
        assert!(events.contains(&Event::PlacementCountChanged { placed: 1, max: 3 }));
    }

    #[test]
    fn purchase_respects_roster_cap() {
        let mut world = shop_world(100, 1);
        let mut events = Vec::new();
        world.purchase_unit(viking(), Vec2::ZERO, &mut events);
        world.purchase_unit(viking(), Vec2::X, &mut events);

        assert_eq!(
            events.last(),
            Some(&Event::ShopRejected {
                reason: ShopError::RosterFull { max: 1 }
            })
        );
        assert_eq!(world.gold, 97);
    }

    #[test]
    fn purchase_without_gold_changes_nothing() {
        let mut world = shop_world(2, 3);
        let mut events = Vec::new();
        world.purchase_unit(viking(), Vec2::ZERO, &mut events);

        assert_eq!(
            events,
            vec![Event::ShopRejected {
                reason: ShopError::InsufficientGold {
                    required: 3,
                    available: 2
                }
            }]
        );
        assert!(world.rosters.side(Team::Friendly).is_empty());
    }

    #[test]
    fn sell_refunds_gold_value() {
        let mut world = shop_world(10, 3);
        let mut events = Vec::new();
        world.purchase_unit(viking(), Vec2::ZERO, &mut events);
        let unit = spawned(&events).expect("spawned");

        world.sell_unit(unit, &mut events);
        assert_eq!(world.gold, 10);
        assert!(world.rosters.side(Team::Friendly).is_empty());

        world.sell_unit(unit, &mut events);
        assert_eq!(
            events.last(),
            Some(&Event::ShopRejected {
                reason: ShopError::UnknownUnit
            })
        );
    }

    #[test]
    fn upgrade_replaces_unit_in_place() {
        let mut world = shop_world(10, 3);
        let mut events = Vec::new();
        world.purchase_unit(viking(), Vec2::new(2.0, -3.0), &mut events);
        let unit = spawned(&events).expect("spawned");

        world.upgrade_unit(unit, &mut events);
        let upgraded = spawned(&events).expect("respawned");
        assert_ne!(upgraded, unit);
        let fresh = world.units.get(upgraded).expect("live");
        assert_eq!(fresh.archetype.tier(), Tier::Upgraded);
        assert_eq!(fresh.position, Vec2::new(2.0, -3.0));
        assert_eq!(world.gold, 4);
        assert_eq!(world.rosters.side(Team::Friendly).len(), 1);

        world.upgrade_unit(upgraded, &mut events);
        assert_eq!(
            events.last(),
            Some(&Event::ShopRejected {
                reason: ShopError::NotUpgradeable
            })
        );
    }

    #[test]
    fn shop_is_closed_outside_shopping() {
        let mut world = shop_world(10, 3);
        let mut events = Vec::new();
        world.set_phase(lanebound_core::Phase::Deployment, &mut events);
        events.clear();

        world.purchase_unit(viking(), Vec2::ZERO, &mut events);
        assert_eq!(
            events,
            vec![Event::ShopRejected {
                reason: ShopError::InvalidPhase
            }]
        );
    }
}
