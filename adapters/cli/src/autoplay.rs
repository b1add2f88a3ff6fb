//! Scripted player that shops, buffs and picks augments on its own.

use glam::Vec2;
use lanebound_core::{
    Archetype, Command, Event, LaneLayout, Phase, PowerUpKind, Team, Tier, UnitKind,
};
use lanebound_system_rewards::RewardSelector;
use lanebound_world::{query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Purchase order repeated across shopping phases.
const ROTATION: [UnitKind; 5] = [
    UnitKind::Viking,
    UnitKind::Archer,
    UnitKind::Viking,
    UnitKind::Wizard,
    UnitKind::Giant,
];

/// Friendly buff cast at the start of each combat, by combat index.
const BUFFS: [PowerUpKind; 6] = [
    PowerUpKind::Rage,
    PowerUpKind::Haste,
    PowerUpKind::Shield,
    PowerUpKind::LifeSteal,
    PowerUpKind::AreaDamage,
    PowerUpKind::Rush,
];

#[derive(Debug)]
pub(crate) struct Autoplayer {
    rng: ChaCha8Rng,
    purchases: usize,
    combats: usize,
}

impl Autoplayer {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            purchases: 0,
            combats: 0,
        }
    }

    pub(crate) fn handle(
        &mut self,
        events: &[Event],
        world: &World,
        rewards: &mut RewardSelector,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::PhaseChanged {
                    to: Phase::Shopping,
                    ..
                } => self.shop(world, out),
                Event::PhaseChanged {
                    to: Phase::Combat, ..
                } => self.cast_power_ups(world, out),
                Event::AugmentsOffered { offers } => self.pick_augment(offers, rewards, out),
                _ => {}
            }
        }
    }

    /// Fills the roster with the gold at hand, upgrades what it can afford
    /// and starts the deployment.
    pub(crate) fn shop(&mut self, world: &World, out: &mut Vec<Command>) {
        let config = query::config(world);
        let (placed, max) = query::placement(world);
        let mut budget = query::gold(world);

        for slot in placed..max {
            let archetype = Archetype::new(ROTATION[self.purchases % ROTATION.len()], Tier::Base);
            let Some(price) = config.stats(archetype).map(|stats| stats.price) else {
                break;
            };
            if price > budget {
                break;
            }
            budget -= price;
            self.purchases += 1;
            out.push(Command::PurchaseUnit {
                archetype,
                position: formation_slot(&config.layout, slot, max),
            });
        }

        let view = query::unit_view(world);
        for unit in view.live_team(Team::Friendly) {
            if unit.archetype.tier() != Tier::Base {
                continue;
            }
            let Some(cost) = config
                .stats(unit.archetype)
                .map(|stats| stats.upgrade_cost)
            else {
                continue;
            };
            if cost <= budget {
                budget -= cost;
                out.push(Command::UpgradeUnit { unit: unit.id });
            }
        }

        debug!(purchases = self.purchases, gold_left = budget, "shopping done");
        out.push(Command::SetPhase {
            phase: Phase::Deployment,
        });
    }

    fn cast_power_ups(&mut self, world: &World, out: &mut Vec<Command>) {
        let layout = query::config(world).layout;
        out.push(Command::ApplyPowerUp {
            kind: BUFFS[self.combats % BUFFS.len()],
            center: layout.friendly_rally_point,
        });
        for _ in 0..query::enemy_gold_uses_left(world) {
            out.push(Command::ApplyPowerUp {
                kind: PowerUpKind::EnemyGold,
                center: layout.enemy_wait_point,
            });
        }
        self.combats += 1;
    }

    fn pick_augment(
        &mut self,
        offers: &[lanebound_core::AugmentId],
        rewards: &mut RewardSelector,
        out: &mut Vec<Command>,
    ) {
        if offers.is_empty() {
            out.push(Command::SetPhase {
                phase: Phase::Shopping,
            });
            return;
        }
        let choice = offers[self.rng.gen_range(0..offers.len())];
        if let Err(error) = rewards.choose(choice, out) {
            warn!(%error, "augment choice rejected");
        }
    }
}

/// Spot `slot` of a row of `total` units centred on the rally point.
fn formation_slot(layout: &LaneLayout, slot: u32, total: u32) -> Vec2 {
    let offset = slot as f32 - (total.saturating_sub(1)) as f32 / 2.0;
    layout.friendly_rally_point + Vec2::new(offset * layout.slot_spacing, 0.0)
}

#[cfg(test)]
mod tests {
    use super::formation_slot;
    use glam::Vec2;
    use lanebound_core::LaneLayout;

    #[test]
    fn formation_is_centred_on_the_rally_point() {
        let layout = LaneLayout::default();
        let left = formation_slot(&layout, 0, 3);
        let middle = formation_slot(&layout, 1, 3);
        let right = formation_slot(&layout, 2, 3);
        assert_eq!(middle, layout.friendly_rally_point);
        assert_eq!(left + right, 2.0 * layout.friendly_rally_point);
        assert_eq!(right - left, Vec2::new(2.0 * layout.slot_spacing, 0.0));
    }
}
