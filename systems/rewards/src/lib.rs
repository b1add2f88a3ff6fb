#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reward selector that offers augments between waves.
//!
//! The selector owns the augment catalog and a seeded random source. When the
//! world opens an augment selection it draws weighted offers from the augments
//! that may still be bought; the player's choice is validated here and turned
//! into world commands. Stack counts mirror the world's purchases so that
//! non-repeatable augments disappear from later offers.

use lanebound_core::{AugmentId, AugmentStacks, Command, Event, Phase};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

/// Number of augments presented each time a selection opens.
pub const OFFER_COUNT: usize = 3;

/// Static description of one augment.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentDefinition {
    /// Identifier referenced by purchases and stack lookups.
    pub id: AugmentId,
    /// Short display title.
    pub title: &'static str,
    /// Display text describing the effect of one stack.
    pub description: &'static str,
    /// Relative selection weight.
    pub weight: f32,
    /// Whether the augment may be bought more than once.
    pub repeatable: bool,
}

/// Catalog of augments known to the default match rules.
#[must_use]
pub fn default_catalog() -> Vec<AugmentDefinition> {
    vec![
        AugmentDefinition {
            id: AugmentId::VITAL_BOOST,
            title: "Vital Boost",
            description: "Power-ups heal affected units by 10% of their max health.",
            weight: 5.0,
            repeatable: true,
        },
        AugmentDefinition {
            id: AugmentId::ENHANCED_HASTE,
            title: "Enhanced Haste",
            description: "Haste grants +0.5 attack speed multiplier.",
            weight: 15.0,
            repeatable: true,
        },
        AugmentDefinition {
            id: AugmentId::FORTIFIED_SHIELD,
            title: "Fortified Shield",
            description: "Shield lasts 0.5 seconds longer.",
            weight: 15.0,
            repeatable: true,
        },
        AugmentDefinition {
            id: AugmentId::OVERDRIVE_RUSH,
            title: "Overdrive Rush",
            description: "Rush triples movement speed.",
            weight: 5.0,
            repeatable: false,
        },
        AugmentDefinition {
            id: AugmentId::CONTROLLED_RAGE,
            title: "Controlled Rage",
            description: "Raging units only take 25% damage.",
            weight: 5.0,
            repeatable: false,
        },
        AugmentDefinition {
            id: AugmentId::BRUTAL_RAGE,
            title: "Brutal Rage",
            description: "Rage multiplies damage by 2.5.",
            weight: 5.0,
            repeatable: false,
        },
        AugmentDefinition {
            id: AugmentId::GOLDEN_OPPORTUNITY,
            title: "Golden Opportunity",
            description: "Enemy Gold can be used one more time per wave.",
            weight: 20.0,
            repeatable: true,
        },
        AugmentDefinition {
            id: AugmentId::EXPANDED_DESTRUCTION,
            title: "Expanded Destruction",
            description: "Area damage radius grows by 20%.",
            weight: 15.0,
            repeatable: true,
        },
        AugmentDefinition {
            id: AugmentId::IMPROVED_LIFE_STEAL,
            title: "Improved Life Steal",
            description: "Life steal returns 5% more of the damage dealt.",
            weight: 15.0,
            repeatable: true,
        },
    ]
}

/// Errors raised when the player picks an augment.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RewardError {
    /// No selection is currently open.
    #[error("no augment selection is open")]
    SelectionClosed,
    /// The chosen augment is not among the current offers.
    #[error("augment {0:?} was not offered")]
    NotOffered(AugmentId),
}

/// Weighted-random augment offer system.
#[derive(Debug)]
pub struct RewardSelector {
    catalog: Vec<AugmentDefinition>,
    stacks: AugmentStacks,
    offers: Vec<AugmentId>,
    rng: ChaCha8Rng,
}

impl RewardSelector {
    /// Creates a selector over the default catalog.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_catalog(default_catalog(), seed)
    }

    /// Creates a selector over an explicit catalog.
    #[must_use]
    pub fn with_catalog(catalog: Vec<AugmentDefinition>, seed: u64) -> Self {
        Self {
            catalog,
            stacks: AugmentStacks::default(),
            offers: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Every augment the selector knows about.
    #[must_use]
    pub fn catalog(&self) -> &[AugmentDefinition] {
        &self.catalog
    }

    /// Looks up the definition of an augment.
    #[must_use]
    pub fn definition(&self, augment: AugmentId) -> Option<&AugmentDefinition> {
        self.catalog.iter().find(|definition| definition.id == augment)
    }

    /// Purchase counts recorded so far.
    #[must_use]
    pub fn stacks(&self) -> &AugmentStacks {
        &self.stacks
    }

    /// Augments currently on offer. Empty while no selection is open.
    #[must_use]
    pub fn offers(&self) -> &[AugmentId] {
        &self.offers
    }

    /// Augments that are repeatable or were never bought.
    pub fn eligible(&self) -> impl Iterator<Item = &AugmentDefinition> {
        self.catalog
            .iter()
            .filter(|definition| definition.repeatable || !self.stacks.is_purchased(definition.id))
    }

    /// Draws up to `count` distinct eligible augments without replacement.
    ///
    /// Each draw rolls uniformly over the remaining total weight and takes
    /// the first candidate whose cumulative weight exceeds the roll.
    pub fn random_offers(&mut self, count: usize) -> Vec<AugmentId> {
        let mut pool: Vec<(AugmentId, f32)> = self
            .eligible()
            .map(|definition| (definition.id, definition.weight.max(0.0)))
            .collect();
        let mut offers = Vec::with_capacity(count.min(pool.len()));

        while offers.len() < count && !pool.is_empty() {
            let total: f32 = pool.iter().map(|(_, weight)| *weight).sum();
            let index = if total <= 0.0 {
                0
            } else {
                let roll = self.rng.gen::<f32>() * total;
                let mut cumulative = 0.0;
                pool.iter()
                    .position(|(_, weight)| {
                        cumulative += *weight;
                        cumulative > roll
                    })
                    .unwrap_or(pool.len() - 1)
            };
            let (augment, _) = pool.remove(index);
            offers.push(augment);
        }

        offers
    }

    /// Records one purchase of the augment and returns its stack count.
    pub fn purchase(&mut self, augment: AugmentId) -> u32 {
        self.stacks.increment(augment)
    }

    /// Opens offers when the world asks for a selection and mirrors purchases.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Event>) {
        for event in events {
            match event {
                Event::AugmentSelectionOpened { level } => {
                    self.offers = self.random_offers(OFFER_COUNT);
                    debug!(level, offers = ?self.offers, "augments offered");
                    out.push(Event::AugmentsOffered {
                        offers: self.offers.clone(),
                    });
                }
                Event::AugmentPurchased { augment, .. } => {
                    let _ = self.purchase(*augment);
                }
                Event::PhaseChanged {
                    from: Phase::Augmentation,
                    ..
                } => self.offers.clear(),
                _ => {}
            }
        }
    }

    /// Accepts one of the current offers and closes the selection.
    pub fn choose(
        &mut self,
        augment: AugmentId,
        out: &mut Vec<Command>,
    ) -> Result<(), RewardError> {
        if self.offers.is_empty() {
            return Err(RewardError::SelectionClosed);
        }
        if !self.offers.contains(&augment) {
            return Err(RewardError::NotOffered(augment));
        }
        self.offers.clear();
        if let Some(definition) = self.definition(augment) {
            info!(augment = definition.title, "augment chosen");
        }
        out.push(Command::PurchaseAugment { augment });
        out.push(Command::SetPhase {
            phase: Phase::Shopping,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{default_catalog, AugmentDefinition, RewardSelector};
    use lanebound_core::AugmentId;

    fn zero_weight(id: u32) -> AugmentDefinition {
        AugmentDefinition {
            id: AugmentId::new(id),
            title: "Inert",
            description: "",
            weight: 0.0,
            repeatable: true,
        }
    }

    #[test]
    fn catalog_ids_are_unique_and_ordered() {
        let ids: Vec<_> = default_catalog().iter().map(|a| a.id.get()).collect();
        assert_eq!(ids, (0..9u32).collect::<Vec<_>>());
    }

    #[test]
    fn zero_total_weight_draws_in_catalog_order() {
        let mut selector =
            RewardSelector::with_catalog(vec![zero_weight(4), zero_weight(2), zero_weight(7)], 1);
        assert_eq!(
            selector.random_offers(2),
            vec![AugmentId::new(4), AugmentId::new(2)]
        );
    }

    #[test]
    fn the_only_weighted_candidate_is_drawn_first() {
        let mut weighted = zero_weight(5);
        weighted.weight = 10.0;
        for seed in 0..16 {
            let mut selector =
                RewardSelector::with_catalog(vec![zero_weight(1), weighted.clone()], seed);
            assert_eq!(selector.random_offers(1), vec![AugmentId::new(5)]);
        }
    }
}
