#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lanebound combat simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable [`UnitView`] snapshots, and respond exclusively with new
//! command batches.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Lanebound.";

/// Top-level match mode gating which systems are active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Player buys, sells, upgrades and places friendly units.
    Shopping,
    /// The enemy wave walks onto the field; purchasing is locked.
    Deployment,
    /// Both rosters fight until one side is empty.
    Combat,
    /// The player picks one augment before the next wave.
    Augmentation,
    /// Every configured wave was cleared.
    Win,
    /// The friendly roster was wiped out.
    Lose,
}

impl Phase {
    /// Reports whether the phase ends the match.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Win | Self::Lose)
    }
}

/// Final result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// All waves were defeated.
    Win,
    /// The friendly roster was defeated.
    Lose,
}

impl MatchOutcome {
    /// Terminal phase associated with the outcome.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::Win => Phase::Win,
            Self::Lose => Phase::Lose,
        }
    }
}

/// Side a unit fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// Units owned by the player.
    Friendly,
    /// Units released by waves.
    Enemy,
}

impl Team {
    /// Returns the side this team fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Friendly => Self::Enemy,
            Self::Enemy => Self::Friendly,
        }
    }
}

/// Unit families in the fixed order waves release them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Slow, heavy melee bruiser. Always spawned one per batch.
    Giant,
    /// Melee infantry.
    Viking,
    /// Fast mounted skirmisher.
    Scout,
    /// Ranged caster throwing fireballs.
    Wizard,
    /// Ranged unit firing arrows.
    Archer,
}

impl UnitKind {
    /// Every unit kind in spawn-priority order.
    pub const ALL: [UnitKind; 5] = [
        UnitKind::Giant,
        UnitKind::Viking,
        UnitKind::Scout,
        UnitKind::Wizard,
        UnitKind::Archer,
    ];

    /// Heavy kinds are released strictly one unit per batch.
    #[must_use]
    pub const fn is_heavy(self) -> bool {
        matches!(self, Self::Giant)
    }

    const fn base_tag(self) -> &'static str {
        match self {
            Self::Giant => "Giant",
            Self::Viking => "Viking",
            Self::Scout => "Scout",
            Self::Wizard => "Wizard",
            Self::Archer => "Archer",
        }
    }

    const fn upgraded_tag(self) -> &'static str {
        match self {
            Self::Giant => "Giant_lvl2",
            Self::Viking => "Viking_lvl2",
            Self::Scout => "Scout_lvl2",
            Self::Wizard => "Wizard_lvl2",
            Self::Archer => "Archer_lvl2",
        }
    }
}

/// Upgrade level of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Level one unit as bought from the shop.
    Base,
    /// Level two unit produced by an upgrade.
    Upgraded,
}

/// Concrete unit template identified by kind and tier.
///
/// Archetypes serialise as their pool tag (`"Giant"`, `"Archer_lvl2"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Archetype {
    kind: UnitKind,
    tier: Tier,
}

impl Archetype {
    /// Every archetype, base tiers first within each kind.
    pub const ALL: [Archetype; 10] = [
        Archetype::new(UnitKind::Giant, Tier::Base),
        Archetype::new(UnitKind::Giant, Tier::Upgraded),
        Archetype::new(UnitKind::Viking, Tier::Base),
        Archetype::new(UnitKind::Viking, Tier::Upgraded),
        Archetype::new(UnitKind::Scout, Tier::Base),
        Archetype::new(UnitKind::Scout, Tier::Upgraded),
        Archetype::new(UnitKind::Wizard, Tier::Base),
        Archetype::new(UnitKind::Wizard, Tier::Upgraded),
        Archetype::new(UnitKind::Archer, Tier::Base),
        Archetype::new(UnitKind::Archer, Tier::Upgraded),
    ];

    /// Creates an archetype from its kind and tier.
    #[must_use]
    pub const fn new(kind: UnitKind, tier: Tier) -> Self {
        Self { kind, tier }
    }

    /// Kind of unit described by the archetype.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Upgrade level of the archetype.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Pool tag used to acquire and release instances of the archetype.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self.tier {
            Tier::Base => self.kind.base_tag(),
            Tier::Upgraded => self.kind.upgraded_tag(),
        }
    }

    /// Resolves an archetype from its pool tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|archetype| archetype.tag() == tag)
    }

    /// Archetype produced by upgrading this one, if any.
    #[must_use]
    pub const fn upgraded(&self) -> Option<Self> {
        match self.tier {
            Tier::Base => Some(Self::new(self.kind, Tier::Upgraded)),
            Tier::Upgraded => None,
        }
    }
}

impl From<Archetype> for String {
    fn from(archetype: Archetype) -> Self {
        archetype.tag().to_owned()
    }
}

impl TryFrom<String> for Archetype {
    type Error = UnknownArchetype;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_tag(&value).ok_or(UnknownArchetype { tag: value })
    }
}

/// Error raised when a pool tag does not name a known archetype.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown archetype tag `{tag}`")]
pub struct UnknownArchetype {
    /// Tag that failed to resolve.
    pub tag: String,
}

/// Pooled projectile families launched by ranged archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Arrow fired by archers.
    Arrow,
    /// Fireball thrown by wizards.
    Fireball,
}

impl ProjectileKind {
    /// Every projectile kind.
    pub const ALL: [ProjectileKind; 2] = [ProjectileKind::Arrow, ProjectileKind::Fireball];

    /// Pool tag used for the projectile family.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Arrow => "Arrow",
            Self::Fireball => "Fireball",
        }
    }
}

/// Stable handle to a unit slot in the entity pool.
///
/// The generation changes every time the slot is recycled, so a handle held
/// after its unit died never resolves to the unit that reuses the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    index: u32,
    generation: u32,
}

impl UnitId {
    /// Creates a handle from a slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the pool arena.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Zero-based index of a wave within the match configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveIndex(u32);

impl WaveIndex {
    /// Creates a new wave index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric value of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index of the following wave.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Lifecycle state of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Walking to the staging point and then to its wait slot.
    Deploying,
    /// Holding its wait slot until combat starts.
    Waiting,
    /// Seeking, approaching or ready to strike its target.
    Engaging,
    /// Busy with a timed attack sequence.
    Attacking,
    /// Health reached zero.
    Dead,
}

/// Timed combat modifiers that a power-up can apply to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Invulnerable and rooted.
    Shield,
    /// Faster movement.
    Rush,
    /// Faster attacks.
    Haste,
    /// More damage dealt and a changed damage-taken factor.
    Rage,
    /// Attacks splash every opponent around the target.
    AreaDamage,
    /// Attacks heal the attacker.
    LifeSteal,
}

/// Power-ups the player can throw onto the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Applies [`ModifierKind::Shield`] to friendly units.
    Shield,
    /// Applies [`ModifierKind::Rush`] to friendly units.
    Rush,
    /// Applies [`ModifierKind::Haste`] to friendly units.
    Haste,
    /// Applies [`ModifierKind::Rage`] to friendly units.
    Rage,
    /// Applies [`ModifierKind::AreaDamage`] to friendly units.
    AreaDamage,
    /// Applies [`ModifierKind::LifeSteal`] to friendly units.
    LifeSteal,
    /// Primes enemy units to drop bonus gold when killed.
    EnemyGold,
}

impl PowerUpKind {
    /// Timed modifier applied by the power-up, if it is a buff.
    #[must_use]
    pub const fn modifier(self) -> Option<ModifierKind> {
        match self {
            Self::Shield => Some(ModifierKind::Shield),
            Self::Rush => Some(ModifierKind::Rush),
            Self::Haste => Some(ModifierKind::Haste),
            Self::Rage => Some(ModifierKind::Rage),
            Self::AreaDamage => Some(ModifierKind::AreaDamage),
            Self::LifeSteal => Some(ModifierKind::LifeSteal),
            Self::EnemyGold => None,
        }
    }

    /// Team whose units are affected by the power-up.
    #[must_use]
    pub const fn affected_team(self) -> Team {
        match self {
            Self::EnemyGold => Team::Enemy,
            _ => Team::Friendly,
        }
    }
}

/// Identifier of an augment in the reward catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AugmentId(u32);

impl AugmentId {
    /// Power-ups additionally restore a share of max health.
    pub const VITAL_BOOST: Self = Self(0);
    /// Raises the haste multiplier.
    pub const ENHANCED_HASTE: Self = Self(1);
    /// Lengthens the shield duration.
    pub const FORTIFIED_SHIELD: Self = Self(2);
    /// Replaces the rush multiplier with the overdrive multiplier.
    pub const OVERDRIVE_RUSH: Self = Self(3);
    /// Replaces the rage damage-taken factor with a reduced one.
    pub const CONTROLLED_RAGE: Self = Self(4);
    /// Replaces the rage damage multiplier with a larger one.
    pub const BRUTAL_RAGE: Self = Self(5);
    /// Grants an extra enemy-gold power-up use per wave.
    pub const GOLDEN_OPPORTUNITY: Self = Self(6);
    /// Widens the area-damage radius.
    pub const EXPANDED_DESTRUCTION: Self = Self(7);
    /// Raises the life-steal fraction.
    pub const IMPROVED_LIFE_STEAL: Self = Self(8);

    /// Creates an augment identifier from its numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Purchased-count ledger for augments.
///
/// Effects read stacks lazily when a power-up is applied instead of being
/// applied at purchase time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentStacks {
    counts: BTreeMap<AugmentId, u32>,
}

impl AugmentStacks {
    /// Number of times the augment was purchased.
    #[must_use]
    pub fn stacks(&self, augment: AugmentId) -> u32 {
        self.counts.get(&augment).copied().unwrap_or(0)
    }

    /// Reports whether the augment was purchased at least once.
    #[must_use]
    pub fn is_purchased(&self, augment: AugmentId) -> bool {
        self.stacks(augment) > 0
    }

    /// Records one more purchase and returns the new stack count.
    pub fn increment(&mut self, augment: AugmentId) -> u32 {
        let count = self.counts.entry(augment).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Iterator over purchased augments and their stack counts.
    pub fn iter(&self) -> impl Iterator<Item = (AugmentId, u32)> + '_ {
        self.counts.iter().map(|(augment, count)| (*augment, *count))
    }
}

/// Unit counts for one kind split by tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct TierCounts {
    /// Number of base-tier units.
    pub base: u32,
    /// Number of upgraded units.
    pub upgraded: u32,
}

impl TierCounts {
    /// Creates tier counts from explicit values.
    #[must_use]
    pub const fn new(base: u32, upgraded: u32) -> Self {
        Self { base, upgraded }
    }

    /// Total units across both tiers.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.base.saturating_add(self.upgraded)
    }
}

impl From<[u32; 2]> for TierCounts {
    fn from([base, upgraded]: [u32; 2]) -> Self {
        Self { base, upgraded }
    }
}

impl From<TierCounts> for [u32; 2] {
    fn from(counts: TierCounts) -> Self {
        [counts.base, counts.upgraded]
    }
}

/// Composition of a single enemy wave. Immutable once the wave is released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Giants to release.
    pub giant: TierCounts,
    /// Vikings to release.
    pub viking: TierCounts,
    /// Scouts to release.
    pub scout: TierCounts,
    /// Wizards to release.
    pub wizard: TierCounts,
    /// Archers to release.
    pub archer: TierCounts,
    /// Maximum friendly units the player may field for this wave.
    pub max_placeable_units: u32,
}

impl WaveConfig {
    /// Counts configured for the provided kind.
    #[must_use]
    pub const fn counts(&self, kind: UnitKind) -> TierCounts {
        match kind {
            UnitKind::Giant => self.giant,
            UnitKind::Viking => self.viking,
            UnitKind::Scout => self.scout,
            UnitKind::Wizard => self.wizard,
            UnitKind::Archer => self.archer,
        }
    }

    /// Groups in spawn-priority order.
    #[must_use]
    pub fn groups(&self) -> [(UnitKind, TierCounts); 5] {
        UnitKind::ALL.map(|kind| (kind, self.counts(kind)))
    }

    /// Total units across every group.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.groups()
            .iter()
            .fold(0u32, |sum, (_, counts)| sum.saturating_add(counts.total()))
    }
}

/// Fixed points and spacing of the lane, expressed on the ground plane (x, z).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneLayout {
    /// Point where enemy units appear.
    pub enemy_spawn_point: Vec2,
    /// Staging point every deploying enemy walks through.
    pub enemy_designated_point: Vec2,
    /// Centre of the enemy waiting formation.
    pub enemy_wait_point: Vec2,
    /// Lateral distance between neighbouring wait slots.
    pub slot_spacing: f32,
    /// Offset applied to waiting units when the formation shifts one row back.
    pub formation_row_step: Vec2,
    /// Reference point of the friendly placement area.
    pub friendly_rally_point: Vec2,
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self {
            enemy_spawn_point: Vec2::new(0.0, 40.0),
            enemy_designated_point: Vec2::new(0.0, 24.0),
            enemy_wait_point: Vec2::new(0.0, 16.0),
            slot_spacing: 1.5,
            formation_row_step: Vec2::new(0.0, 2.0),
            friendly_rally_point: Vec2::new(0.0, -4.0),
        }
    }
}

impl LaneLayout {
    /// Computes the wait slot of the `index`-th unit in a group of `total`.
    ///
    /// Slots are laid out along the x axis and centred on the waiting point.
    #[must_use]
    pub fn wait_slot(&self, index: u32, total: u32) -> Vec2 {
        let start = -(total as f32 - 1.0) * self.slot_spacing / 2.0;
        self.enemy_wait_point + Vec2::new(start + index as f32 * self.slot_spacing, 0.0)
    }
}

/// Reasons a shop request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ShopError {
    /// Purchasing is only enabled while shopping.
    #[error("purchasing is disabled outside the shopping phase")]
    InvalidPhase,
    /// The balance does not cover the price.
    #[error("insufficient gold: {required} required, {available} available")]
    InsufficientGold {
        /// Gold needed for the request.
        required: u32,
        /// Gold currently available.
        available: u32,
    },
    /// The friendly roster already holds the wave's maximum.
    #[error("roster already holds the maximum of {max} units")]
    RosterFull {
        /// Maximum placeable units for the current wave.
        max: u32,
    },
    /// The unit is not a live friendly unit.
    #[error("unit is not a live friendly unit")]
    UnknownUnit,
    /// The unit is already at its highest tier.
    #[error("unit cannot be upgraded further")]
    NotUpgradeable,
    /// No template is registered for the archetype.
    #[error("archetype {0:?} is not registered")]
    UnknownArchetype(Archetype),
}

/// Reasons a power-up request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PowerUpError {
    /// Power-ups are only accepted during combat.
    #[error("power-ups are only accepted during combat")]
    CombatInputDisabled,
    /// The per-wave allowance of this power-up was used up.
    #[error("power-up allowance of {limit} per wave exhausted")]
    UsesExhausted {
        /// Uses allowed this wave.
        limit: u32,
    },
}

/// Fire-and-forget presentation triggers for audio, animation and effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentationCue {
    /// A unit began its attack swing.
    AttackStarted,
    /// A unit's attack resolved at its midpoint.
    AttackLanded,
    /// A ranged unit launched a projectile.
    ProjectileLaunched,
    /// A projectile reached its target.
    ProjectileImpact,
    /// A unit covered one stride of ground.
    WalkStep,
    /// A unit died.
    Death,
    /// A timed modifier was applied to a unit.
    ModifierApplied(ModifierKind),
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests a transition to the provided phase.
    SetPhase {
        /// Phase to enter.
        phase: Phase,
    },
    /// Buys a friendly unit and places it on the field.
    PurchaseUnit {
        /// Archetype to buy.
        archetype: Archetype,
        /// Ground position where the unit is placed.
        position: Vec2,
    },
    /// Sells a friendly unit for its gold value.
    SellUnit {
        /// Unit to sell.
        unit: UnitId,
    },
    /// Replaces a friendly unit by its upgraded archetype.
    UpgradeUnit {
        /// Unit to upgrade.
        unit: UnitId,
    },
    /// Moves a friendly unit to a new position while shopping.
    RepositionUnit {
        /// Unit to move.
        unit: UnitId,
        /// New ground position.
        position: Vec2,
    },
    /// Acquires a unit from the pool and starts its deployment.
    SpawnUnit {
        /// Archetype to acquire.
        archetype: Archetype,
        /// Team the unit fights for.
        team: Team,
        /// Spawn position.
        position: Vec2,
        /// Initial facing in radians around the vertical axis.
        facing: f32,
        /// Staging point visited before the wait slot, if any.
        designated: Option<Vec2>,
        /// Wait slot the unit settles into.
        wait_slot: Vec2,
    },
    /// Shifts every deploying or waiting unit of the team one formation row back.
    AdvanceWaitingFormation {
        /// Team whose formation shifts.
        team: Team,
    },
    /// Assigns an attack target to a unit.
    AssignTarget {
        /// Attacking unit.
        unit: UnitId,
        /// Opposing unit to attack.
        target: UnitId,
    },
    /// Throws a power-up centred on a ground position.
    ApplyPowerUp {
        /// Power-up thrown.
        kind: PowerUpKind,
        /// Impact point.
        center: Vec2,
    },
    /// Records the purchase of an augment.
    PurchaseAugment {
        /// Augment bought.
        augment: AugmentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a completed phase transition.
    PhaseChanged {
        /// Phase that was exited.
        from: Phase,
        /// Phase that was entered.
        to: Phase,
    },
    /// A wave was released for deployment.
    WaveReleased {
        /// Index of the released wave.
        wave: WaveIndex,
        /// Composition of the wave.
        config: WaveConfig,
    },
    /// A unit was acquired from the pool and registered.
    UnitSpawned {
        /// Handle of the new unit.
        unit: UnitId,
        /// Archetype of the unit.
        archetype: Archetype,
        /// Team of the unit.
        team: Team,
        /// Spawn position.
        position: Vec2,
    },
    /// A unit died and returned to the pool.
    UnitDied {
        /// Handle of the dead unit.
        unit: UnitId,
        /// Archetype of the unit.
        archetype: Archetype,
        /// Team of the unit.
        team: Team,
        /// Position where it died.
        position: Vec2,
    },
    /// A unit left the field without dying (sold, upgraded away, restored).
    UnitRemoved {
        /// Handle of the removed unit.
        unit: UnitId,
        /// Team of the unit.
        team: Team,
    },
    /// A unit lost or never had a live target and asks for a new one.
    TargetNeeded {
        /// Unit requesting a target.
        unit: UnitId,
    },
    /// A unit accepted a new target.
    TargetAssigned {
        /// Attacking unit.
        unit: UnitId,
        /// Target unit.
        target: UnitId,
    },
    /// A proposed target was refused because either unit is inactive or
    /// both share a team.
    TargetRejected {
        /// Unit the target was proposed for.
        unit: UnitId,
        /// Refused target.
        target: UnitId,
    },
    /// Damage was subtracted from a unit's health.
    DamageApplied {
        /// Unit that took damage.
        unit: UnitId,
        /// Rounded damage after modifiers.
        amount: i32,
        /// Health left after the hit.
        remaining: i32,
    },
    /// A unit recovered health.
    UnitHealed {
        /// Healed unit.
        unit: UnitId,
        /// Health actually restored.
        amount: i32,
        /// Health after healing.
        health: i32,
    },
    /// The gold balance changed.
    GoldChanged {
        /// Balance after the change.
        balance: u32,
    },
    /// The number of placed friendly units changed.
    PlacementCountChanged {
        /// Friendly units currently placed.
        placed: u32,
        /// Maximum allowed for the current wave.
        max: u32,
    },
    /// A shop request was rejected.
    ShopRejected {
        /// Reason for the rejection.
        reason: ShopError,
    },
    /// A power-up was applied.
    PowerUpApplied {
        /// Power-up thrown.
        kind: PowerUpKind,
        /// Number of units affected.
        affected: u32,
    },
    /// A power-up request was rejected.
    PowerUpRejected {
        /// Power-up thrown.
        kind: PowerUpKind,
        /// Reason for the rejection.
        reason: PowerUpError,
    },
    /// A timed modifier started on a unit.
    ModifierApplied {
        /// Affected unit.
        unit: UnitId,
        /// Modifier applied.
        modifier: ModifierKind,
    },
    /// A timed modifier ran out on a unit.
    ModifierExpired {
        /// Affected unit.
        unit: UnitId,
        /// Modifier that expired.
        modifier: ModifierKind,
    },
    /// The augment selection opened after a cleared wave.
    AugmentSelectionOpened {
        /// Level counter shown to the player.
        level: u32,
    },
    /// Augments offered to the player.
    AugmentsOffered {
        /// Offered augments in presentation order.
        offers: Vec<AugmentId>,
    },
    /// An augment purchase was recorded.
    AugmentPurchased {
        /// Augment bought.
        augment: AugmentId,
        /// Stack count after the purchase.
        stacks: u32,
    },
    /// The friendly roster was rebuilt from the pre-combat snapshot.
    RosterRestored {
        /// Number of units restored.
        units: u32,
    },
    /// The match reached a terminal phase.
    MatchEnded {
        /// Final result.
        outcome: MatchOutcome,
    },
    /// The delayed request to leave the match scene fired.
    SceneTransitionRequested {
        /// Final result.
        outcome: MatchOutcome,
    },
    /// Presentation trigger for adapters.
    PresentationCue {
        /// Cue to play.
        cue: PresentationCue,
        /// Archetype involved, used to pick assets.
        archetype: Archetype,
        /// Ground position of the cue.
        position: Vec2,
    },
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Handle of the unit.
    pub id: UnitId,
    /// Team of the unit.
    pub team: Team,
    /// Archetype of the unit.
    pub archetype: Archetype,
    /// Lifecycle state.
    pub state: UnitState,
    /// Ground position.
    pub position: Vec2,
    /// Facing in radians around the vertical axis.
    pub facing: f32,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Current target, if any. Not guaranteed to be live.
    pub target: Option<UnitId>,
    /// Attack range.
    pub attack_range: f32,
    /// Wait slot the unit settles into outside combat.
    pub wait_slot: Vec2,
    /// Whether a shield currently makes the unit invulnerable.
    pub invulnerable: bool,
}

/// Read-only snapshot describing all active units.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over live units of one team in deterministic order.
    pub fn live_team(&self, team: Team) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots
            .iter()
            .filter(move |snapshot| snapshot.team == team && snapshot.state != UnitState::Dead)
    }

    /// Snapshot of the provided unit, if it is active.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&unit, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Reports whether the unit is active and alive.
    #[must_use]
    pub fn is_live(&self, unit: UnitId) -> bool {
        self.get(unit)
            .map_or(false, |snapshot| snapshot.state != UnitState::Dead)
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Archetype, AugmentId, AugmentStacks, LaneLayout, Team, Tier, TierCounts, UnitId,
        UnitKind, UnitSnapshot, UnitState, UnitView, WaveConfig,
    };
    use glam::Vec2;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn archetype_tags_resolve_back_to_archetypes() {
        for archetype in Archetype::ALL {
            assert_eq!(Archetype::from_tag(archetype.tag()), Some(archetype));
        }
        assert_eq!(Archetype::from_tag("Dragon"), None);
    }

    #[test]
    fn upgraded_tier_has_lvl2_tag_and_no_further_upgrade() {
        let giant = Archetype::new(UnitKind::Giant, Tier::Base);
        let upgraded = giant.upgraded().expect("base tier upgrades");
        assert_eq!(upgraded.tag(), "Giant_lvl2");
        assert_eq!(upgraded.upgraded(), None);
    }

    #[test]
    fn wave_config_round_trips_through_bincode() {
        let config = WaveConfig {
            giant: TierCounts::new(1, 0),
            archer: TierCounts::new(2, 1),
            max_placeable_units: 4,
            ..WaveConfig::default()
        };
        assert_round_trip(&config);
        assert_eq!(config.total(), 4);
    }

    #[test]
    fn wave_groups_follow_spawn_priority() {
        let config = WaveConfig {
            scout: TierCounts::new(2, 0),
            giant: TierCounts::new(0, 1),
            ..WaveConfig::default()
        };
        let kinds: Vec<UnitKind> = config.groups().iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, UnitKind::ALL.to_vec());
        assert_eq!(config.counts(UnitKind::Giant), TierCounts::new(0, 1));
        assert_eq!(config.counts(UnitKind::Viking).total(), 0);
        assert_eq!(config.total(), 3);
    }

    #[test]
    fn augment_stacks_round_trip_through_bincode() {
        let mut stacks = AugmentStacks::default();
        assert_eq!(stacks.increment(AugmentId::FORTIFIED_SHIELD), 1);
        assert_eq!(stacks.increment(AugmentId::FORTIFIED_SHIELD), 2);
        assert_round_trip(&stacks);
        assert_eq!(stacks.stacks(AugmentId::FORTIFIED_SHIELD), 2);
        assert!(!stacks.is_purchased(AugmentId::BRUTAL_RAGE));
    }

    #[test]
    fn wait_slots_are_centred_on_waiting_point() {
        let layout = LaneLayout::default();
        let slots: Vec<Vec2> = (0..3).map(|index| layout.wait_slot(index, 3)).collect();
        assert_eq!(slots[1], layout.enemy_wait_point);
        assert!((slots[0].x + slots[2].x).abs() < f32::EPSILON);
        assert!((slots[2].x - slots[0].x - 2.0 * layout.slot_spacing).abs() < 1e-5);
    }

    #[test]
    fn single_wait_slot_sits_on_waiting_point() {
        let layout = LaneLayout::default();
        assert_eq!(layout.wait_slot(0, 1), layout.enemy_wait_point);
    }

    #[test]
    fn unit_view_reports_liveness_by_handle() {
        let alive = UnitId::new(0, 0);
        let dead = UnitId::new(1, 0);
        let view = UnitView::from_snapshots(vec![
            snapshot(dead, UnitState::Dead),
            snapshot(alive, UnitState::Engaging),
        ]);
        assert!(view.is_live(alive));
        assert!(!view.is_live(dead));
        assert!(!view.is_live(UnitId::new(0, 1)));
        assert_eq!(view.live_team(Team::Enemy).count(), 1);
    }

    fn snapshot(id: UnitId, state: UnitState) -> UnitSnapshot {
        UnitSnapshot {
            id,
            team: Team::Enemy,
            archetype: Archetype::new(UnitKind::Viking, Tier::Base),
            state,
            position: Vec2::ZERO,
            facing: 0.0,
            health: 10,
            max_health: 10,
            target: None,
            attack_range: 1.0,
            wait_slot: Vec2::ZERO,
            invulnerable: false,
        }
    }
}
