//! Match configuration loaded from TOML.
//!
//! Every section falls back to built-in defaults so a configuration file only
//! needs to name the values it changes.

use std::{collections::BTreeMap, time::Duration};

use lanebound_core::{
    Archetype, LaneLayout, ProjectileKind, Tier, TierCounts, UnitKind, WaveConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`MatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text could not be parsed into a configuration.
    #[error("failed to parse match configuration")]
    Parse(#[from] toml::de::Error),
    /// An archetype stat is out of its valid range.
    #[error("archetype `{tag}` has invalid `{field}`")]
    InvalidStat {
        /// Pool tag of the offending archetype.
        tag: &'static str,
        /// Name of the offending field.
        field: &'static str,
    },
    /// A tuning value is negative, zero where it must be positive, or not finite.
    #[error("tuning value `{field}` is invalid")]
    InvalidTuning {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Complete description of a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Gold available before the first wave.
    pub starting_gold: u32,
    /// Waves in release order.
    pub waves: Vec<WaveConfig>,
    /// Fixed lane geometry.
    pub layout: LaneLayout,
    /// Combat statistics keyed by archetype tag.
    pub archetypes: BTreeMap<Archetype, ArchetypeStats>,
    /// Pool pre-warm sizes.
    pub pool: PoolConfig,
    /// Timing of attacks, deployment and scene hooks.
    pub combat: CombatTuning,
    /// Power-up magnitudes and augment bonuses.
    pub modifiers: ModifierTuning,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            starting_gold: 12,
            waves: default_waves(),
            layout: LaneLayout::default(),
            archetypes: default_archetypes(),
            pool: PoolConfig::default(),
            combat: CombatTuning::default(),
            modifiers: ModifierTuning::default(),
        }
    }
}

impl MatchConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every stat and tuning value is usable by the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (archetype, stats) in &self.archetypes {
            stats.validate(archetype.tag())?;
        }
        self.combat.validate()?;
        self.modifiers.validate()
    }

    /// Statistics registered for the archetype.
    #[must_use]
    pub fn stats(&self, archetype: Archetype) -> Option<&ArchetypeStats> {
        self.archetypes.get(&archetype)
    }
}

/// Combat statistics of one archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchetypeStats {
    /// Health of a freshly spawned unit.
    pub max_health: i32,
    /// Combat movement speed in units per second.
    pub move_speed: f32,
    /// Damage dealt by one attack before modifiers.
    pub base_damage: f32,
    /// Planar distance from which the unit can attack.
    pub attack_range: f32,
    /// Attacks per second before haste.
    pub attack_speed: f32,
    /// Radius of area damage around the target.
    pub area_radius: f32,
    /// Kill reward for enemies and sell refund for friendlies.
    pub gold_value: u32,
    /// Shop price.
    pub price: u32,
    /// Gold needed to upgrade a base-tier unit.
    #[serde(default)]
    pub upgrade_cost: u32,
    /// Projectile launched instead of a direct hit.
    #[serde(default)]
    pub projectile: Option<ProjectileStats>,
}

impl ArchetypeStats {
    fn validate(&self, tag: &'static str) -> Result<(), ConfigError> {
        let invalid = |field| Err(ConfigError::InvalidStat { tag, field });
        if self.max_health <= 0 {
            return invalid("max_health");
        }
        if !non_negative(self.move_speed) {
            return invalid("move_speed");
        }
        if !non_negative(self.base_damage) {
            return invalid("base_damage");
        }
        if !non_negative(self.attack_range) {
            return invalid("attack_range");
        }
        if !positive(self.attack_speed) {
            return invalid("attack_speed");
        }
        if !non_negative(self.area_radius) {
            return invalid("area_radius");
        }
        if let Some(projectile) = self.projectile {
            if !positive(projectile.speed) {
                return invalid("projectile.speed");
            }
        }
        Ok(())
    }

    /// Seconds between the starts of two attacks at the provided haste.
    #[must_use]
    pub fn attack_interval(&self, haste: f32) -> Duration {
        seconds(1.0 / (self.attack_speed * haste))
    }
}

/// Projectile fired by a ranged archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileStats {
    /// Pool the projectile is drawn from.
    pub kind: ProjectileKind,
    /// Flight speed in units per second.
    pub speed: f32,
}

/// Number of instances created ahead of time for every pool tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle instances per unit archetype.
    pub units_per_archetype: u32,
    /// Idle instances per projectile kind.
    pub projectiles_per_kind: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            units_per_archetype: 4,
            projectiles_per_kind: 8,
        }
    }
}

/// Timing of attacks, deployment and scene hooks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Length of one attack sequence in seconds; damage resolves at its midpoint.
    pub attack_duration_secs: f32,
    /// Speed used while walking onto the field.
    pub deployment_speed: f32,
    /// Distance covered between two walk-step cues.
    pub walk_stride: f32,
    /// Delay between the end of the match and the scene transition request.
    pub scene_transition_delay_secs: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            attack_duration_secs: 1.0,
            deployment_speed: 8.0,
            walk_stride: 1.0,
            scene_transition_delay_secs: 2.0,
        }
    }
}

impl CombatTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        check_positive(self.attack_duration_secs, "combat.attack_duration_secs")?;
        check_positive(self.deployment_speed, "combat.deployment_speed")?;
        check_positive(self.walk_stride, "combat.walk_stride")?;
        check_non_negative(
            self.scene_transition_delay_secs,
            "combat.scene_transition_delay_secs",
        )
    }

    /// Length of one attack sequence.
    #[must_use]
    pub fn attack_duration(&self) -> Duration {
        seconds(self.attack_duration_secs)
    }

    /// Delay before the scene transition request.
    #[must_use]
    pub fn scene_transition_delay(&self) -> Duration {
        seconds(self.scene_transition_delay_secs)
    }
}

/// Power-up magnitudes and the augment bonuses layered on top of them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierTuning {
    /// Distance from the impact point within which units are affected.
    pub power_up_radius: f32,
    /// Shield duration in seconds.
    pub shield_duration_secs: f32,
    /// Extra shield seconds per Fortified Shield stack.
    pub shield_bonus_secs_per_stack: f32,
    /// Rush duration in seconds.
    pub rush_duration_secs: f32,
    /// Movement multiplier while rushing.
    pub rush_multiplier: f32,
    /// Movement multiplier once Overdrive Rush is owned.
    pub overdrive_rush_multiplier: f32,
    /// Haste duration in seconds.
    pub haste_duration_secs: f32,
    /// Attack-speed multiplier while hasted.
    pub haste_multiplier: f32,
    /// Added haste multiplier per Enhanced Haste stack.
    pub haste_bonus_per_stack: f32,
    /// Rage duration in seconds.
    pub rage_duration_secs: f32,
    /// Damage multiplier while enraged.
    pub rage_damage_multiplier: f32,
    /// Damage multiplier once Brutal Rage is owned.
    pub brutal_rage_damage_multiplier: f32,
    /// Damage-taken multiplier while enraged.
    pub rage_damage_taken_multiplier: f32,
    /// Damage-taken multiplier once Controlled Rage is owned.
    pub controlled_rage_damage_taken_multiplier: f32,
    /// Area-damage duration in seconds.
    pub area_damage_duration_secs: f32,
    /// Area radius multiplier applied by the modifier.
    pub area_radius_multiplier: f32,
    /// Radius growth factor per Expanded Destruction stack.
    pub area_radius_growth_per_stack: f32,
    /// Life-steal duration in seconds.
    pub life_steal_duration_secs: f32,
    /// Share of dealt damage healed back.
    pub life_steal_fraction: f32,
    /// Added life-steal share per Improved Life Steal stack.
    pub life_steal_bonus_per_stack: f32,
    /// Share of max health healed per Vital Boost stack.
    pub vital_boost_heal_fraction: f32,
    /// Extra gold dropped by a primed enemy.
    pub enemy_gold_bonus: u32,
    /// Enemy-gold uses per wave before Golden Opportunity stacks.
    pub enemy_gold_uses_per_wave: u32,
}

impl Default for ModifierTuning {
    fn default() -> Self {
        Self {
            power_up_radius: 5.0,
            shield_duration_secs: 3.0,
            shield_bonus_secs_per_stack: 0.5,
            rush_duration_secs: 4.0,
            rush_multiplier: 1.5,
            overdrive_rush_multiplier: 3.0,
            haste_duration_secs: 4.0,
            haste_multiplier: 1.5,
            haste_bonus_per_stack: 0.5,
            rage_duration_secs: 5.0,
            rage_damage_multiplier: 2.0,
            brutal_rage_damage_multiplier: 2.5,
            rage_damage_taken_multiplier: 1.5,
            controlled_rage_damage_taken_multiplier: 0.25,
            area_damage_duration_secs: 5.0,
            area_radius_multiplier: 1.0,
            area_radius_growth_per_stack: 1.2,
            life_steal_duration_secs: 5.0,
            life_steal_fraction: 0.35,
            life_steal_bonus_per_stack: 0.05,
            vital_boost_heal_fraction: 0.1,
            enemy_gold_bonus: 5,
            enemy_gold_uses_per_wave: 1,
        }
    }
}

impl ModifierTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative(self.power_up_radius, "modifiers.power_up_radius")?;
        check_non_negative(self.shield_duration_secs, "modifiers.shield_duration_secs")?;
        check_non_negative(
            self.shield_bonus_secs_per_stack,
            "modifiers.shield_bonus_secs_per_stack",
        )?;
        check_non_negative(self.rush_duration_secs, "modifiers.rush_duration_secs")?;
        check_positive(self.rush_multiplier, "modifiers.rush_multiplier")?;
        check_positive(
            self.overdrive_rush_multiplier,
            "modifiers.overdrive_rush_multiplier",
        )?;
        check_non_negative(self.haste_duration_secs, "modifiers.haste_duration_secs")?;
        check_positive(self.haste_multiplier, "modifiers.haste_multiplier")?;
        check_non_negative(self.haste_bonus_per_stack, "modifiers.haste_bonus_per_stack")?;
        check_non_negative(self.rage_duration_secs, "modifiers.rage_duration_secs")?;
        check_positive(self.rage_damage_multiplier, "modifiers.rage_damage_multiplier")?;
        check_positive(
            self.brutal_rage_damage_multiplier,
            "modifiers.brutal_rage_damage_multiplier",
        )?;
        check_positive(
            self.rage_damage_taken_multiplier,
            "modifiers.rage_damage_taken_multiplier",
        )?;
        check_positive(
            self.controlled_rage_damage_taken_multiplier,
            "modifiers.controlled_rage_damage_taken_multiplier",
        )?;
        check_non_negative(
            self.area_damage_duration_secs,
            "modifiers.area_damage_duration_secs",
        )?;
        check_positive(self.area_radius_multiplier, "modifiers.area_radius_multiplier")?;
        check_positive(
            self.area_radius_growth_per_stack,
            "modifiers.area_radius_growth_per_stack",
        )?;
        check_non_negative(
            self.life_steal_duration_secs,
            "modifiers.life_steal_duration_secs",
        )?;
        check_non_negative(self.life_steal_fraction, "modifiers.life_steal_fraction")?;
        check_non_negative(
            self.life_steal_bonus_per_stack,
            "modifiers.life_steal_bonus_per_stack",
        )?;
        check_non_negative(
            self.vital_boost_heal_fraction,
            "modifiers.vital_boost_heal_fraction",
        )
    }
}

/// Converts seconds into a duration, mapping invalid values to zero.
pub(crate) fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn check_positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if positive(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTuning { field })
    }
}

fn check_non_negative(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if non_negative(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTuning { field })
    }
}

fn default_waves() -> Vec<WaveConfig> {
    vec![
        WaveConfig {
            viking: TierCounts::new(2, 0),
            scout: TierCounts::new(1, 0),
            max_placeable_units: 3,
            ..WaveConfig::default()
        },
        WaveConfig {
            viking: TierCounts::new(2, 0),
            archer: TierCounts::new(2, 0),
            max_placeable_units: 4,
            ..WaveConfig::default()
        },
        WaveConfig {
            giant: TierCounts::new(1, 0),
            viking: TierCounts::new(1, 1),
            wizard: TierCounts::new(1, 0),
            archer: TierCounts::new(2, 0),
            max_placeable_units: 5,
            ..WaveConfig::default()
        },
        WaveConfig {
            giant: TierCounts::new(1, 1),
            scout: TierCounts::new(2, 1),
            wizard: TierCounts::new(1, 1),
            archer: TierCounts::new(2, 1),
            max_placeable_units: 6,
            ..WaveConfig::default()
        },
    ]
}

fn default_archetypes() -> BTreeMap<Archetype, ArchetypeStats> {
    let mut table = BTreeMap::new();
    for kind in UnitKind::ALL {
        let base = base_stats(kind);
        let _ = table.insert(Archetype::new(kind, Tier::Base), base);
        let _ = table.insert(Archetype::new(kind, Tier::Upgraded), upgraded_stats(base));
    }
    table
}

fn base_stats(kind: UnitKind) -> ArchetypeStats {
    let melee =
        |max_health, move_speed, base_damage, attack_range, attack_speed, area_radius, gold| {
            ArchetypeStats {
                max_health,
                move_speed,
                base_damage,
                attack_range,
                attack_speed,
                area_radius,
                gold_value: gold,
                price: gold,
                upgrade_cost: gold,
                projectile: None,
            }
        };
    match kind {
        UnitKind::Giant => melee(300, 1.5, 25.0, 1.8, 0.6, 2.0, 6),
        UnitKind::Viking => melee(120, 2.5, 12.0, 1.5, 1.0, 1.5, 3),
        UnitKind::Scout => melee(80, 4.0, 8.0, 1.2, 1.4, 1.2, 2),
        UnitKind::Wizard => ArchetypeStats {
            projectile: Some(ProjectileStats {
                kind: ProjectileKind::Fireball,
                speed: 10.0,
            }),
            ..melee(70, 2.0, 15.0, 7.0, 0.8, 2.5, 4)
        },
        UnitKind::Archer => ArchetypeStats {
            projectile: Some(ProjectileStats {
                kind: ProjectileKind::Arrow,
                speed: 16.0,
            }),
            ..melee(60, 2.2, 10.0, 9.0, 1.0, 1.5, 3)
        },
    }
}

fn upgraded_stats(base: ArchetypeStats) -> ArchetypeStats {
    ArchetypeStats {
        max_health: base.max_health + base.max_health / 2,
        base_damage: base.base_damage * 1.5,
        gold_value: base.gold_value * 2,
        price: base.price * 2,
        upgrade_cost: 0,
        ..base
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MatchConfig};
    use lanebound_core::{Archetype, Tier, UnitKind};

    #[test]
    fn defaults_cover_every_archetype() {
        let config = MatchConfig::default();
        for archetype in Archetype::ALL {
            assert!(config.stats(archetype).is_some(), "{archetype:?}");
        }
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = MatchConfig::from_toml_str(
            r#"
            starting_gold = 30

            [[waves]]
            giant = [1, 0]
            archer = [2, 0]
            max_placeable_units = 2
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.starting_gold, 30);
        assert_eq!(config.waves.len(), 1);
        assert_eq!(config.waves[0].archer.base, 2);
        assert_eq!(config.waves[0].viking.total(), 0);
        assert_eq!(config.combat, MatchConfig::default().combat);
    }

    #[test]
    fn archetype_table_is_keyed_by_tag() {
        let config = MatchConfig::from_toml_str(
            r#"
            [archetypes.Viking_lvl2]
            max_health = 10
            move_speed = 1.0
            base_damage = 2.0
            attack_range = 1.0
            attack_speed = 1.0
            area_radius = 1.0
            gold_value = 1
            price = 1
            "#,
        )
        .expect("valid configuration");

        let archetype = Archetype::new(UnitKind::Viking, Tier::Upgraded);
        assert_eq!(config.archetypes.len(), 1);
        assert_eq!(config.stats(archetype).map(|stats| stats.max_health), Some(10));
    }

    #[test]
    fn unknown_archetype_tag_is_a_parse_error() {
        let error = MatchConfig::from_toml_str(
            r#"
            [archetypes.Dragon]
            max_health = 10
            move_speed = 1.0
            base_damage = 2.0
            attack_range = 1.0
            attack_speed = 1.0
            area_radius = 1.0
            gold_value = 1
            price = 1
            "#,
        )
        .expect_err("unknown tag");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_attack_speed_is_rejected() {
        let error = MatchConfig::from_toml_str(
            r#"
            [archetypes.Scout]
            max_health = 10
            move_speed = 1.0
            base_damage = 2.0
            attack_range = 1.0
            attack_speed = 0.0
            area_radius = 1.0
            gold_value = 1
            price = 1
            "#,
        )
        .expect_err("invalid stat");
        assert!(matches!(
            error,
            ConfigError::InvalidStat {
                tag: "Scout",
                field: "attack_speed"
            }
        ));
    }

    #[test]
    fn negative_tuning_is_rejected() {
        let error = MatchConfig::from_toml_str(
            r#"
            [combat]
            deployment_speed = -1.0
            "#,
        )
        .expect_err("invalid tuning");
        assert!(matches!(error, ConfigError::InvalidTuning { .. }));
    }
}
