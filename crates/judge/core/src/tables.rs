//! Constant-table provider contract.
//!
//! The engine never bakes in competition numbers. Everything numeric that a
//! rule system needs (health caps, heat per shot, prices, zone layout) is
//! supplied through [`RuleTables`]. Records are selected by the entity's
//! declared [`RobotVariant`] / [`ChassisMode`] tag and level, never by type
//! introspection.

use strum::IntoEnumIterator;

use crate::error::ConfigError;
use crate::event::AmmoType;
use crate::identity::{Camp, ChassisMode, RobotVariant};
use crate::stage::{JudgeSystemStage, TimeLimit};

/// Level-dependent constants of one robot variant and chassis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelProfile {
    pub max_health: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_heat: f32,
    /// Heat dissipated per second.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cooling_per_sec: f32,
    /// Sustained chassis power allowed, in watts.
    #[cfg_attr(feature = "serde", serde(default))]
    pub power_limit: f32,
    /// Energy buffer absorbing power above the limit, in joules.
    #[cfg_attr(feature = "serde", serde(default))]
    pub power_buffer: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub revive_secs: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EconomyRules {
    pub initial_coins: i32,
    /// Coins granted to each camp every `income_period_secs` during Match.
    pub income: i32,
    pub income_period_secs: u32,
    pub kill_bounty: i32,
    pub small_ammo_price: i32,
    pub large_ammo_price: i32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuffRules {
    /// Damage reduction inside an own fortress zone (0.0 - 1.0).
    pub fortress_defense: f32,
    /// Extra cooling fraction on the highland.
    pub highland_cooling: f32,
    /// Fraction of max health restored per second inside an own healing zone.
    pub healing_per_sec: f32,
    /// Full invulnerability after revival.
    pub revive_invincible_secs: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PenaltyRules {
    /// Fraction of max health removed per overheat penalty.
    pub overheat_health: f32,
    /// Fraction of max health removed per power overrun penalty.
    pub power_overrun_health: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreRules {
    pub kill_points: i32,
    pub structure_kill_points: i32,
}

/// Kind of field area an operator can enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ZoneKind {
    Supply,
    Healing,
    Fortress,
    Highland,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneRule {
    /// Non-zero; zero means "no zone" in the store.
    pub id: u32,
    pub kind: ZoneKind,
    /// Owning camp; `Neutral` zones are shared.
    pub camp: Camp,
}

impl ZoneRule {
    /// Whether the zone grants its effect to members of `camp`.
    pub fn serves(&self, camp: Camp) -> bool {
        self.camp == Camp::Neutral || self.camp == camp
    }
}

/// Source of every constant the rule systems consult.
pub trait RuleTables: Send + Sync {
    fn stage_limit(&self, stage: JudgeSystemStage) -> Result<TimeLimit, ConfigError>;

    /// Profile for `level` (1-based). Levels above the table clamp to the top.
    fn profile(
        &self,
        variant: RobotVariant,
        chassis: ChassisMode,
        level: u8,
    ) -> Result<LevelProfile, ConfigError>;

    fn max_level(&self, variant: RobotVariant) -> u8;

    /// Level reached with `experience` points.
    fn level_for(&self, variant: RobotVariant, experience: f32) -> u8;

    /// Experience awarded for destroying `victim` at `victim_level`.
    fn kill_experience(&self, victim: RobotVariant, victim_level: u8) -> f32;

    fn heat_per_shot(&self, ammo: AmmoType) -> f32;

    fn initial_ammo(&self, variant: RobotVariant) -> u32;

    fn economy(&self) -> &EconomyRules;

    fn buffs(&self) -> &BuffRules;

    fn penalties(&self) -> &PenaltyRules;

    fn score(&self) -> &ScoreRules;

    fn zones(&self) -> &[ZoneRule];

    fn zone(&self, id: u32) -> Option<&ZoneRule> {
        self.zones().iter().find(|zone| zone.id == id)
    }

    /// Checks that every lookup the engine performs at reset will succeed.
    fn validate(&self) -> Result<(), ConfigError> {
        for stage in JudgeSystemStage::iter() {
            let limit = self.stage_limit(stage)?;
            if stage != JudgeSystemStage::OutOfMatch && limit == TimeLimit::Unbounded {
                return Err(ConfigError::InvalidTable {
                    reason: format!("stage {stage} must have a finite limit"),
                });
            }
        }
        for variant in RobotVariant::iter() {
            let chassis = ChassisMode::default();
            for level in 1..=self.max_level(variant).max(1) {
                self.profile(variant, chassis, level)?;
            }
        }
        if self.zones().iter().any(|zone| zone.id == 0) {
            return Err(ConfigError::InvalidTable {
                reason: "zone id 0 is reserved".to_owned(),
            });
        }
        Ok(())
    }
}

/// Ammunition a variant fires, if it has a launcher.
pub const fn ammo_for(variant: RobotVariant) -> Option<AmmoType> {
    match variant {
        RobotVariant::Hero => Some(AmmoType::Large),
        RobotVariant::Infantry | RobotVariant::Sentry | RobotVariant::Aerial => {
            Some(AmmoType::Small)
        }
        RobotVariant::Engineer | RobotVariant::Outpost | RobotVariant::Base => None,
    }
}
