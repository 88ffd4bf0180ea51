//! Rule tables loader.

use std::collections::HashMap;
use std::path::Path;

use judge_core::{
    BuffRules, ChassisMode, EconomyRules, JudgeSystemStage, LevelProfile, PenaltyRules,
    RobotVariant, RuleTables, ScoreRules, TimeLimit, ZoneRule,
};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};
use crate::tables::{HeatPerShot, KillExperience, StaticTables};

const REFERENCE: &str = include_str!("../../data/reference_tables.toml");

/// On-disk layout of a rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TablesFile {
    pub stage_limits: StageLimitsSpec,
    pub experience: ExperienceSpec,
    pub heat_per_shot: HeatSpec,
    pub economy: EconomyRules,
    pub buffs: BuffRules,
    pub penalties: PenaltyRules,
    pub score: ScoreRules,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
    #[serde(default)]
    pub profiles: Vec<ProfileSpec>,
    #[serde(default)]
    pub zones: Vec<ZoneRule>,
}

/// Stage durations in seconds. OutOfMatch is always unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageLimitsSpec {
    pub repair: u32,
    pub self_check: u32,
    pub countdown: u32,
    #[serde(rename = "match")]
    pub match_: u32,
    pub settlement: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperienceSpec {
    pub kill_base: f32,
    pub kill_per_level: f32,
    pub structure_kill: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatSpec {
    pub small: f32,
    pub large: f32,
    #[serde(default)]
    pub dart: f32,
}

/// Per-variant loadout and level thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub variant: RobotVariant,
    #[serde(default)]
    pub initial_ammo: u32,
    /// Experience needed for each level, starting with level 1.
    #[serde(default)]
    pub thresholds: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSpec {
    pub variant: RobotVariant,
    #[serde(default)]
    pub chassis: ChassisMode,
    pub levels: Vec<LevelProfile>,
}

/// Loader for rule tables from TOML files.
pub struct TablesLoader;

impl TablesLoader {
    /// Load and validate tables from a TOML file.
    pub fn load(path: &Path) -> LoadResult<StaticTables> {
        let content = read_file(path)?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load tables {}: {}", path.display(), e))
    }

    /// Parse and validate tables from TOML text.
    pub fn from_toml(content: &str) -> LoadResult<StaticTables> {
        let file: TablesFile = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse tables TOML: {}", e))?;
        Self::build(file)
    }

    /// The bundled reference table.
    pub fn reference() -> LoadResult<StaticTables> {
        Self::from_toml(REFERENCE)
    }

    /// Converts a parsed file into tables and validates them.
    pub fn build(file: TablesFile) -> LoadResult<StaticTables> {
        let limits = &file.stage_limits;
        let stage_limits = HashMap::from([
            (JudgeSystemStage::Repair, TimeLimit::Seconds(limits.repair)),
            (JudgeSystemStage::SelfCheck, TimeLimit::Seconds(limits.self_check)),
            (JudgeSystemStage::Countdown, TimeLimit::Seconds(limits.countdown)),
            (JudgeSystemStage::Match, TimeLimit::Seconds(limits.match_)),
            (JudgeSystemStage::Settlement, TimeLimit::Seconds(limits.settlement)),
        ]);

        let mut thresholds = HashMap::new();
        let mut initial_ammo = HashMap::new();
        for spec in file.variants {
            if thresholds.contains_key(&spec.variant) {
                anyhow::bail!("variant {} listed twice", spec.variant);
            }
            if spec.thresholds.windows(2).any(|pair| pair[0] > pair[1]) {
                anyhow::bail!("{} thresholds must be ascending", spec.variant);
            }
            initial_ammo.insert(spec.variant, spec.initial_ammo);
            thresholds.insert(spec.variant, spec.thresholds);
        }

        let mut profiles = HashMap::new();
        for spec in file.profiles {
            if spec.levels.is_empty() {
                anyhow::bail!("{} {} profile has no levels", spec.variant, spec.chassis);
            }
            if profiles
                .insert((spec.variant, spec.chassis), spec.levels)
                .is_some()
            {
                anyhow::bail!("{} {} profile listed twice", spec.variant, spec.chassis);
            }
        }

        let tables = StaticTables {
            stage_limits,
            profiles,
            thresholds,
            initial_ammo,
            kill_experience: KillExperience {
                base: file.experience.kill_base,
                per_level: file.experience.kill_per_level,
                structure: file.experience.structure_kill,
            },
            heat_per_shot: HeatPerShot {
                small: file.heat_per_shot.small,
                large: file.heat_per_shot.large,
                dart: file.heat_per_shot.dart,
            },
            economy: file.economy,
            buffs: file.buffs,
            penalties: file.penalties,
            score: file.score,
            zones: file.zones,
        };
        tables.validate()?;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use judge_core::{AmmoType, Camp, ConfigError, ZoneKind};

    use super::*;

    #[test]
    fn reference_table_is_complete() {
        let tables = TablesLoader::reference().expect("reference tables");

        assert_eq!(
            tables.stage_limit(JudgeSystemStage::OutOfMatch).unwrap(),
            TimeLimit::Unbounded
        );
        assert_eq!(
            tables.stage_limit(JudgeSystemStage::Match).unwrap(),
            TimeLimit::Seconds(420)
        );
        let infantry = tables
            .profile(RobotVariant::Infantry, ChassisMode::Standard, 1)
            .unwrap();
        assert_eq!(infantry.max_health, 200);
        assert!(tables.heat_per_shot(AmmoType::Large) > tables.heat_per_shot(AmmoType::Small));
        assert_eq!(tables.zone(1).map(|zone| zone.kind), Some(ZoneKind::Supply));
        assert_eq!(tables.zone(1).map(|zone| zone.camp), Some(Camp::Red));
    }

    #[test]
    fn levels_follow_thresholds_and_clamp() {
        let tables = TablesLoader::reference().unwrap();

        assert_eq!(tables.level_for(RobotVariant::Infantry, 0.0), 1);
        assert_eq!(tables.level_for(RobotVariant::Infantry, 200.0), 2);
        assert_eq!(tables.level_for(RobotVariant::Infantry, 1e9), 3);
        assert_eq!(tables.level_for(RobotVariant::Base, 1e9), 1);
        assert_eq!(tables.max_level(RobotVariant::Hero), 3);

        let top = tables
            .profile(RobotVariant::Hero, ChassisMode::Standard, 3)
            .unwrap();
        let beyond = tables
            .profile(RobotVariant::Hero, ChassisMode::Standard, 9)
            .unwrap();
        assert_eq!(top, beyond);
    }

    #[test]
    fn missing_chassis_profile_is_a_config_error() {
        let tables = TablesLoader::reference().unwrap();
        let err = tables
            .profile(RobotVariant::Sentry, ChassisMode::PowerFirst, 1)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingProfile {
                variant: RobotVariant::Sentry,
                chassis: ChassisMode::PowerFirst,
            }
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REFERENCE.as_bytes()).unwrap();

        let tables = TablesLoader::load(file.path()).expect("load from disk");
        assert_eq!(tables.economy().initial_coins, 400);
    }

    #[test]
    fn missing_profiles_fail_validation() {
        let stripped: String = REFERENCE
            .split("[[profiles]]")
            .next()
            .unwrap()
            .to_owned();
        let err = TablesLoader::from_toml(&stripped).unwrap_err();
        assert!(err.to_string().contains("no profile"), "{err}");
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = TablesLoader::from_toml("stage_limits = 3").unwrap_err();
        assert!(err.to_string().contains("Failed to parse tables TOML"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = TablesLoader::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
