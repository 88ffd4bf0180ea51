//! In-memory rule tables.

use std::collections::HashMap;

use judge_core::{
    AmmoType, BuffRules, ChassisMode, ConfigError, EconomyRules, JudgeSystemStage, LevelProfile,
    PenaltyRules, RobotVariant, RuleTables, ScoreRules, TimeLimit, ZoneRule,
};

/// Experience awarded per kill.
#[derive(Clone, Debug, PartialEq)]
pub struct KillExperience {
    pub base: f32,
    pub per_level: f32,
    pub structure: f32,
}

/// Heat added per projectile, by caliber.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatPerShot {
    pub small: f32,
    pub large: f32,
    pub dart: f32,
}

/// [`RuleTables`] backed by plain data.
///
/// Usually produced by [`TablesLoader`](crate::TablesLoader); the `with_*`
/// methods adjust single entries for tests and tools.
#[derive(Clone, Debug)]
pub struct StaticTables {
    pub(crate) stage_limits: HashMap<JudgeSystemStage, TimeLimit>,
    pub(crate) profiles: HashMap<(RobotVariant, ChassisMode), Vec<LevelProfile>>,
    pub(crate) thresholds: HashMap<RobotVariant, Vec<f32>>,
    pub(crate) initial_ammo: HashMap<RobotVariant, u32>,
    pub(crate) kill_experience: KillExperience,
    pub(crate) heat_per_shot: HeatPerShot,
    pub(crate) economy: EconomyRules,
    pub(crate) buffs: BuffRules,
    pub(crate) penalties: PenaltyRules,
    pub(crate) score: ScoreRules,
    pub(crate) zones: Vec<ZoneRule>,
}

impl StaticTables {
    pub fn with_stage_limit(mut self, stage: JudgeSystemStage, limit: TimeLimit) -> Self {
        self.stage_limits.insert(stage, limit);
        self
    }

    pub fn with_profile(
        mut self,
        variant: RobotVariant,
        chassis: ChassisMode,
        levels: Vec<LevelProfile>,
    ) -> Self {
        self.profiles.insert((variant, chassis), levels);
        self
    }

    pub fn with_initial_ammo(mut self, variant: RobotVariant, ammo: u32) -> Self {
        self.initial_ammo.insert(variant, ammo);
        self
    }

    pub fn with_economy(mut self, economy: EconomyRules) -> Self {
        self.economy = economy;
        self
    }

    pub fn with_buffs(mut self, buffs: BuffRules) -> Self {
        self.buffs = buffs;
        self
    }

    pub fn with_zones(mut self, zones: Vec<ZoneRule>) -> Self {
        self.zones = zones;
        self
    }
}

impl RuleTables for StaticTables {
    fn stage_limit(&self, stage: JudgeSystemStage) -> Result<TimeLimit, ConfigError> {
        if stage == JudgeSystemStage::OutOfMatch {
            return Ok(TimeLimit::Unbounded);
        }
        self.stage_limits
            .get(&stage)
            .copied()
            .ok_or(ConfigError::UnknownStage { stage })
    }

    fn profile(
        &self,
        variant: RobotVariant,
        chassis: ChassisMode,
        level: u8,
    ) -> Result<LevelProfile, ConfigError> {
        let levels = self
            .profiles
            .get(&(variant, chassis))
            .ok_or(ConfigError::MissingProfile { variant, chassis })?;
        let index = usize::from(level.max(1) - 1).min(levels.len().saturating_sub(1));
        levels
            .get(index)
            .cloned()
            .ok_or(ConfigError::MissingLevel { variant, level })
    }

    fn max_level(&self, variant: RobotVariant) -> u8 {
        self.thresholds
            .get(&variant)
            .map_or(1, |thresholds| thresholds.len().clamp(1, u8::MAX as usize) as u8)
    }

    fn level_for(&self, variant: RobotVariant, experience: f32) -> u8 {
        let Some(thresholds) = self.thresholds.get(&variant) else {
            return 1;
        };
        let reached = thresholds
            .iter()
            .take_while(|&&threshold| experience >= threshold)
            .count();
        reached.clamp(1, u8::MAX as usize) as u8
    }

    fn kill_experience(&self, victim: RobotVariant, victim_level: u8) -> f32 {
        if victim.is_structure() {
            return self.kill_experience.structure;
        }
        let bonus_levels = f32::from(victim_level.max(1) - 1);
        self.kill_experience.base + self.kill_experience.per_level * bonus_levels
    }

    fn heat_per_shot(&self, ammo: AmmoType) -> f32 {
        match ammo {
            AmmoType::Small => self.heat_per_shot.small,
            AmmoType::Large => self.heat_per_shot.large,
            AmmoType::Dart => self.heat_per_shot.dart,
        }
    }

    fn initial_ammo(&self, variant: RobotVariant) -> u32 {
        self.initial_ammo.get(&variant).copied().unwrap_or(0)
    }

    fn economy(&self) -> &EconomyRules {
        &self.economy
    }

    fn buffs(&self) -> &BuffRules {
        &self.buffs
    }

    fn penalties(&self) -> &PenaltyRules {
        &self.penalties
    }

    fn score(&self) -> &ScoreRules {
        &self.score
    }

    fn zones(&self) -> &[ZoneRule] {
        &self.zones
    }
}
