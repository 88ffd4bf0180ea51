//! Rule systems.
//!
//! Each system owns one rule family of the match. It is built once per
//! container, subscribes its handlers to the bus in [`RuleSystem::attach`],
//! and puts its attributes back to their match-start values in
//! [`RuleSystem::reset`]. Systems read and write the store only through the
//! [`Properties`] bindings and treat messages arriving in the wrong stage as
//! no-ops.

mod battle;
mod buff;
mod economy;
mod experience;
mod life;
mod operator;
mod power;
mod score;
mod settlement;
mod supply;
mod zone;

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    AttributeStore, Camp, ChassisMode, ConfigError, ErrorSeverity, Identity, JudgeError,
    JudgeSystemStage, LevelProfile, Properties, RobotVariant, Roster, RuleTables,
};
use thiserror::Error;
use tracing::debug;

pub use battle::BattleSystem;
pub use buff::BuffSystem;
pub use economy::EconomySystem;
pub use experience::ExperienceSystem;
pub use life::LifeSystem;
pub use operator::OperatorSystem;
pub use power::PowerSystem;
pub use score::ScoreSystem;
pub use settlement::SettlementSystem;
pub use supply::SupplySystem;
pub use zone::ZoneSystem;

use crate::bus::EventBus;
use crate::cancel::Cancellation;
use crate::stage::StageView;

/// Lifecycle contract shared by every rule system and the stage clock.
#[async_trait]
pub trait RuleSystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// Restores match-start values. Must check `cancel` between entities.
    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError>;

    /// Subscribes the system's handlers.
    fn attach(self: Arc<Self>, bus: &EventBus) {
        let _ = bus;
    }
}

/// Failure of a rule system outside message handling.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("{system} reset cancelled")]
    Cancelled { system: &'static str },

    #[error("{system} misconfigured")]
    Config {
        system: &'static str,
        #[source]
        source: ConfigError,
    },

    #[error("{system} failed: {reason}")]
    Failed { system: &'static str, reason: String },

    #[error("reset task failed to complete")]
    Join(#[from] tokio::task::JoinError),
}

impl SystemError {
    pub fn config(system: &'static str) -> impl FnOnce(ConfigError) -> Self {
        move |source| Self::Config { system, source }
    }
}

impl JudgeError for SystemError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled { .. } => ErrorSeverity::Recoverable,
            Self::Config { .. } => ErrorSeverity::Fatal,
            Self::Failed { .. } | Self::Join(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => "SYSTEM_CANCELLED",
            Self::Config { .. } => "SYSTEM_CONFIG",
            Self::Failed { .. } => "SYSTEM_FAILED",
            Self::Join(_) => "SYSTEM_JOIN",
        }
    }
}

/// Shared collaborators handed to every rule system.
#[derive(Clone)]
pub struct SystemContext {
    pub store: Arc<AttributeStore>,
    pub props: Arc<Properties>,
    pub roster: Arc<Roster>,
    pub tables: Arc<dyn RuleTables>,
    pub clock: Arc<dyn StageView>,
}

impl SystemContext {
    pub fn stage(&self) -> JudgeSystemStage {
        self.clock.stage()
    }

    /// Whether a message may act in the current stage. Logs the no-op.
    pub fn accepts(
        &self,
        system: &'static str,
        message: &'static str,
        allowed: &[JudgeSystemStage],
    ) -> bool {
        let stage = self.stage();
        let accepted = allowed.contains(&stage);
        if !accepted {
            debug!(
                target: "runtime::systems",
                system,
                message,
                stage = %stage,
                "Ignored outside its stage"
            );
        }
        accepted
    }

    /// Any stage except out of match.
    pub fn running(&self, system: &'static str, message: &'static str) -> bool {
        self.accepts(system, message, RUNNING)
    }

    pub fn in_match(&self, system: &'static str, message: &'static str) -> bool {
        self.accepts(system, message, &[JudgeSystemStage::Match])
    }

    /// Match time of the current stage, stamped on domain events.
    pub fn now_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Recomputes the camp health cell from the camp's robots.
    pub fn refresh_camp_health(&self, camp: Camp) -> u32 {
        let total = self
            .roster
            .camp(camp)
            .filter_map(|entity| entity.as_healthed())
            .map(|healthed| healthed.health())
            .fold(0u32, u32::saturating_add);
        self.props.health.set_camp(&self.store, camp, total);
        total
    }

    /// Current chassis and level of a robot, as used for profile lookups.
    pub fn profile_key(&self, identity: Identity) -> (ChassisMode, u8) {
        let chassis = self
            .roster
            .chassis(identity)
            .map(|chassis| chassis.chassis_mode())
            .unwrap_or_default();
        let level = self
            .roster
            .experienced(identity)
            .map(|experienced| experienced.level())
            .unwrap_or(1);
        (chassis, level)
    }

    pub fn profile(
        &self,
        identity: Identity,
        variant: RobotVariant,
    ) -> Result<LevelProfile, ConfigError> {
        let (chassis, level) = self.profile_key(identity);
        self.tables.profile(variant, chassis, level)
    }
}

const RUNNING: &[JudgeSystemStage] = &[
    JudgeSystemStage::Repair,
    JudgeSystemStage::SelfCheck,
    JudgeSystemStage::Countdown,
    JudgeSystemStage::Match,
    JudgeSystemStage::Settlement,
];
