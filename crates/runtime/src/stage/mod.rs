//! Match-stage state machine.
//!
//! The clock holds the current [`JudgeSystemStage`] and the time spent in it.
//! It never advances on its own: expiry is reported through
//! [`StageClock::is_expired`] and acted on by whoever drives the match (the
//! timekeeper worker or a referee).

mod clock;

use async_trait::async_trait;
use judge_core::{ConfigError, JudgeSystemStage};
use thiserror::Error;

pub use clock::StageClock;

use crate::bus::{BusContext, DispatchError};
use crate::systems::RuleSystem;

/// Read access to the stage clock for rule systems.
pub trait StageView: Send + Sync {
    fn stage(&self) -> JudgeSystemStage;

    /// Milliseconds spent in the current stage.
    fn elapsed_ms(&self) -> u64;
}

/// Stage transitions, as driven by the orchestrator.
#[async_trait]
pub trait StageControl: StageView + RuleSystem {
    /// Moves to `next` and publishes exactly one `StageChangedEvent`.
    async fn set_stage(&self, next: JudgeSystemStage, ctx: &BusContext) -> Result<(), StageError>;
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
