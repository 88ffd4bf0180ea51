//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from wiring, resets, stage transitions and worker
//! coordination so clients can bubble them up with consistent context.
use judge_core::{ConfigError, ErrorSeverity, JudgeError};
use thiserror::Error;

use crate::bus::DispatchError;
use crate::stage::StageError;
use crate::systems::SystemError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("judge requires rule tables to be configured before building")]
    MissingTables,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reset failed")]
    Reset(#[from] SystemError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("timekeeper worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

impl JudgeError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingTables | Self::Config(_) => ErrorSeverity::Fatal,
            Self::Reset(err) => err.severity(),
            Self::Stage(_) | Self::Dispatch(_) => ErrorSeverity::Recoverable,
            Self::WorkerJoin(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingTables => "RUNTIME_MISSING_TABLES",
            Self::Config(_) => "RUNTIME_CONFIG",
            Self::Reset(err) => err.error_code(),
            Self::Stage(_) => "RUNTIME_STAGE",
            Self::Dispatch(_) => "RUNTIME_DISPATCH",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
        }
    }
}
