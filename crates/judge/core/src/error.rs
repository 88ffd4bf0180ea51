//! Common error infrastructure for judge-core.
//!
//! Configuration problems (bad tables, colliding property keys, duplicate
//! identities) are fatal at startup. Gameplay never produces errors here:
//! out-of-context events are no-ops handled by the rule systems.

use crate::identity::{ChassisMode, Identity, RobotVariant};
use crate::key::PropertyKey;
use crate::stage::JudgeSystemStage;
use crate::store::ValueKind;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Transient condition; retrying the same operation may succeed.
    ///
    /// Examples: reset cancelled by the operator.
    Recoverable,

    /// Invalid input that should be rejected without retry.
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,

    /// Unrecoverable; the container must be rebuilt.
    ///
    /// Examples: key collision, missing constant table entry.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Uniform classification shared by the error types of the judge crates.
pub trait JudgeError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Static identifier for the error variant (metrics, tests).
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Configuration errors raised while wiring the judge system.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("property `{name}` declared twice")]
    DuplicateProperty { name: &'static str },

    #[error("property `{name}` collides with `{existing}` on key {key}")]
    KeyCollision {
        key: PropertyKey,
        existing: &'static str,
        name: &'static str,
    },

    #[error("property `{name}` declares no storage mode")]
    EmptyStorageMode { name: &'static str },

    #[error("property `{name}` declared as {declared} but accessed as {requested}")]
    TypeMismatch {
        name: &'static str,
        declared: ValueKind,
        requested: ValueKind,
    },

    #[error("no time limit configured for stage {stage}")]
    UnknownStage { stage: JudgeSystemStage },

    #[error("no profile for {variant} with {chassis} chassis")]
    MissingProfile {
        variant: RobotVariant,
        chassis: ChassisMode,
    },

    #[error("{variant} has no level {level} profile")]
    MissingLevel { variant: RobotVariant, level: u8 },

    #[error("identity {identity} registered twice")]
    DuplicateIdentity { identity: Identity },

    #[error("identity {identity} uses a reserved role index")]
    ReservedIdentity { identity: Identity },

    #[error("invalid table: {reason}")]
    InvalidTable { reason: String },
}

impl JudgeError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateProperty { .. } => "CONFIG_DUPLICATE_PROPERTY",
            Self::KeyCollision { .. } => "CONFIG_KEY_COLLISION",
            Self::EmptyStorageMode { .. } => "CONFIG_EMPTY_STORAGE_MODE",
            Self::TypeMismatch { .. } => "CONFIG_TYPE_MISMATCH",
            Self::UnknownStage { .. } => "CONFIG_UNKNOWN_STAGE",
            Self::MissingProfile { .. } => "CONFIG_MISSING_PROFILE",
            Self::MissingLevel { .. } => "CONFIG_MISSING_LEVEL",
            Self::DuplicateIdentity { .. } => "CONFIG_DUPLICATE_IDENTITY",
            Self::ReservedIdentity { .. } => "CONFIG_RESERVED_IDENTITY",
            Self::InvalidTable { .. } => "CONFIG_INVALID_TABLE",
        }
    }
}
