//! Dispatch outcomes and errors.

use thiserror::Error;

use super::HandlerCriticality;
use crate::stage::StageError;

/// Result of one publish.
#[derive(Debug)]
pub enum Outcome {
    /// The message passed every interceptor and reached its handlers.
    Delivered(DispatchReport),
    /// An interceptor short-circuited the chain.
    Dropped { by: &'static str },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered(_))
    }

    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            Outcome::Delivered(report) => Some(report),
            Outcome::Dropped { .. } => None,
        }
    }
}

/// What happened to the handlers of one delivered message.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handlers invoked.
    pub handled: usize,
    /// Failures of critical and important handlers.
    pub failures: Vec<HandlerFailure>,
    /// Failures of optional handlers, counted only.
    pub suppressed: usize,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_critical_failure(&self) -> bool {
        self.failures
            .iter()
            .any(|failure| failure.criticality == HandlerCriticality::Critical)
    }
}

#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub criticality: HandlerCriticality,
    pub error: HandlerError,
}

/// Failure of a single publish.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("interceptor {name} failed: {reason}")]
    Interceptor { name: &'static str, reason: String },

    #[error("{message} published at depth {depth}, handlers are publishing in a loop")]
    DepthExceeded { message: &'static str, depth: u8 },
}

/// Failure reported by a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("{reason}")]
    Failed { reason: String },
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}
