//! Async runtime of the judge system.
//!
//! This crate wires the synchronous substrate of `judge-core` (attribute
//! store, property bindings, entities, messages) into a running match: an
//! event bus with an interceptor chain, the stage clock, the rule systems and
//! their orchestrated lifecycle. Consumers embed [`Judge`] to run a match,
//! feed referee input and observe results through [`JudgeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the composition root and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`bus`] provides the typed publish/dispatch pipeline
//! - [`stage`] holds the match-stage state machine
//! - [`systems`] implements the rule families of a match
//! - [`orchestrator`] sequences system resets and match start
//! - [`workers`] keeps background tasks (time keeping) apart from rule logic
pub mod api;
pub mod bus;
pub mod cancel;
pub mod orchestrator;
pub mod runtime;
pub mod stage;
pub mod systems;

mod workers;

pub use api::{JudgeHandle, Result, RuntimeError};
pub use bus::{
    AdmissionGate, BusContext, DispatchError, DispatchReport, Envelope, EventBus, Handler,
    HandlerCriticality, HandlerError, Interceptor, JudgeEventFilter, Next, Origin, Outcome,
    TracingInterceptor,
};
pub use cancel::Cancellation;
pub use orchestrator::SystemOrchestrator;
pub use runtime::{Judge, JudgeBuilder, JudgeConfig};
pub use stage::{StageClock, StageControl, StageError, StageView};
pub use systems::{RuleSystem, SystemContext, SystemError};
