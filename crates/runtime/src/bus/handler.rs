//! Typed message handlers.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use judge_core::Message;

use super::{BusContext, HandlerError};

/// Defines the criticality level of a handler for error handling.
///
/// Failures never stop sibling handlers; criticality decides how loudly a
/// failure is logged and whether it is flagged in the
/// [`DispatchReport`](super::DispatchReport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HandlerCriticality {
    /// Keeps match state consistent. Logged as error and flagged.
    Critical,

    /// Default. Logged as warning and flagged.
    Important,

    /// Cosmetic or telemetry. Logged at debug and only counted.
    Optional,
}

/// Reacts to one message type.
///
/// Handlers of a type run in subscription order: ascending [`priority`], then
/// registration order.
///
/// [`priority`]: Handler::priority
#[async_trait]
pub trait Handler<M: Message>: Send + Sync {
    /// Returns a human-readable name for this handler (used in logging and reports).
    fn name(&self) -> &'static str;

    /// Lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    async fn handle(&self, message: &M, ctx: &BusContext) -> Result<(), HandlerError>;
}

/// Type-erased handler stored by the bus.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    fn criticality(&self) -> HandlerCriticality;

    async fn call(&self, message: &dyn Message, ctx: &BusContext) -> Result<(), HandlerError>;
}

pub(crate) struct Typed<M, H> {
    handler: Arc<H>,
    _message: PhantomData<fn(&M)>,
}

impl<M, H> Typed<M, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _message: PhantomData,
        }
    }
}

#[async_trait]
impl<M, H> ErasedHandler for Typed<M, H>
where
    M: Message,
    H: Handler<M> + 'static,
{
    fn name(&self) -> &'static str {
        self.handler.name()
    }

    fn priority(&self) -> i32 {
        self.handler.priority()
    }

    fn criticality(&self) -> HandlerCriticality {
        self.handler.criticality()
    }

    async fn call(&self, message: &dyn Message, ctx: &BusContext) -> Result<(), HandlerError> {
        let Some(message) = message.as_any().downcast_ref::<M>() else {
            return Err(HandlerError::failed(format!(
                "{} routed to handler {} of another type",
                message.name(),
                self.handler.name()
            )));
        };
        self.handler.handle(message, ctx).await
    }
}

/// A subscribed handler with its ordering key.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) seq: u64,
    pub(crate) handler: Arc<dyn ErasedHandler>,
}
