//! Interceptor chain.
//!
//! Interceptors wrap delivery in registration order. Each one either
//! short-circuits by returning [`Outcome::Dropped`] or hands the envelope on
//! with [`Next::run`]; the last `next` delivers to handlers.

use std::sync::Arc;

use async_trait::async_trait;

use super::{BusContext, DispatchError, Envelope, Outcome};

/// Intercepts every message published on a bus.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn intercept(&self, envelope: Envelope, next: Next<'_>) -> Result<Outcome, DispatchError>;
}

/// Continuation of the chain after the current interceptor.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Interceptor>],
    ctx: &'a BusContext,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Interceptor>], ctx: &'a BusContext) -> Self {
        Self { chain, ctx }
    }

    /// Forwards `envelope` to the rest of the chain.
    pub async fn run(self, envelope: Envelope) -> Result<Outcome, DispatchError> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.intercept(envelope, Next::new(rest, self.ctx))
                    .await
            }
            None => Ok(Outcome::Delivered(self.ctx.deliver(&envelope).await)),
        }
    }
}
