//! Event bus implementation.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use judge_core::{Message, Topic};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

use super::handler::{Registration, Typed};
use super::{
    DispatchError, DispatchReport, Envelope, Handler, HandlerCriticality, HandlerError,
    HandlerFailure, Interceptor, Next, Origin, Outcome,
};

/// Maximum nesting of handler-published messages.
pub const MAX_PUBLISH_DEPTH: u8 = 16;

/// Typed publish/dispatch pipeline with an ordered interceptor chain.
///
/// Cloning yields another handle to the same bus. Separate `EventBus::new()`
/// instances share nothing.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

struct Inner {
    interceptors: RwLock<Arc<[Arc<dyn Interceptor>]>>,
    handlers: RwLock<HashMap<TypeId, Arc<[Registration]>>>,
    channels: HashMap<Topic, broadcast::Sender<Envelope>>,
    seq: AtomicU64,
    subscriptions: AtomicU64,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();

        Self {
            inner: Arc::new(Inner {
                interceptors: RwLock::new(Arc::from(Vec::new())),
                handlers: RwLock::new(HashMap::new()),
                channels,
                seq: AtomicU64::new(0),
                subscriptions: AtomicU64::new(0),
            }),
        }
    }

    /// Appends an interceptor to the end of the chain.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        let mut chain = self
            .inner
            .interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<_> = chain.iter().cloned().collect();
        next.push(interceptor);
        *chain = next.into();
    }

    /// Subscribes `handler` to messages of type `M`.
    pub fn add_handler<M, H>(&self, handler: Arc<H>)
    where
        M: Message,
        H: Handler<M> + 'static,
    {
        let registration = Registration {
            seq: self.inner.subscriptions.fetch_add(1, Ordering::Relaxed),
            handler: Arc::new(Typed::<M, H>::new(handler)),
        };

        let mut handlers = self
            .inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = handlers
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Arc::from(Vec::new()));
        let mut next: Vec<_> = slot.iter().cloned().collect();
        next.push(registration);
        next.sort_by_key(|r| (r.handler.priority(), r.seq));
        *slot = next.into();
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that sees every delivered message of that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Envelope> {
        match self.inner.channels.get(&topic) {
            Some(tx) => tx.subscribe(),
            // Every topic gets a channel at construction.
            None => broadcast::channel(1).1,
        }
    }

    /// Context for publishing at the root level.
    pub fn context(&self) -> BusContext {
        BusContext {
            bus: self.clone(),
            depth: 0,
        }
    }

    /// Publishes a message on behalf of the judge system itself.
    pub async fn publish<M: Message>(&self, message: M) -> Result<Outcome, DispatchError> {
        self.dispatch(Arc::new(message), Origin::Internal, 0).await
    }

    /// Publishes a message received from outside the judge system.
    pub async fn submit<M: Message>(&self, message: M) -> Result<Outcome, DispatchError> {
        self.dispatch(Arc::new(message), Origin::External, 0).await
    }

    /// Publishes an already shared message.
    pub async fn dispatch(
        &self,
        message: Arc<dyn Message>,
        origin: Origin,
        depth: u8,
    ) -> Result<Outcome, DispatchError> {
        if depth > MAX_PUBLISH_DEPTH {
            return Err(DispatchError::DepthExceeded {
                message: message.name(),
                depth,
            });
        }

        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope::new(seq, origin, depth, message);
        let chain = self.interceptors();
        let ctx = BusContext {
            bus: self.clone(),
            depth: depth + 1,
        };

        Next::new(&chain, &ctx).run(envelope).await
    }

    /// Names of the registered interceptors, in chain order.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors().iter().map(|i| i.name()).collect()
    }

    /// Names of the handlers subscribed to `M`, in invocation order.
    pub fn handler_names<M: Message>(&self) -> Vec<&'static str> {
        self.handlers_for(TypeId::of::<M>())
            .iter()
            .map(|r| r.handler.name())
            .collect()
    }

    fn interceptors(&self) -> Arc<[Arc<dyn Interceptor>]> {
        self.inner
            .interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn handlers_for(&self, type_id: TypeId) -> Arc<[Registration]> {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing context handed to handlers.
///
/// Messages published through a context are nested one level below the
/// message being handled.
#[derive(Clone)]
pub struct BusContext {
    bus: EventBus,
    depth: u8,
}

impl BusContext {
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub async fn publish<M: Message>(&self, message: M) -> Result<Outcome, DispatchError> {
        self.bus
            .dispatch(Arc::new(message), Origin::Internal, self.depth)
            .await
    }

    /// Broadcasts `envelope` and runs its handlers in order.
    pub(crate) async fn deliver(&self, envelope: &Envelope) -> DispatchReport {
        if let Some(tx) = self.bus.inner.channels.get(&envelope.topic())
            && tx.send(envelope.clone()).is_err()
        {
            // No subscribers for this topic - this is normal, not an error
            trace!(target: "runtime::bus", topic = %envelope.topic(), "No topic subscribers");
        }

        let type_id = envelope.message().as_any().type_id();
        let registrations = self.bus.handlers_for(type_id);
        let mut report = DispatchReport::default();

        for registration in registrations.iter() {
            let handler = &registration.handler;
            report.handled += 1;
            if let Err(error) = handler.call(envelope.message(), self).await {
                record_failure(&mut report, envelope, handler.name(), handler.criticality(), error);
            }
        }

        report
    }
}

/// Logs a handler failure based on criticality level and records it.
fn record_failure(
    report: &mut DispatchReport,
    envelope: &Envelope,
    handler: &'static str,
    criticality: HandlerCriticality,
    error: HandlerError,
) {
    match criticality {
        HandlerCriticality::Critical => error!(
            target: "runtime::bus",
            handler,
            message = envelope.name(),
            seq = envelope.seq(),
            error = %error,
            "Critical handler failed"
        ),
        HandlerCriticality::Important => warn!(
            target: "runtime::bus",
            handler,
            message = envelope.name(),
            seq = envelope.seq(),
            error = %error,
            "Handler failed, continuing"
        ),
        HandlerCriticality::Optional => {
            debug!(
                target: "runtime::bus",
                handler,
                message = envelope.name(),
                error = %error,
                "Optional handler failed"
            );
            report.suppressed += 1;
            return;
        }
    }

    report.failures.push(HandlerFailure {
        handler,
        criticality,
        error,
    });
}
