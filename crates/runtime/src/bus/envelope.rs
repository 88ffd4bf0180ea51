//! Message envelope travelling through the interceptor chain.

use std::sync::Arc;

use judge_core::{Message, Topic};

/// Where a message entered the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Origin {
    /// Referee console, sensors, or any caller outside the rule systems.
    External,
    /// Published by a rule system or the stage clock.
    Internal,
}

/// A published message plus routing metadata.
///
/// Cheap to clone; the message itself is shared.
#[derive(Clone, Debug)]
pub struct Envelope {
    seq: u64,
    origin: Origin,
    depth: u8,
    message: Arc<dyn Message>,
}

impl Envelope {
    pub(crate) fn new(seq: u64, origin: Origin, depth: u8, message: Arc<dyn Message>) -> Self {
        Self {
            seq,
            origin,
            depth,
            message,
        }
    }

    /// Per-bus publish sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Nesting level: 0 for a root publish, +1 for each handler-published message.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn topic(&self) -> Topic {
        self.message.topic()
    }

    pub fn name(&self) -> &'static str {
        self.message.name()
    }

    pub fn message(&self) -> &dyn Message {
        self.message.as_ref()
    }

    /// Downcasts the payload.
    pub fn downcast<M: Message>(&self) -> Option<&M> {
        self.message.as_any().downcast_ref::<M>()
    }
}
