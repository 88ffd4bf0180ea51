//! Cloneable façade for feeding and observing a running judge.
//!
//! [`JudgeHandle`] hides the bus and clock plumbing and offers async helpers
//! for submitting referee input or streaming messages from specific topics.
use std::sync::Arc;

use judge_core::{
    AttributeStore, JudgeSystemStage, Message, Properties, Roster, RuleTables, Topic,
};
use tokio::sync::broadcast;

use super::errors::Result;
use crate::bus::{Envelope, EventBus, Outcome};
use crate::stage::{StageClock, StageControl, StageView};

/// Client-facing handle to interact with the judge
#[derive(Clone)]
pub struct JudgeHandle {
    bus: EventBus,
    clock: Arc<StageClock>,
    store: Arc<AttributeStore>,
    props: Arc<Properties>,
    roster: Arc<Roster>,
    tables: Arc<dyn RuleTables>,
}

impl JudgeHandle {
    pub(crate) fn new(
        bus: EventBus,
        clock: Arc<StageClock>,
        store: Arc<AttributeStore>,
        props: Arc<Properties>,
        roster: Arc<Roster>,
        tables: Arc<dyn RuleTables>,
    ) -> Self {
        Self {
            bus,
            clock,
            store,
            props,
            roster,
            tables,
        }
    }

    /// Submit input received from outside the judge (referee console, sensors).
    ///
    /// External commands are refused until the match has been started.
    pub async fn submit<M: Message>(&self, message: M) -> Result<Outcome> {
        Ok(self.bus.submit(message).await?)
    }

    /// Publish a message on behalf of the judge itself.
    pub async fn publish<M: Message>(&self, message: M) -> Result<Outcome> {
        Ok(self.bus.publish(message).await?)
    }

    /// Subscribe to messages from a specific topic
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use judge_core::{MatchSettleEvent, Topic};
    ///
    /// let mut events = handle.subscribe(Topic::Event);
    /// while let Ok(envelope) = events.recv().await {
    ///     if let Some(settle) = envelope.downcast::<MatchSettleEvent>() {
    ///         println!("{:?} wins", settle.winner);
    ///     }
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Envelope> {
        self.bus.subscribe(topic)
    }

    pub fn stage(&self) -> JudgeSystemStage {
        self.clock.stage()
    }

    /// Milliseconds left in the current stage, `None` when unbounded.
    pub fn remaining(&self) -> Result<Option<u64>> {
        Ok(self.clock.remaining()?)
    }

    /// Referee override of the current stage.
    pub async fn set_stage(&self, next: JudgeSystemStage) -> Result<()> {
        self.clock.set_stage(next, &self.bus.context()).await?;
        Ok(())
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn tables(&self) -> &dyn RuleTables {
        self.tables.as_ref()
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }
}
