use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use judge_core::{
    AttributeStore, ClockTickEvent, JudgeSystemStage, MatchSettleEvent, Properties, RuleTables,
    StageChangedEvent, TimeLimit,
};
use tracing::{debug, info};

use super::{StageControl, StageError, StageView};
use crate::bus::{BusContext, EventBus, Handler, HandlerCriticality, HandlerError};
use crate::cancel::Cancellation;
use crate::systems::{RuleSystem, SystemError};

const NAME: &str = "stage_clock";

/// Holds the current stage; elapsed time lives in the `stage_elapsed_ms`
/// attribute so every system reads the same value.
pub struct StageClock {
    tables: Arc<dyn RuleTables>,
    store: Arc<AttributeStore>,
    props: Arc<Properties>,
    stage: AtomicU8,
}

impl StageClock {
    pub fn new(tables: Arc<dyn RuleTables>, store: Arc<AttributeStore>, props: Arc<Properties>) -> Self {
        Self {
            tables,
            store,
            props,
            stage: AtomicU8::new(JudgeSystemStage::OutOfMatch as u8),
        }
    }

    /// Configured limit of the current stage.
    pub fn limit(&self) -> Result<TimeLimit, StageError> {
        Ok(self.tables.stage_limit(self.stage())?)
    }

    /// Milliseconds left in the current stage, `None` when unbounded.
    pub fn remaining(&self) -> Result<Option<u64>, StageError> {
        let elapsed = self.elapsed_ms();
        Ok(self
            .limit()?
            .as_millis()
            .map(|limit| limit.saturating_sub(elapsed)))
    }

    pub fn is_expired(&self) -> Result<bool, StageError> {
        Ok(self.limit()?.is_expired(self.elapsed_ms()))
    }

    /// Adds `delta_ms` to the time spent in the current stage.
    ///
    /// Time does not accumulate while out of match.
    pub fn advance(&self, delta_ms: u32) -> u64 {
        if self.stage() == JudgeSystemStage::OutOfMatch {
            return self.elapsed_ms();
        }
        self.props
            .stage_elapsed_ms
            .update(&self.store, |elapsed| elapsed.saturating_add(u64::from(delta_ms)))
    }
}

impl StageView for StageClock {
    fn stage(&self) -> JudgeSystemStage {
        JudgeSystemStage::from_repr(self.stage.load(Ordering::SeqCst)).unwrap_or_default()
    }

    fn elapsed_ms(&self) -> u64 {
        self.props.stage_elapsed_ms.get(&self.store)
    }
}

#[async_trait]
impl StageControl for StageClock {
    async fn set_stage(&self, next: JudgeSystemStage, ctx: &BusContext) -> Result<(), StageError> {
        // Validate before mutating so a bad table leaves the clock untouched.
        let limit = self.tables.stage_limit(next)?;

        let prev = JudgeSystemStage::from_repr(self.stage.swap(next as u8, Ordering::SeqCst))
            .unwrap_or_default();
        self.props.stage_elapsed_ms.set(&self.store, 0);

        info!(
            target: "runtime::stage",
            prev = %prev,
            next = %next,
            limit = %limit,
            "Stage changed"
        );

        ctx.publish(StageChangedEvent { prev, next }).await?;
        Ok(())
    }
}

#[async_trait]
impl RuleSystem for StageClock {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        cancel.check(NAME)?;
        self.stage
            .store(JudgeSystemStage::OutOfMatch as u8, Ordering::SeqCst);
        self.props.stage_elapsed_ms.set(&self.store, 0);
        debug!(target: "runtime::stage", "Clock reset to out_of_match");
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<ClockTickEvent, _>(self.clone());
        bus.add_handler::<MatchSettleEvent, _>(self);
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for StageClock {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Elapsed time must be current before systems read it.
    fn priority(&self) -> i32 {
        -100
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, tick: &ClockTickEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        self.advance(tick.delta_ms);
        Ok(())
    }
}

#[async_trait]
impl Handler<MatchSettleEvent> for StageClock {
    fn name(&self) -> &'static str {
        NAME
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, event: &MatchSettleEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if self.stage() == JudgeSystemStage::Settlement {
            debug!(target: "runtime::stage", reason = %event.reason, "Already settling");
            return Ok(());
        }
        self.set_stage(JudgeSystemStage::Settlement, ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use judge_content::{StaticTables, TablesLoader};
    use judge_core::{SettleReason, Topic};

    use super::*;

    fn clock_with(tables: StaticTables) -> (Arc<StageClock>, EventBus) {
        let (props, _) = Properties::build().unwrap();
        let clock = Arc::new(StageClock::new(
            Arc::new(tables),
            Arc::new(AttributeStore::new()),
            Arc::new(props),
        ));
        let bus = EventBus::new();
        clock.clone().attach(&bus);
        (clock, bus)
    }

    fn clock() -> (Arc<StageClock>, EventBus) {
        clock_with(TablesLoader::reference().unwrap())
    }

    #[tokio::test]
    async fn each_transition_publishes_one_event() {
        let (clock, bus) = clock();
        let mut events = bus.subscribe(Topic::Event);
        assert_eq!(clock.stage(), JudgeSystemStage::OutOfMatch);

        clock
            .set_stage(JudgeSystemStage::Repair, &bus.context())
            .await
            .unwrap();
        clock
            .set_stage(JudgeSystemStage::SelfCheck, &bus.context())
            .await
            .unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(
            first.downcast::<StageChangedEvent>(),
            Some(&StageChangedEvent {
                prev: JudgeSystemStage::OutOfMatch,
                next: JudgeSystemStage::Repair,
            })
        );
        let second = events.recv().await.unwrap();
        assert_eq!(
            second.downcast::<StageChangedEvent>(),
            Some(&StageChangedEvent {
                prev: JudgeSystemStage::Repair,
                next: JudgeSystemStage::SelfCheck,
            })
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn limits_follow_the_tables() {
        let (clock, bus) = clock();
        assert_eq!(clock.limit().unwrap(), TimeLimit::Unbounded);
        assert_eq!(clock.remaining().unwrap(), None);

        clock
            .set_stage(JudgeSystemStage::Countdown, &bus.context())
            .await
            .unwrap();
        assert_eq!(clock.limit().unwrap(), TimeLimit::Seconds(5));

        bus.publish(ClockTickEvent { tick: 1, delta_ms: 4_000 })
            .await
            .unwrap();
        assert_eq!(clock.remaining().unwrap(), Some(1_000));
        assert!(!clock.is_expired().unwrap());

        bus.publish(ClockTickEvent { tick: 2, delta_ms: 1_000 })
            .await
            .unwrap();
        assert!(clock.is_expired().unwrap());

        clock
            .set_stage(JudgeSystemStage::Match, &bus.context())
            .await
            .unwrap();
        assert_eq!(clock.elapsed_ms(), 0);
    }

    #[tokio::test]
    async fn time_stands_still_out_of_match() {
        let (clock, bus) = clock();
        bus.publish(ClockTickEvent { tick: 1, delta_ms: 500 })
            .await
            .unwrap();
        assert_eq!(clock.elapsed_ms(), 0);
    }

    #[tokio::test]
    async fn settle_event_moves_to_settlement_once() {
        let (clock, bus) = clock();
        clock
            .set_stage(JudgeSystemStage::Match, &bus.context())
            .await
            .unwrap();
        let mut events = bus.subscribe(Topic::Event);

        for _ in 0..2 {
            bus.publish(MatchSettleEvent {
                winner: None,
                reason: SettleReason::Draw,
            })
            .await
            .unwrap();
        }

        assert_eq!(clock.stage(), JudgeSystemStage::Settlement);
        let changes = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|envelope| envelope.downcast::<StageChangedEvent>().is_some())
            .count();
        assert_eq!(changes, 1);
    }

    #[tokio::test]
    async fn reset_returns_to_out_of_match_silently() {
        let (clock, bus) = clock();
        clock
            .set_stage(JudgeSystemStage::Match, &bus.context())
            .await
            .unwrap();
        let mut events = bus.subscribe(Topic::Event);

        clock.reset(&Cancellation::new()).await.unwrap();

        assert_eq!(clock.stage(), JudgeSystemStage::OutOfMatch);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn stage_limit_overrides_apply() {
        let tables = TablesLoader::reference()
            .unwrap()
            .with_stage_limit(JudgeSystemStage::Repair, TimeLimit::Seconds(1));
        let (clock, bus) = clock_with(tables);
        clock
            .set_stage(JudgeSystemStage::Repair, &bus.context())
            .await
            .unwrap();
        assert_eq!(clock.limit().unwrap(), TimeLimit::Seconds(1));
    }
}
