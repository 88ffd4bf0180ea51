//! Match result.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Camp, JudgePenaltyEvent, JudgeSystemStage, KillEvent, MatchSettleEvent, PenaltyType,
    RobotVariant, Scope, SettleReason, StageChangedEvent,
};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerCriticality, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "settlement";

/// Decides the winner exactly once per match.
///
/// A match ends early when a base is destroyed or a camp is shown a red card.
/// Otherwise the result is decided when Match times out, comparing win points,
/// then base health, then total camp health.
pub struct SettlementSystem {
    ctx: SystemContext,
}

impl SettlementSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    async fn settle(
        &self,
        winner: Option<Camp>,
        reason: SettleReason,
        ctx: &BusContext,
    ) -> Result<(), HandlerError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let first = props.settled.try_modify(store, Scope::Single, |settled| {
            if settled { Err(settled) } else { Ok(true) }
        });
        if first.is_err() {
            debug!(target: "runtime::systems", %reason, "Match already settled");
            return Ok(());
        }

        props.winner.set(store, winner.map_or(0, Camp::code));
        props.settle_reason.set(store, reason as u8);
        info!(
            target: "runtime::systems",
            winner = ?winner,
            %reason,
            "Match settled"
        );
        ctx.publish(MatchSettleEvent { winner, reason }).await?;
        Ok(())
    }

    /// Timeout decision.
    fn decide(&self) -> (Option<Camp>, SettleReason) {
        let props = &self.ctx.props;
        let store = &self.ctx.store;

        let points = |camp| props.win_point.get_camp(store, camp);
        let base_health = |camp| {
            self.ctx
                .roster
                .find(camp, RobotVariant::Base)
                .and_then(|base| base.as_healthed())
                .map_or(0, |base| base.health())
        };
        let total_health = |camp| props.health.get_camp(store, camp);

        let criteria: [(SettleReason, Ordering); 3] = [
            (SettleReason::WinPoints, points(Camp::Red).cmp(&points(Camp::Blue))),
            (
                SettleReason::BaseHealth,
                base_health(Camp::Red).cmp(&base_health(Camp::Blue)),
            ),
            (
                SettleReason::TotalHealth,
                total_health(Camp::Red).cmp(&total_health(Camp::Blue)),
            ),
        ];
        criteria
            .into_iter()
            .find_map(|(reason, ordering)| match ordering {
                Ordering::Greater => Some((Some(Camp::Red), reason)),
                Ordering::Less => Some((Some(Camp::Blue), reason)),
                Ordering::Equal => None,
            })
            .unwrap_or((None, SettleReason::Draw))
    }

    fn is_settled(&self) -> bool {
        self.ctx.props.settled.get(&self.ctx.store)
    }
}

#[async_trait]
impl RuleSystem for SettlementSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        cancel.check(NAME)?;
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        props.settled.set(store, false);
        props.winner.set(store, 0);
        props.settle_reason.set(store, 0);
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<KillEvent, _>(self.clone());
        bus.add_handler::<JudgePenaltyEvent, _>(self.clone());
        bus.add_handler::<StageChangedEvent, _>(self);
    }
}

#[async_trait]
impl Handler<KillEvent> for SettlementSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Runs after the bookkeeping handlers of the kill.
    fn priority(&self) -> i32 {
        100
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, event: &KillEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "kill_event") {
            return Ok(());
        }
        let base_destroyed = self
            .ctx
            .roster
            .get(event.victim)
            .is_some_and(|victim| victim.variant() == RobotVariant::Base);
        if base_destroyed {
            self.settle(event.victim.camp.opponent(), SettleReason::BaseDestroyed, ctx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<JudgePenaltyEvent> for SettlementSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> i32 {
        100
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, event: &JudgePenaltyEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if event.penalty_type != PenaltyType::RedCard || !self.ctx.in_match(NAME, "judge_penalty_event") {
            return Ok(());
        }
        let Some(winner) = event.target_id.camp.opponent() else {
            debug!(target: "runtime::systems", target = %event.target_id, "Red card outside the camps");
            return Ok(());
        };
        self.settle(Some(winner), SettleReason::Disqualified, ctx).await
    }
}

#[async_trait]
impl Handler<StageChangedEvent> for SettlementSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, event: &StageChangedEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        let timed_out = event.prev == JudgeSystemStage::Match && event.next == JudgeSystemStage::Settlement;
        if !timed_out || self.is_settled() {
            return Ok(());
        }
        let (winner, reason) = self.decide();
        self.settle(winner, reason, ctx).await
    }
}
