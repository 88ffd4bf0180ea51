//! Win points and per-robot statistics.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Camp, DamageAppliedEvent, Identity, JudgePenaltyEvent, JudgeSystemStage, KillEvent, Property,
    WinPointCommand,
};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "score";

/// Referees may still correct win points while the result is settled.
const WIN_POINT_STAGES: &[JudgeSystemStage] = &[JudgeSystemStage::Match, JudgeSystemStage::Settlement];

pub struct ScoreSystem {
    ctx: SystemContext,
}

impl ScoreSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// Adds `amount` to both the robot's and its camp's counter.
    fn count(&self, property: Property<u32>, identity: Identity, amount: u32) {
        let store = &self.ctx.store;
        property.update_for(store, identity, |n| n.saturating_add(amount));
        property.update_camp(store, identity.camp, |n| n.saturating_add(amount));
    }

    fn stats(&self) -> [Property<u32>; 3] {
        let props = &self.ctx.props;
        [props.kills, props.damage_dealt, props.penalties]
    }
}

#[async_trait]
impl RuleSystem for ScoreSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let store = &self.ctx.store;
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            for stat in self.stats() {
                stat.set_for(store, entity.identity(), 0);
            }
        }
        for camp in Camp::COMPETING {
            self.ctx.props.win_point.set_camp(store, camp, 0);
            for stat in self.stats() {
                stat.set_camp(store, camp, 0);
            }
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<WinPointCommand, _>(self.clone());
        bus.add_handler::<KillEvent, _>(self.clone());
        bus.add_handler::<DamageAppliedEvent, _>(self.clone());
        bus.add_handler::<JudgePenaltyEvent, _>(self);
    }
}

#[async_trait]
impl Handler<WinPointCommand> for ScoreSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, command: &WinPointCommand, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.accepts(NAME, "win_point_command", WIN_POINT_STAGES) {
            return Ok(());
        }
        if command.camp.opponent().is_none() {
            debug!(target: "runtime::systems", camp = %command.camp, "Win points for a non-competing camp");
            return Ok(());
        }
        self.ctx
            .props
            .win_point
            .set_camp(&self.ctx.store, command.camp, command.new_win_point);
        info!(
            target: "runtime::systems",
            camp = %command.camp,
            win_point = command.new_win_point,
            "Win points set"
        );
        Ok(())
    }
}

#[async_trait]
impl Handler<KillEvent> for ScoreSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &KillEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "kill_event") || !self.ctx.roster.contains(event.killer) {
            return Ok(());
        }
        self.count(self.ctx.props.kills, event.killer, 1);

        let rules = self.ctx.tables.score();
        let structure = self
            .ctx
            .roster
            .get(event.victim)
            .is_some_and(|victim| victim.variant().is_structure());
        let points = if structure {
            rules.structure_kill_points
        } else {
            rules.kill_points
        };
        self.ctx
            .props
            .win_point
            .update_camp(&self.ctx.store, event.killer.camp, |wp| wp.saturating_add(points));
        Ok(())
    }
}

#[async_trait]
impl Handler<DamageAppliedEvent> for ScoreSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &DamageAppliedEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if self.ctx.roster.contains(event.shooter) {
            self.count(self.ctx.props.damage_dealt, event.shooter, event.amount);
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<JudgePenaltyEvent> for ScoreSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &JudgePenaltyEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.running(NAME, "judge_penalty_event") || !self.ctx.roster.contains(event.target_id) {
            return Ok(());
        }
        self.count(self.ctx.props.penalties, event.target_id, 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use judge_core::PenaltyType;

    use super::*;
    use crate::systems::testing;

    const RED_HERO: Identity = Identity::new(Camp::Red, 1);

    async fn system() -> (Arc<ScoreSystem>, EventBus, Arc<testing::FixedStage>) {
        let (ctx, stage) = testing::context();
        let system = Arc::new(ScoreSystem::new(ctx));
        system.reset(&Cancellation::new()).await.unwrap();
        let bus = EventBus::new();
        system.clone().attach(&bus);
        (system, bus, stage)
    }

    #[tokio::test]
    async fn kills_score_points_and_count_per_robot_and_camp() {
        let (system, bus, _) = system().await;
        let ctx = &system.ctx;
        for victim in [Identity::new(Camp::Blue, 3), Identity::new(Camp::Blue, 8)] {
            bus.publish(KillEvent { time: 0, killer: RED_HERO, victim })
                .await
                .unwrap();
        }

        assert_eq!(ctx.props.kills.get_for(&ctx.store, RED_HERO), 2);
        assert_eq!(ctx.props.kills.get_camp(&ctx.store, Camp::Red), 2);
        assert_eq!(ctx.props.win_point.get_camp(&ctx.store, Camp::Red), 60);
    }

    #[tokio::test]
    async fn referee_sets_win_points_until_settled() {
        let (system, bus, stage) = system().await;
        let ctx = &system.ctx;
        let set = |new_win_point| WinPointCommand { camp: Camp::Blue, new_win_point };

        bus.publish(set(7)).await.unwrap();
        stage.set(JudgeSystemStage::Settlement);
        bus.publish(set(9)).await.unwrap();
        stage.set(JudgeSystemStage::Repair);
        bus.publish(set(11)).await.unwrap();

        assert_eq!(ctx.props.win_point.get_camp(&ctx.store, Camp::Blue), 9);
    }

    #[tokio::test]
    async fn damage_and_penalties_are_tallied() {
        let (system, bus, _) = system().await;
        let ctx = &system.ctx;
        bus.publish(DamageAppliedEvent {
            shooter: RED_HERO,
            victim: Identity::new(Camp::Blue, 3),
            amount: 100,
            remaining: 100,
        })
        .await
        .unwrap();
        bus.publish(JudgePenaltyEvent {
            penalty_type: PenaltyType::YellowCard,
            target_id: RED_HERO,
            judge_id: 4,
            reason: "pushing".into(),
        })
        .await
        .unwrap();

        assert_eq!(ctx.props.damage_dealt.get_camp(&ctx.store, Camp::Red), 100);
        assert_eq!(ctx.props.penalties.get_for(&ctx.store, RED_HERO), 1);
    }
}
