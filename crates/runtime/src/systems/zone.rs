//! Zone occupancy.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{EnterZoneEvent, ExitZoneEvent};
use tracing::debug;

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "zone";

/// Tracks which zone each robot occupies.
///
/// Runs ahead of other zone handlers so they observe the updated occupancy.
pub struct ZoneSystem {
    ctx: SystemContext,
}

impl ZoneSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl RuleSystem for ZoneSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            self.ctx.props.zone.set_for(&self.ctx.store, entity.identity(), 0);
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<EnterZoneEvent, _>(self.clone());
        bus.add_handler::<ExitZoneEvent, _>(self);
    }
}

#[async_trait]
impl Handler<EnterZoneEvent> for ZoneSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> i32 {
        -10
    }

    async fn handle(&self, event: &EnterZoneEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.running(NAME, "enter_zone_event") {
            return Ok(());
        }
        if self.ctx.tables.zone(event.zone_id).is_none() || !self.ctx.roster.contains(event.operator_id) {
            debug!(
                target: "runtime::systems",
                zone = event.zone_id,
                operator = %event.operator_id,
                "Unknown zone or operator"
            );
            return Ok(());
        }
        self.ctx
            .props
            .zone
            .set_for(&self.ctx.store, event.operator_id, event.zone_id);
        Ok(())
    }
}

#[async_trait]
impl Handler<ExitZoneEvent> for ZoneSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> i32 {
        -10
    }

    async fn handle(&self, event: &ExitZoneEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.running(NAME, "exit_zone_event") || !self.ctx.roster.contains(event.operator_id) {
            return Ok(());
        }
        // A late exit from a zone already left must not clear the new one.
        let cleared = self.ctx.props.zone.try_update_for(
            &self.ctx.store,
            event.operator_id,
            |zone| if zone == event.zone_id { Ok(0) } else { Err(zone) },
        );
        if let Err(current) = cleared {
            debug!(
                target: "runtime::systems",
                zone = event.zone_id,
                current,
                operator = %event.operator_id,
                "Exit from a zone not occupied"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use judge_core::{Camp, Identity, JudgeSystemStage};

    use super::*;
    use crate::systems::testing;

    const BLUE_HERO: Identity = Identity::new(Camp::Blue, 1);

    #[tokio::test]
    async fn occupancy_follows_enter_and_exit() {
        let (ctx, stage) = testing::context();
        let system = Arc::new(ZoneSystem::new(ctx));
        let bus = EventBus::new();
        system.clone().attach(&bus);
        let zone = |system: &ZoneSystem| system.ctx.props.zone.get_for(&system.ctx.store, BLUE_HERO);

        bus.publish(EnterZoneEvent { zone_id: 2, operator_id: BLUE_HERO })
            .await
            .unwrap();
        assert_eq!(zone(&system), 2);

        bus.publish(EnterZoneEvent { zone_id: 6, operator_id: BLUE_HERO })
            .await
            .unwrap();
        bus.publish(ExitZoneEvent { zone_id: 2, operator_id: BLUE_HERO })
            .await
            .unwrap();
        assert_eq!(zone(&system), 6);

        bus.publish(ExitZoneEvent { zone_id: 6, operator_id: BLUE_HERO })
            .await
            .unwrap();
        assert_eq!(zone(&system), 0);

        bus.publish(EnterZoneEvent { zone_id: 99, operator_id: BLUE_HERO })
            .await
            .unwrap();
        assert_eq!(zone(&system), 0);

        stage.set(JudgeSystemStage::OutOfMatch);
        bus.publish(EnterZoneEvent { zone_id: 2, operator_id: BLUE_HERO })
            .await
            .unwrap();
        assert_eq!(zone(&system), 0);
    }
}
