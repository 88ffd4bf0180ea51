//! Zone buffs, healing and post-revive invincibility.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Camp, ClockTickEvent, EnterZoneEvent, ExitZoneEvent, Identity, ReviveEvent, ZoneKind, ZoneRule,
};
use tracing::debug;

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "buff";

/// Millionths of a health point per point.
const HEAL_UNIT: u64 = 1_000_000;

pub struct BuffSystem {
    ctx: SystemContext,
}

impl BuffSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// Zone rule granting its effect to `operator`, if any.
    fn serving_zone(&self, zone_id: u32, operator: Identity) -> Option<&ZoneRule> {
        let zone = self.ctx.tables.zone(zone_id)?;
        if !self.ctx.roster.contains(operator) || !zone.serves(operator.camp) {
            debug!(
                target: "runtime::systems",
                zone = zone_id,
                %operator,
                "Zone grants nothing to this operator"
            );
            return None;
        }
        Some(zone)
    }

    fn apply_zone(&self, zone: &ZoneRule, operator: Identity, inside: bool) {
        let buffs = self.ctx.tables.buffs();
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        match zone.kind {
            ZoneKind::Fortress => {
                let value = if inside { buffs.fortress_defense } else { 0.0 };
                props.defense_buff.set_for(store, operator, value);
            }
            ZoneKind::Highland => {
                let value = if inside { buffs.highland_cooling } else { 0.0 };
                props.cooling_buff.set_for(store, operator, value);
            }
            ZoneKind::Healing | ZoneKind::Supply => {}
        }
    }
}

#[async_trait]
impl RuleSystem for BuffSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            let identity = entity.identity();
            props.defense_buff.set_for(store, identity, 0.0);
            props.cooling_buff.set_for(store, identity, 0.0);
            props.invincible_ms.set_for(store, identity, 0);
            props.heal_carry.set_for(store, identity, 0);
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<EnterZoneEvent, _>(self.clone());
        bus.add_handler::<ExitZoneEvent, _>(self.clone());
        bus.add_handler::<ReviveEvent, _>(self.clone());
        bus.add_handler::<ClockTickEvent, _>(self);
    }
}

#[async_trait]
impl Handler<EnterZoneEvent> for BuffSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &EnterZoneEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.running(NAME, "enter_zone_event") {
            return Ok(());
        }
        if let Some(zone) = self.serving_zone(event.zone_id, event.operator_id) {
            self.apply_zone(zone, event.operator_id, true);
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<ExitZoneEvent> for BuffSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &ExitZoneEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.running(NAME, "exit_zone_event") {
            return Ok(());
        }
        if let Some(zone) = self.serving_zone(event.zone_id, event.operator_id) {
            self.apply_zone(zone, event.operator_id, false);
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<ReviveEvent> for BuffSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &ReviveEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        let window = self.ctx.tables.buffs().revive_invincible_secs.saturating_mul(1000);
        self.ctx
            .props
            .invincible_ms
            .set_for(&self.ctx.store, event.reviver, window);
        Ok(())
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for BuffSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, tick: &ClockTickEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.stage().is_match() {
            return Ok(());
        }
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let healing_rate = self.ctx.tables.buffs().healing_per_sec;
        let mut healed_camps: Vec<Camp> = Vec::new();

        for entity in self.ctx.roster.iter() {
            let identity = entity.identity();
            props
                .invincible_ms
                .update_for(store, identity, |ms| ms.saturating_sub(tick.delta_ms));

            let Some(healthed) = entity.as_healthed() else {
                continue;
            };
            let in_healing_zone = self
                .ctx
                .tables
                .zone(props.zone.get_for(store, identity))
                .is_some_and(|zone| zone.kind == ZoneKind::Healing && zone.serves(identity.camp));
            if !in_healing_zone
                || !healthed.is_alive()
                || healthed.health() >= healthed.max_health()
            {
                props.heal_carry.set_for(store, identity, 0);
                continue;
            }
            // Whole points are applied; the remainder waits for later ticks.
            let earned = (f64::from(healthed.max_health())
                * f64::from(healing_rate)
                * f64::from(tick.delta_ms)
                * 1_000.0)
                .round() as u64;
            let owed = u64::from(props.heal_carry.get_for(store, identity)) + earned;
            let amount = owed / HEAL_UNIT;
            props
                .heal_carry
                .set_for(store, identity, (owed % HEAL_UNIT) as u32);
            if amount > 0 {
                healthed.heal(u32::try_from(amount).unwrap_or(u32::MAX));
                if !healed_camps.contains(&identity.camp) {
                    healed_camps.push(identity.camp);
                }
            }
        }

        for camp in healed_camps {
            self.ctx.refresh_camp_health(camp);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing;

    const RED_INFANTRY: Identity = Identity::new(Camp::Red, 3);

    async fn system() -> (Arc<BuffSystem>, EventBus) {
        let (ctx, _) = testing::context();
        let system = Arc::new(BuffSystem::new(ctx));
        system.reset(&Cancellation::new()).await.unwrap();
        let bus = EventBus::new();
        system.clone().attach(&bus);
        (system, bus)
    }

    #[tokio::test]
    async fn fortress_grants_defense_to_its_camp_only() {
        let (system, bus) = system().await;
        let defense = |id| system.ctx.props.defense_buff.get_for(&system.ctx.store, id);

        bus.publish(EnterZoneEvent { zone_id: 5, operator_id: RED_INFANTRY })
            .await
            .unwrap();
        assert_eq!(defense(RED_INFANTRY), 0.5);

        let blue = Identity::new(Camp::Blue, 3);
        bus.publish(EnterZoneEvent { zone_id: 5, operator_id: blue })
            .await
            .unwrap();
        assert_eq!(defense(blue), 0.0);

        bus.publish(ExitZoneEvent { zone_id: 5, operator_id: RED_INFANTRY })
            .await
            .unwrap();
        assert_eq!(defense(RED_INFANTRY), 0.0);
    }

    #[tokio::test]
    async fn revive_grants_a_decaying_invincibility_window() {
        let (system, bus) = system().await;
        let invincible = || system.ctx.props.invincible_ms.get_for(&system.ctx.store, RED_INFANTRY);

        bus.publish(ReviveEvent { time: 0, reviver: RED_INFANTRY })
            .await
            .unwrap();
        assert_eq!(invincible(), 10_000);

        bus.publish(ClockTickEvent { tick: 1, delta_ms: 4_000 })
            .await
            .unwrap();
        assert_eq!(invincible(), 6_000);
    }

    #[tokio::test]
    async fn healing_zone_restores_health_over_time() {
        let (system, bus) = system().await;
        let ctx = &system.ctx;
        let healthed = ctx.roster.healthed(RED_INFANTRY).unwrap();
        healthed.set_max_health(200);
        healthed.set_health(100);
        healthed.set_alive(true);
        ctx.props.zone.set_for(&ctx.store, RED_INFANTRY, 3);

        bus.publish(ClockTickEvent { tick: 1, delta_ms: 1_000 })
            .await
            .unwrap();

        assert_eq!(healthed.health(), 120);
    }

    async fn heal_in_steps(delta_ms: u32, ticks: u32) -> u32 {
        let (system, bus) = system().await;
        let ctx = &system.ctx;
        let healthed = ctx.roster.healthed(RED_INFANTRY).unwrap();
        healthed.set_max_health(200);
        healthed.set_health(100);
        healthed.set_alive(true);
        ctx.props.zone.set_for(&ctx.store, RED_INFANTRY, 3);

        for tick in 0..ticks {
            bus.publish(ClockTickEvent { tick: tick.into(), delta_ms })
                .await
                .unwrap();
        }
        healthed.health()
    }

    #[tokio::test]
    async fn healing_rate_does_not_depend_on_tick_size() {
        // 10% of 200 per second is 20 points over one second.
        assert_eq!(heal_in_steps(20, 50).await, 120);
        assert_eq!(heal_in_steps(25, 40).await, 120);
        assert_eq!(heal_in_steps(100, 10).await, 120);
    }
}
