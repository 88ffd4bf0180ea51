//! Chassis power budget.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Chassis, ChassisModeChangedEvent, ChassisModeCommand, ChassisPowerCommand, ClockTickEvent,
    ConfigError, Identity, JudgePenaltyEvent, JudgeSystemStage, LevelUpdateEvent, PenaltyType,
};
use tracing::{debug, info, warn};

use super::battle::AUTOMATIC_JUDGE;
use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "power";

/// Drains the energy buffer while a chassis draws more than its limit and
/// refills it otherwise. Emptying the buffer is penalised. Also owns chassis
/// mode switches, which are only accepted during repair.
pub struct PowerSystem {
    ctx: SystemContext,
}

impl PowerSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn refresh_limit(&self, chassis: &dyn Chassis) -> Result<f32, ConfigError> {
        let identity = chassis.identity();
        let profile = self.ctx.profile(identity, chassis.variant())?;
        let props = &self.ctx.props;
        props.power_limit.set_for(&self.ctx.store, identity, profile.power_limit);
        props
            .max_power_buffer
            .set_for(&self.ctx.store, identity, profile.power_buffer);
        Ok(profile.power_buffer)
    }
}

#[async_trait]
impl RuleSystem for PowerSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            let Some(chassis) = entity.as_chassis() else {
                continue;
            };
            let buffer = self.refresh_limit(chassis).map_err(SystemError::config(NAME))?;
            props.power_buffer.set_for(store, entity.identity(), buffer);
            props.power_draw.set_for(store, entity.identity(), 0.0);
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<ChassisPowerCommand, _>(self.clone());
        bus.add_handler::<ChassisModeCommand, _>(self.clone());
        bus.add_handler::<ClockTickEvent, _>(self.clone());
        bus.add_handler::<LevelUpdateEvent, _>(self);
    }
}

#[async_trait]
impl Handler<ChassisPowerCommand> for PowerSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, command: &ChassisPowerCommand, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "chassis_power_command") {
            return Ok(());
        }
        if self.ctx.roster.chassis(command.operator).is_none() {
            debug!(target: "runtime::systems", operator = %command.operator, "Robot has no chassis");
            return Ok(());
        }
        self.ctx
            .props
            .power_draw
            .set_for(&self.ctx.store, command.operator, command.power_w.max(0.0));
        Ok(())
    }
}

#[async_trait]
impl Handler<ChassisModeCommand> for PowerSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, command: &ChassisModeCommand, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self
            .ctx
            .accepts(NAME, "chassis_mode_command", &[JudgeSystemStage::Repair])
        {
            return Ok(());
        }
        let operator = command.operator;
        let Some(chassis) = self.ctx.roster.chassis(operator) else {
            debug!(target: "runtime::systems", %operator, "Robot has no chassis");
            return Ok(());
        };
        let prev = chassis.chassis_mode();
        if prev == command.mode {
            return Ok(());
        }
        let (_, level) = self.ctx.profile_key(operator);
        if self
            .ctx
            .tables
            .profile(chassis.variant(), command.mode, level)
            .is_err()
        {
            debug!(
                target: "runtime::systems",
                %operator,
                mode = %command.mode,
                "Chassis mode not available for this robot"
            );
            return Ok(());
        }

        chassis.set_chassis_mode(command.mode);
        let buffer = self
            .refresh_limit(chassis)
            .map_err(|err| HandlerError::failed(err.to_string()))?;
        self.ctx.props.power_buffer.set_for(&self.ctx.store, operator, buffer);
        info!(
            target: "runtime::systems",
            %operator,
            %prev,
            next = %command.mode,
            "Chassis mode changed"
        );
        ctx.publish(ChassisModeChangedEvent {
            operator,
            prev,
            next: command.mode,
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for PowerSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, tick: &ClockTickEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.stage().is_match() {
            return Ok(());
        }
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let dt = tick.delta_ms as f32 / 1000.0;
        let mut overruns: Vec<(Identity, f32)> = Vec::new();

        for entity in self.ctx.roster.iter() {
            if entity.as_chassis().is_none() {
                continue;
            }
            let identity = entity.identity();
            let draw = props.power_draw.get_for(store, identity);
            let limit = props.power_limit.get_for(store, identity);
            let max_buffer = props.max_power_buffer.get_for(store, identity);
            let excess = (draw - limit) * dt;

            let mut before = 0.0;
            let after = props.power_buffer.update_for(store, identity, |buffer| {
                before = buffer;
                (buffer - excess).clamp(0.0, max_buffer)
            });
            if excess > 0.0 && before > 0.0 && after <= 0.0 {
                overruns.push((identity, draw));
            }
        }

        for (target_id, draw) in overruns {
            warn!(target: "runtime::systems", operator = %target_id, draw, "Power buffer exhausted");
            ctx.publish(JudgePenaltyEvent {
                penalty_type: PenaltyType::PowerOverrun,
                target_id,
                judge_id: AUTOMATIC_JUDGE,
                reason: format!("drawing {draw:.0} W with an empty buffer"),
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<LevelUpdateEvent> for PowerSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &LevelUpdateEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if let Some(chassis) = self.ctx.roster.chassis(event.operator) {
            self.refresh_limit(chassis)
                .map_err(|err| HandlerError::failed(err.to_string()))?;
        }
        Ok(())
    }
}
