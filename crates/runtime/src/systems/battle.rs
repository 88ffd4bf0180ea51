//! Ammunition, barrel heat and shot accounting.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Camp, ChassisModeChangedEvent, ClockTickEvent, ConfigError, JudgePenaltyEvent, LevelUpdateEvent,
    PenaltyType, ShootCommand, Shooter, ammo_for,
};
use tracing::{debug, warn};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "battle";

/// Judge id stamped on penalties the engine issues by itself.
pub(crate) const AUTOMATIC_JUDGE: u32 = 0;

pub struct BattleSystem {
    ctx: SystemContext,
}

impl BattleSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn refresh_heat_limits(&self, shooter: &dyn Shooter) -> Result<(), ConfigError> {
        let identity = shooter.identity();
        let profile = self.ctx.profile(identity, shooter.variant())?;
        let props = &self.ctx.props;
        props.max_heat.set_for(&self.ctx.store, identity, profile.max_heat);
        props
            .cooling_per_sec
            .set_for(&self.ctx.store, identity, profile.cooling_per_sec);
        Ok(())
    }
}

#[async_trait]
impl RuleSystem for BattleSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            let Some(shooter) = entity.as_shooter() else {
                continue;
            };
            shooter.set_ammo(self.ctx.tables.initial_ammo(entity.variant()));
            shooter.set_heat(0.0);
            props.shots_fired.set_for(store, entity.identity(), 0);
            self.refresh_heat_limits(shooter)
                .map_err(SystemError::config(NAME))?;
        }
        for camp in Camp::COMPETING {
            props.shots_fired.set_camp(store, camp, 0);
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<ShootCommand, _>(self.clone());
        bus.add_handler::<ClockTickEvent, _>(self.clone());
        bus.add_handler::<LevelUpdateEvent, _>(self.clone());
        bus.add_handler::<ChassisModeChangedEvent, _>(self);
    }
}

#[async_trait]
impl Handler<ShootCommand> for BattleSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, command: &ShootCommand, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "shoot_command") || command.amount == 0 {
            return Ok(());
        }
        let Some(entity) = self.ctx.roster.get(command.shooter) else {
            debug!(target: "runtime::systems", shooter = %command.shooter, "Unknown shooter");
            return Ok(());
        };
        let (Some(shooter), Some(ammo_type)) = (entity.as_shooter(), ammo_for(entity.variant()))
        else {
            debug!(target: "runtime::systems", shooter = %command.shooter, "Robot has no launcher");
            return Ok(());
        };
        if entity.as_healthed().is_some_and(|healthed| !healthed.is_alive()) {
            debug!(target: "runtime::systems", shooter = %command.shooter, "Destroyed robot cannot shoot");
            return Ok(());
        }
        if let Err(left) = shooter.consume_ammo(command.amount) {
            debug!(
                target: "runtime::systems",
                shooter = %command.shooter,
                requested = command.amount,
                left,
                "Not enough ammo"
            );
            return Ok(());
        }

        let props = &self.ctx.props;
        let store = &self.ctx.store;
        props
            .shots_fired
            .update_for(store, command.shooter, |n| n.saturating_add(command.amount));
        props
            .shots_fired
            .update_camp(store, command.shooter.camp, |n| n.saturating_add(command.amount));

        let added = self.ctx.tables.heat_per_shot(ammo_type) * command.amount as f32;
        let heat = shooter.add_heat(added);
        let max_heat = shooter.max_heat();
        let crossed = max_heat > 0.0 && heat > max_heat && heat - added <= max_heat;
        if !crossed {
            return Ok(());
        }

        warn!(
            target: "runtime::systems",
            shooter = %command.shooter,
            heat,
            max_heat,
            "Barrel overheated"
        );
        ctx.publish(JudgePenaltyEvent {
            penalty_type: PenaltyType::Overheat,
            target_id: command.shooter,
            judge_id: AUTOMATIC_JUDGE,
            reason: format!("heat {heat:.0} over limit {max_heat:.0}"),
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for BattleSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, tick: &ClockTickEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.stage().is_match() {
            return Ok(());
        }
        let dt = tick.delta_ms as f32 / 1000.0;
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        for entity in self.ctx.roster.iter() {
            let Some(shooter) = entity.as_shooter() else {
                continue;
            };
            let buff = props.cooling_buff.get_for(store, entity.identity());
            let cooled = shooter.cooling_per_sec() * (1.0 + buff) * dt;
            if cooled > 0.0 {
                shooter.add_heat(-cooled);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<LevelUpdateEvent> for BattleSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &LevelUpdateEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if let Some(shooter) = self.ctx.roster.shooter(event.operator) {
            self.refresh_heat_limits(shooter)
                .map_err(|err| HandlerError::failed(err.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<ChassisModeChangedEvent> for BattleSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(
        &self,
        event: &ChassisModeChangedEvent,
        _ctx: &BusContext,
    ) -> Result<(), HandlerError> {
        if let Some(shooter) = self.ctx.roster.shooter(event.operator) {
            self.refresh_heat_limits(shooter)
                .map_err(|err| HandlerError::failed(err.to_string()))?;
        }
        Ok(())
    }
}
