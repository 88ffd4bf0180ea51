//! Health, destruction and revival.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{
    Camp, ChassisModeChangedEvent, ClockTickEvent, ConfigError, DamageAppliedEvent, DamageCommand,
    Identity, JudgePenaltyEvent, KillEvent, LevelUpdateEvent, PenaltyType, ReviveEvent,
};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerCriticality, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "life";

/// Applies damage and penalties to health, destroys and revives robots.
pub struct LifeSystem {
    ctx: SystemContext,
}

/// Where a health deduction came from.
#[derive(Clone, Copy)]
enum Source {
    /// A hit from another robot; subject to defense and invincibility.
    Hit(Identity),
    /// Judge penalty; bypasses buffs.
    Penalty,
}

impl Source {
    fn attacker(self) -> Identity {
        match self {
            Source::Hit(shooter) => shooter,
            Source::Penalty => Identity::SERVER,
        }
    }
}

impl LifeSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// Moves max health to the robot's current profile. A raise is granted
    /// as health; a cut clamps health to the new maximum.
    fn apply_profile(&self, operator: Identity) -> Result<(), ConfigError> {
        let Some(entity) = self.ctx.roster.get(operator) else {
            return Ok(());
        };
        let Some(healthed) = entity.as_healthed() else {
            return Ok(());
        };
        let profile = self.ctx.profile(operator, entity.variant())?;

        let prev_max = healthed.max_health();
        healthed.set_max_health(profile.max_health);
        if !healthed.is_alive() {
            return Ok(());
        }
        if profile.max_health > prev_max {
            healthed.heal(profile.max_health - prev_max);
        } else if healthed.health() > profile.max_health {
            healthed.set_health(profile.max_health);
        } else {
            return Ok(());
        }
        self.ctx.refresh_camp_health(operator.camp);
        Ok(())
    }

    /// Deducts `raw` health from `victim`, publishing the outcome.
    async fn deduct(
        &self,
        source: Source,
        victim: Identity,
        raw: u32,
        ctx: &BusContext,
    ) -> Result<(), HandlerError> {
        let Some(entity) = self.ctx.roster.get(victim) else {
            debug!(target: "runtime::systems", %victim, "Damage to unknown robot");
            return Ok(());
        };
        let Some(healthed) = entity.as_healthed() else {
            return Ok(());
        };
        if !healthed.is_alive() {
            debug!(target: "runtime::systems", %victim, "Damage to destroyed robot");
            return Ok(());
        }

        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let amount = match source {
            Source::Hit(_) => {
                if props.invincible_ms.get_for(store, victim) > 0 {
                    debug!(target: "runtime::systems", %victim, "Hit absorbed by invincibility");
                    return Ok(());
                }
                let defense = props.defense_buff.get_for(store, victim).clamp(0.0, 1.0);
                (raw as f32 * (1.0 - defense)).round() as u32
            }
            Source::Penalty => raw,
        };
        if amount == 0 {
            return Ok(());
        }

        let remaining = healthed.take_damage(amount);
        self.ctx.refresh_camp_health(victim.camp);
        ctx.publish(DamageAppliedEvent {
            shooter: source.attacker(),
            victim,
            amount,
            remaining,
        })
        .await?;

        if remaining > 0 {
            return Ok(());
        }

        // Only the deduction that flips `alive` reports the kill.
        let destroyed = props
            .alive
            .try_update_for(store, victim, |alive| if alive { Ok(false) } else { Err(alive) })
            .is_ok();
        if !destroyed {
            return Ok(());
        }

        if entity.variant().revivable() {
            let revive_secs = self
                .ctx
                .profile(victim, entity.variant())
                .map(|profile| profile.revive_secs)
                .map_err(|err| HandlerError::failed(err.to_string()))?;
            props
                .revive_remaining_ms
                .set_for(store, victim, revive_secs.saturating_mul(1000).max(1));
        }

        info!(
            target: "runtime::systems",
            killer = %source.attacker(),
            %victim,
            "Robot destroyed"
        );
        ctx.publish(KillEvent {
            time: self.ctx.now_ms(),
            killer: source.attacker(),
            victim,
        })
        .await?;
        Ok(())
    }

    async fn tick_revivals(&self, delta_ms: u32, ctx: &BusContext) -> Result<(), HandlerError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let mut revived = Vec::new();

        for entity in self.ctx.roster.iter() {
            let Some(healthed) = entity.as_healthed() else {
                continue;
            };
            if healthed.is_alive() || !entity.variant().revivable() {
                continue;
            }
            let identity = entity.identity();
            let expired = props.revive_remaining_ms.try_update_for(store, identity, |ms| {
                if ms == 0 {
                    Err(ms)
                } else {
                    Ok(ms.saturating_sub(delta_ms))
                }
            });
            if expired != Ok(0) {
                continue;
            }

            healthed.set_health(healthed.max_health());
            healthed.set_alive(true);
            revived.push(identity);
        }

        let mut camps: Vec<Camp> = revived.iter().map(|id| id.camp).collect();
        camps.dedup();
        for camp in camps {
            self.ctx.refresh_camp_health(camp);
        }
        for reviver in revived {
            info!(target: "runtime::systems", %reviver, "Robot revived");
            ctx.publish(ReviveEvent {
                time: self.ctx.now_ms(),
                reviver,
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RuleSystem for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            let Some(healthed) = entity.as_healthed() else {
                continue;
            };
            let profile = self
                .ctx
                .profile(entity.identity(), entity.variant())
                .map_err(SystemError::config(NAME))?;
            healthed.set_max_health(profile.max_health);
            healthed.set_health(profile.max_health);
            healthed.set_alive(true);
            self.ctx
                .props
                .revive_remaining_ms
                .set_for(&self.ctx.store, entity.identity(), 0);
        }
        for camp in Camp::COMPETING {
            self.ctx.refresh_camp_health(camp);
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<DamageCommand, _>(self.clone());
        bus.add_handler::<JudgePenaltyEvent, _>(self.clone());
        bus.add_handler::<ClockTickEvent, _>(self.clone());
        bus.add_handler::<LevelUpdateEvent, _>(self.clone());
        bus.add_handler::<ChassisModeChangedEvent, _>(self);
    }
}

#[async_trait]
impl Handler<DamageCommand> for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Critical
    }

    async fn handle(&self, command: &DamageCommand, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "damage_command") {
            return Ok(());
        }
        if command.shooter.camp == command.victim.camp {
            debug!(
                target: "runtime::systems",
                shooter = %command.shooter,
                victim = %command.victim,
                "Ignoring friendly fire"
            );
            return Ok(());
        }
        self.deduct(Source::Hit(command.shooter), command.victim, command.damage, ctx)
            .await
    }
}

#[async_trait]
impl Handler<JudgePenaltyEvent> for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &JudgePenaltyEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        let penalties = self.ctx.tables.penalties();
        let fraction = match event.penalty_type {
            PenaltyType::Overheat => penalties.overheat_health,
            PenaltyType::PowerOverrun => penalties.power_overrun_health,
            PenaltyType::YellowCard | PenaltyType::RedCard => return Ok(()),
        };
        if !self.ctx.in_match(NAME, "judge_penalty_event") {
            return Ok(());
        }
        let Some(healthed) = self.ctx.roster.healthed(event.target_id) else {
            return Ok(());
        };
        let amount = (healthed.max_health() as f32 * fraction).round() as u32;
        self.deduct(Source::Penalty, event.target_id, amount, ctx).await
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, tick: &ClockTickEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if self.ctx.stage().is_match() {
            self.tick_revivals(tick.delta_ms, ctx).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<LevelUpdateEvent> for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &LevelUpdateEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        self.apply_profile(event.operator)
            .map_err(|err| HandlerError::failed(err.to_string()))
    }
}

#[async_trait]
impl Handler<ChassisModeChangedEvent> for LifeSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(
        &self,
        event: &ChassisModeChangedEvent,
        _ctx: &BusContext,
    ) -> Result<(), HandlerError> {
        self.apply_profile(event.operator)
            .map_err(|err| HandlerError::failed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use judge_core::{AmmoType, ArmorType, JudgeSystemStage, Topic};

    use super::*;
    use crate::systems::testing;

    const RED_HERO: Identity = Identity::new(Camp::Red, 1);
    const BLUE_INFANTRY: Identity = Identity::new(Camp::Blue, 3);

    async fn system() -> (Arc<LifeSystem>, EventBus, Arc<testing::FixedStage>) {
        let (ctx, stage) = testing::context();
        let system = Arc::new(LifeSystem::new(ctx));
        system.reset(&Cancellation::new()).await.unwrap();
        let bus = EventBus::new();
        system.clone().attach(&bus);
        (system, bus, stage)
    }

    fn hit(damage: u32) -> DamageCommand {
        DamageCommand {
            shooter: RED_HERO,
            victim: BLUE_INFANTRY,
            damage,
            ammo_type: AmmoType::Large,
            armor_type: ArmorType::Small,
            armor_id: 0,
        }
    }

    #[tokio::test]
    async fn damage_in_match_reduces_health() {
        let (system, bus, _) = system().await;
        let victim = system.ctx.roster.healthed(BLUE_INFANTRY).unwrap();
        assert_eq!(victim.health(), 200);
        let camp_before = system.ctx.props.health.get_camp(&system.ctx.store, Camp::Blue);

        bus.publish(hit(50)).await.unwrap();

        assert_eq!(victim.health(), 150);
        assert_eq!(
            system.ctx.props.health.get_camp(&system.ctx.store, Camp::Blue),
            camp_before - 50
        );
    }

    #[tokio::test]
    async fn damage_outside_match_is_ignored() {
        let (system, bus, stage) = system().await;
        stage.set(JudgeSystemStage::Repair);

        bus.publish(hit(50)).await.unwrap();

        assert_eq!(system.ctx.roster.healthed(BLUE_INFANTRY).unwrap().health(), 200);
    }

    #[tokio::test]
    async fn friendly_fire_and_invincibility_absorb_hits() {
        let (system, bus, _) = system().await;
        let mut friendly = hit(50);
        friendly.shooter = Identity::new(Camp::Blue, 1);
        bus.publish(friendly).await.unwrap();

        system
            .ctx
            .props
            .invincible_ms
            .set_for(&system.ctx.store, BLUE_INFANTRY, 1_000);
        bus.publish(hit(50)).await.unwrap();

        assert_eq!(system.ctx.roster.healthed(BLUE_INFANTRY).unwrap().health(), 200);
    }

    #[tokio::test]
    async fn defense_buff_scales_damage() {
        let (system, bus, _) = system().await;
        system
            .ctx
            .props
            .defense_buff
            .set_for(&system.ctx.store, BLUE_INFANTRY, 0.5);

        bus.publish(hit(50)).await.unwrap();

        assert_eq!(system.ctx.roster.healthed(BLUE_INFANTRY).unwrap().health(), 175);
    }

    #[tokio::test]
    async fn lethal_damage_kills_once_then_revives() {
        let (system, bus, stage) = system().await;
        stage.set_elapsed(12_000);
        let mut events = bus.subscribe(Topic::Event);

        bus.publish(hit(500)).await.unwrap();
        bus.publish(hit(500)).await.unwrap();

        let victim = system.ctx.roster.healthed(BLUE_INFANTRY).unwrap();
        assert!(!victim.is_alive());
        let kills: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|envelope| envelope.downcast::<KillEvent>().cloned())
            .collect();
        assert_eq!(
            kills,
            vec![KillEvent {
                time: 12_000,
                killer: RED_HERO,
                victim: BLUE_INFANTRY,
            }]
        );

        // Infantry revives after 15 seconds.
        bus.publish(ClockTickEvent { tick: 1, delta_ms: 14_000 })
            .await
            .unwrap();
        assert!(!victim.is_alive());
        bus.publish(ClockTickEvent { tick: 2, delta_ms: 1_000 })
            .await
            .unwrap();
        assert!(victim.is_alive());
        assert_eq!(victim.health(), 200);
        let revived = std::iter::from_fn(|| events.try_recv().ok())
            .any(|envelope| envelope.downcast::<ReviveEvent>().is_some());
        assert!(revived);
    }

    #[tokio::test]
    async fn overheat_penalty_costs_a_fraction_of_max_health() {
        let (system, bus, _) = system().await;
        bus.publish(JudgePenaltyEvent {
            penalty_type: PenaltyType::Overheat,
            target_id: BLUE_INFANTRY,
            judge_id: 0,
            reason: "heat".into(),
        })
        .await
        .unwrap();

        assert_eq!(system.ctx.roster.healthed(BLUE_INFANTRY).unwrap().health(), 180);
    }
}
