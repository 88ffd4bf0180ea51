//! Kill experience and level progression.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{KillEvent, LevelUpdateEvent};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "experience";

/// Awards kill experience and raises levels.
///
/// Reset runs before every other system so profile lookups in later resets
/// see level 1.
pub struct ExperienceSystem {
    ctx: SystemContext,
}

impl ExperienceSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl RuleSystem for ExperienceSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        for entity in self.ctx.roster.iter() {
            cancel.check(NAME)?;
            if let Some(experienced) = entity.as_experienced() {
                self.ctx
                    .props
                    .experience
                    .set_for(&self.ctx.store, entity.identity(), 0.0);
                experienced.set_level(1);
            }
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<KillEvent, _>(self);
    }
}

#[async_trait]
impl Handler<KillEvent> for ExperienceSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &KillEvent, ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "kill_event") {
            return Ok(());
        }
        let roster = &self.ctx.roster;
        let Some(killer) = roster.get(event.killer) else {
            debug!(target: "runtime::systems", killer = %event.killer, "Kill without a robot killer");
            return Ok(());
        };
        let Some(experienced) = killer.as_experienced() else {
            return Ok(());
        };
        let Some(victim) = roster.get(event.victim) else {
            debug!(target: "runtime::systems", victim = %event.victim, "Unknown victim");
            return Ok(());
        };

        let victim_level = victim.as_experienced().map_or(1, |v| v.level());
        let tables = &self.ctx.tables;
        let gained = tables.kill_experience(victim.variant(), victim_level);
        let total = experienced.add_experience(gained);

        let prev_level = experienced.level();
        let new_level = tables
            .level_for(killer.variant(), total)
            .min(tables.max_level(killer.variant()).max(1));
        if new_level <= prev_level {
            return Ok(());
        }

        experienced.set_level(new_level);
        info!(
            target: "runtime::systems",
            operator = %event.killer,
            prev_level,
            new_level,
            experience = total,
            "Level up"
        );
        ctx.publish(LevelUpdateEvent {
            operator: event.killer,
            prev_level,
            new_level,
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use judge_core::{Camp, Identity, Topic};

    use super::*;
    use crate::systems::testing;

    const RED_HERO: Identity = Identity::new(Camp::Red, 1);
    const BLUE_INFANTRY: Identity = Identity::new(Camp::Blue, 3);
    const BLUE_BASE: Identity = Identity::new(Camp::Blue, 9);

    async fn system() -> (Arc<ExperienceSystem>, EventBus) {
        let (ctx, _) = testing::context();
        let system = Arc::new(ExperienceSystem::new(ctx));
        system.reset(&Cancellation::new()).await.unwrap();
        let bus = EventBus::new();
        system.clone().attach(&bus);
        (system, bus)
    }

    fn kill(victim: Identity) -> KillEvent {
        KillEvent {
            time: 0,
            killer: RED_HERO,
            victim,
        }
    }

    #[tokio::test]
    async fn kills_award_experience_and_levels() {
        let (system, bus) = system().await;
        let mut events = bus.subscribe(Topic::Event);
        let hero = system.ctx.roster.experienced(RED_HERO).unwrap();

        bus.publish(kill(BLUE_INFANTRY)).await.unwrap();
        assert_eq!(hero.experience(), 50.0);
        assert_eq!(hero.level(), 1);

        // Structures are worth 150; 200 crosses nothing, 350 neither, 500 reaches level 2.
        for _ in 0..3 {
            bus.publish(kill(BLUE_BASE)).await.unwrap();
        }
        assert_eq!(hero.experience(), 500.0);
        assert_eq!(hero.level(), 2);

        let updates: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|envelope| envelope.downcast::<LevelUpdateEvent>().cloned())
            .collect();
        assert_eq!(
            updates,
            vec![LevelUpdateEvent {
                operator: RED_HERO,
                prev_level: 1,
                new_level: 2,
            }]
        );
    }

    #[tokio::test]
    async fn reset_restores_level_one() {
        let (system, bus) = system().await;
        for _ in 0..3 {
            bus.publish(kill(BLUE_BASE)).await.unwrap();
        }
        system.reset(&Cancellation::new()).await.unwrap();

        let hero = system.ctx.roster.experienced(RED_HERO).unwrap();
        assert_eq!(hero.experience(), 0.0);
        assert_eq!(hero.level(), 1);
    }

    #[tokio::test]
    async fn cancelled_reset_stops() {
        let (system, _) = system().await;
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(matches!(
            system.reset(&cancel).await,
            Err(SystemError::Cancelled { system: NAME })
        ));
    }
}
