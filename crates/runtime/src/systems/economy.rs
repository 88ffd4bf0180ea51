//! Camp coins: starting funds, periodic income and kill bounties.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{Camp, ClockTickEvent, KillEvent};
use tracing::debug;

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "economy";

pub struct EconomySystem {
    ctx: SystemContext,
}

impl EconomySystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn credit(&self, camp: Camp, amount: i32) -> i32 {
        self.ctx
            .props
            .coins
            .update_camp(&self.ctx.store, camp, |coins| coins.saturating_add(amount))
    }
}

#[async_trait]
impl RuleSystem for EconomySystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        let initial = self.ctx.tables.economy().initial_coins;
        for camp in Camp::COMPETING {
            cancel.check(NAME)?;
            props.coins.set_camp(store, camp, initial);
            props.coins_spent.set_camp(store, camp, 0);
        }
        props.income_timer_ms.set(store, 0);
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<ClockTickEvent, _>(self.clone());
        bus.add_handler::<KillEvent, _>(self);
    }
}

#[async_trait]
impl Handler<ClockTickEvent> for EconomySystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, tick: &ClockTickEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.stage().is_match() {
            return Ok(());
        }
        let economy = self.ctx.tables.economy();
        let period_ms = economy.income_period_secs.saturating_mul(1000);
        if period_ms == 0 || economy.income == 0 {
            return Ok(());
        }

        let mut payouts = 0;
        self.ctx
            .props
            .income_timer_ms
            .update(&self.ctx.store, |timer| {
                let timer = timer.saturating_add(tick.delta_ms);
                payouts = timer / period_ms;
                timer % period_ms
            });

        for _ in 0..payouts {
            for camp in Camp::COMPETING {
                let coins = self.credit(camp, economy.income);
                debug!(target: "runtime::systems", %camp, coins, "Periodic income");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<KillEvent> for EconomySystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &KillEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "kill_event") {
            return Ok(());
        }
        let camp = event.killer.camp;
        if !self.ctx.roster.contains(event.killer) || camp == event.victim.camp {
            return Ok(());
        }
        let coins = self.credit(camp, self.ctx.tables.economy().kill_bounty);
        debug!(target: "runtime::systems", %camp, coins, "Kill bounty");
        Ok(())
    }
}
