//! Ammunition purchases.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{AmmoType, SupplyCommand, ZoneKind, ammo_for};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "supply";

/// Sells ammunition for camp coins inside the camp's own supply zone.
pub struct SupplySystem {
    ctx: SystemContext,
}

impl SupplySystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn price(&self, ammo: AmmoType) -> Option<i32> {
        let economy = self.ctx.tables.economy();
        match ammo {
            AmmoType::Small => Some(economy.small_ammo_price),
            AmmoType::Large => Some(economy.large_ammo_price),
            AmmoType::Dart => None,
        }
    }
}

#[async_trait]
impl RuleSystem for SupplySystem {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Purchases leave no per-match state of their own; coins belong to the
    /// economy system.
    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        cancel.check(NAME)
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<SupplyCommand, _>(self);
    }
}

#[async_trait]
impl Handler<SupplyCommand> for SupplySystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, command: &SupplyCommand, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.ctx.in_match(NAME, "supply_command") || command.amount == 0 {
            return Ok(());
        }
        let operator = command.operator;
        let Some(entity) = self.ctx.roster.get(operator) else {
            debug!(target: "runtime::systems", %operator, "Unknown operator");
            return Ok(());
        };
        let props = &self.ctx.props;
        let store = &self.ctx.store;

        let at_own_supply = self
            .ctx
            .tables
            .zone(props.zone.get_for(store, operator))
            .is_some_and(|zone| zone.kind == ZoneKind::Supply && zone.camp == operator.camp);
        if !at_own_supply {
            debug!(target: "runtime::systems", %operator, "Supply outside own supply zone");
            return Ok(());
        }

        let (Some(shooter), Some(price)) = (
            entity.as_shooter(),
            ammo_for(entity.variant()).and_then(|ammo| self.price(ammo)),
        ) else {
            debug!(target: "runtime::systems", %operator, "Robot buys no ammunition");
            return Ok(());
        };
        let Some(cost) = i32::try_from(command.amount)
            .ok()
            .and_then(|amount| amount.checked_mul(price))
        else {
            debug!(target: "runtime::systems", %operator, amount = command.amount, "Purchase too large");
            return Ok(());
        };

        let paid = props.coins.try_update_camp(store, operator.camp, |coins| {
            if coins >= cost { Ok(coins - cost) } else { Err(coins) }
        });
        match paid {
            Ok(left) => {
                props
                    .coins_spent
                    .update_camp(store, operator.camp, |spent| spent.saturating_add(cost));
                let ammo = shooter.add_ammo(command.amount);
                info!(
                    target: "runtime::systems",
                    %operator,
                    amount = command.amount,
                    cost,
                    coins_left = left,
                    ammo,
                    "Ammunition supplied"
                );
            }
            Err(coins) => debug!(
                target: "runtime::systems",
                %operator,
                cost,
                coins,
                "Not enough coins"
            ),
        }
        Ok(())
    }
}
