//! Operator presence.

use std::sync::Arc;

use async_trait::async_trait;
use judge_core::{Camp, Identity, OperatorLoginEvent, OperatorLogoutEvent};
use tracing::{debug, info};

use super::{RuleSystem, SystemContext, SystemError};
use crate::bus::{BusContext, EventBus, Handler, HandlerError};
use crate::cancel::Cancellation;

const NAME: &str = "operator";

/// Tracks which robots have a connected operator.
///
/// Logins survive a reset; the per-camp counters are rebuilt from the
/// per-robot flags.
pub struct OperatorSystem {
    ctx: SystemContext,
}

impl OperatorSystem {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// Flips the online flag. Returns false when it already had that value.
    fn mark(&self, id: Identity, online: bool) -> bool {
        self.ctx
            .props
            .online
            .try_update_for(&self.ctx.store, id, |current| {
                if current == online { Err(current) } else { Ok(online) }
            })
            .is_ok()
    }

    fn known(&self, id: Identity) -> bool {
        let known = self.ctx.roster.contains(id);
        if !known {
            debug!(target: "runtime::systems", operator = %id, "Operator outside the roster");
        }
        known
    }
}

#[async_trait]
impl RuleSystem for OperatorSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reset(&self, cancel: &Cancellation) -> Result<(), SystemError> {
        let props = &self.ctx.props;
        let store = &self.ctx.store;
        for camp in Camp::COMPETING {
            cancel.check(NAME)?;
            let online = self
                .ctx
                .roster
                .camp(camp)
                .filter(|entity| props.online.get_for(store, entity.identity()))
                .count();
            props
                .operators_online
                .set_camp(store, camp, u32::try_from(online).unwrap_or(u32::MAX));
        }
        Ok(())
    }

    fn attach(self: Arc<Self>, bus: &EventBus) {
        bus.add_handler::<OperatorLoginEvent, _>(self.clone());
        bus.add_handler::<OperatorLogoutEvent, _>(self);
    }
}

#[async_trait]
impl Handler<OperatorLoginEvent> for OperatorSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &OperatorLoginEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.known(event.id) || !self.mark(event.id, true) {
            return Ok(());
        }
        let online = self
            .ctx
            .props
            .operators_online
            .update_camp(&self.ctx.store, event.id.camp, |n| n.saturating_add(1));
        info!(target: "runtime::systems", operator = %event.id, online, "Operator logged in");
        Ok(())
    }
}

#[async_trait]
impl Handler<OperatorLogoutEvent> for OperatorSystem {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, event: &OperatorLogoutEvent, _ctx: &BusContext) -> Result<(), HandlerError> {
        if !self.known(event.id) || !self.mark(event.id, false) {
            return Ok(());
        }
        let online = self
            .ctx
            .props
            .operators_online
            .update_camp(&self.ctx.store, event.id.camp, |n| n.saturating_sub(1));
        info!(target: "runtime::systems", operator = %event.id, online, "Operator logged out");
        Ok(())
    }
}
