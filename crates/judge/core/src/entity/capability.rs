//! Capability traits.
//!
//! Every method has a default implementation reading through the entity's
//! [`EntityCore`](super::EntityCore), so a concrete kind opts in with an empty
//! `impl` block.

use super::Entity;
use crate::identity::ChassisMode;

/// Has health and can be destroyed.
pub trait Healthed: Entity {
    fn health(&self) -> u32 {
        let core = self.core();
        core.props().health.get_for(core.store(), core.identity())
    }

    fn set_health(&self, value: u32) {
        let core = self.core();
        core.props().health.set_for(core.store(), core.identity(), value);
    }

    fn max_health(&self) -> u32 {
        let core = self.core();
        core.props().max_health.get_for(core.store(), core.identity())
    }

    fn set_max_health(&self, value: u32) {
        let core = self.core();
        core.props()
            .max_health
            .set_for(core.store(), core.identity(), value);
    }

    fn is_alive(&self) -> bool {
        let core = self.core();
        core.props().alive.get_for(core.store(), core.identity())
    }

    fn set_alive(&self, alive: bool) {
        let core = self.core();
        core.props().alive.set_for(core.store(), core.identity(), alive);
    }

    /// Subtracts `amount`, saturating at zero. Returns remaining health.
    fn take_damage(&self, amount: u32) -> u32 {
        let core = self.core();
        core.props()
            .health
            .update_for(core.store(), core.identity(), |hp| hp.saturating_sub(amount))
    }

    /// Adds `amount`, capped at max health. Returns the new health.
    fn heal(&self, amount: u32) -> u32 {
        let max = self.max_health();
        let core = self.core();
        core.props()
            .health
            .update_for(core.store(), core.identity(), |hp| {
                hp.saturating_add(amount).min(max)
            })
    }
}

/// Carries a launcher with ammunition and barrel heat.
pub trait Shooter: Entity {
    fn ammo(&self) -> u32 {
        let core = self.core();
        core.props().ammo.get_for(core.store(), core.identity())
    }

    fn set_ammo(&self, value: u32) {
        let core = self.core();
        core.props().ammo.set_for(core.store(), core.identity(), value);
    }

    fn add_ammo(&self, amount: u32) -> u32 {
        let core = self.core();
        core.props()
            .ammo
            .update_for(core.store(), core.identity(), |ammo| ammo.saturating_add(amount))
    }

    /// Removes `amount` rounds if available.
    ///
    /// Returns the remaining ammo, or the unchanged count when insufficient.
    fn consume_ammo(&self, amount: u32) -> Result<u32, u32> {
        let core = self.core();
        core.props()
            .ammo
            .try_update_for(core.store(), core.identity(), |ammo| {
                ammo.checked_sub(amount).ok_or(ammo)
            })
    }

    fn heat(&self) -> f32 {
        let core = self.core();
        core.props().heat.get_for(core.store(), core.identity())
    }

    fn set_heat(&self, value: f32) {
        let core = self.core();
        core.props().heat.set_for(core.store(), core.identity(), value);
    }

    fn add_heat(&self, amount: f32) -> f32 {
        let core = self.core();
        core.props()
            .heat
            .update_for(core.store(), core.identity(), |heat| (heat + amount).max(0.0))
    }

    fn max_heat(&self) -> f32 {
        let core = self.core();
        core.props().max_heat.get_for(core.store(), core.identity())
    }

    fn cooling_per_sec(&self) -> f32 {
        let core = self.core();
        core.props()
            .cooling_per_sec
            .get_for(core.store(), core.identity())
    }

    fn is_overheated(&self) -> bool {
        self.heat() > self.max_heat()
    }
}

/// Has a drive train with a power budget.
pub trait Chassis: Entity {
    fn chassis_mode(&self) -> ChassisMode {
        let core = self.core();
        let raw = core.props().chassis_mode.get_for(core.store(), core.identity());
        ChassisMode::from_repr(raw).unwrap_or_default()
    }

    fn set_chassis_mode(&self, mode: ChassisMode) {
        let core = self.core();
        core.props()
            .chassis_mode
            .set_for(core.store(), core.identity(), mode as u8);
    }

    fn power_limit(&self) -> f32 {
        let core = self.core();
        core.props().power_limit.get_for(core.store(), core.identity())
    }

    fn power_buffer(&self) -> f32 {
        let core = self.core();
        core.props().power_buffer.get_for(core.store(), core.identity())
    }
}

/// Gains experience and levels.
pub trait Experienced: Entity {
    fn experience(&self) -> f32 {
        let core = self.core();
        core.props().experience.get_for(core.store(), core.identity())
    }

    fn add_experience(&self, amount: f32) -> f32 {
        let core = self.core();
        core.props()
            .experience
            .update_for(core.store(), core.identity(), |exp| exp + amount)
    }

    /// Current level, 1-based. An unset level reads as 1.
    fn level(&self) -> u8 {
        let core = self.core();
        core.props()
            .level
            .get_for(core.store(), core.identity())
            .max(1)
    }

    fn set_level(&self, level: u8) {
        let core = self.core();
        core.props().level.set_for(core.store(), core.identity(), level);
    }
}
