//! The full set of property bindings used by entities and rule systems.
//!
//! Every attribute a rule system touches is declared here, once, through a
//! [`PropertyTable`]. Grepping for a field name shows every reader and writer
//! of that attribute.

use crate::error::ConfigError;
use crate::property::{Capability, Property, PropertyTable, StorageMode};

const ID: StorageMode = StorageMode::IDENTITY;
const CAMP: StorageMode = StorageMode::CAMP;
const SINGLE: StorageMode = StorageMode::SINGLE;
const ID_CAMP: StorageMode = StorageMode::IDENTITY.union(StorageMode::CAMP);

/// Typed handles for every judge attribute.
#[derive(Clone, Debug)]
pub struct Properties {
    // ===== Healthed =====
    /// Current health; the camp cell is the sum over the camp's robots.
    pub health: Property<u32>,
    pub max_health: Property<u32>,
    pub alive: Property<bool>,
    /// Milliseconds until a destroyed robot revives.
    pub revive_remaining_ms: Property<u32>,

    // ===== Shooter =====
    pub ammo: Property<u32>,
    pub heat: Property<f32>,
    pub max_heat: Property<f32>,
    pub cooling_per_sec: Property<f32>,
    pub shots_fired: Property<u32>,

    // ===== Chassis =====
    pub chassis_mode: Property<u8>,
    pub power_limit: Property<f32>,
    /// Remaining energy buffer in joules.
    pub power_buffer: Property<f32>,
    pub max_power_buffer: Property<f32>,
    pub power_draw: Property<f32>,

    // ===== Experienced =====
    pub experience: Property<f32>,
    pub level: Property<u8>,

    // ===== Buff =====
    /// Fraction of incoming damage absorbed.
    pub defense_buff: Property<f32>,
    /// Extra cooling fraction.
    pub cooling_buff: Property<f32>,
    pub invincible_ms: Property<u32>,
    /// Healing owed below one health point, in millionths of a point.
    pub heal_carry: Property<u32>,

    // ===== Zone =====
    /// Zone currently occupied; 0 when outside every zone.
    pub zone: Property<u32>,

    // ===== Economy =====
    pub coins: Property<i32>,
    pub coins_spent: Property<i32>,
    pub income_timer_ms: Property<u32>,

    // ===== Score =====
    pub win_point: Property<i32>,
    pub kills: Property<u32>,
    pub damage_dealt: Property<u32>,
    pub penalties: Property<u32>,

    // ===== Settlement =====
    pub settled: Property<bool>,
    /// [`Camp::code`](crate::Camp::code) of the winner; 0 for a draw.
    pub winner: Property<u8>,
    pub settle_reason: Property<u8>,
    /// Milliseconds spent in the current stage, maintained by the stage clock.
    pub stage_elapsed_ms: Property<u64>,

    // ===== Operator =====
    pub online: Property<bool>,
    pub operators_online: Property<u32>,
}

impl Properties {
    /// Declares every binding into `table`.
    pub fn declare(table: &mut PropertyTable) -> Result<Self, ConfigError> {
        use Capability::*;

        Ok(Self {
            health: table.declare(Healthed, "health", ID_CAMP)?,
            max_health: table.declare(Healthed, "max_health", ID)?,
            alive: table.declare(Healthed, "alive", ID)?,
            revive_remaining_ms: table.declare(Healthed, "revive_remaining_ms", ID)?,

            ammo: table.declare(Shooter, "ammo", ID)?,
            heat: table.declare(Shooter, "heat", ID)?,
            max_heat: table.declare(Shooter, "max_heat", ID)?,
            cooling_per_sec: table.declare(Shooter, "cooling_per_sec", ID)?,
            shots_fired: table.declare(Shooter, "shots_fired", ID_CAMP)?,

            chassis_mode: table.declare(Chassis, "chassis_mode", ID)?,
            power_limit: table.declare(Chassis, "power_limit", ID)?,
            power_buffer: table.declare(Chassis, "power_buffer", ID)?,
            max_power_buffer: table.declare(Chassis, "max_power_buffer", ID)?,
            power_draw: table.declare(Chassis, "power_draw", ID)?,

            experience: table.declare(Experienced, "experience", ID)?,
            level: table.declare(Experienced, "level", ID)?,

            defense_buff: table.declare(Buff, "defense_buff", ID)?,
            cooling_buff: table.declare(Buff, "cooling_buff", ID)?,
            invincible_ms: table.declare(Buff, "invincible_ms", ID)?,
            heal_carry: table.declare(Buff, "heal_carry", ID)?,

            zone: table.declare(Zone, "zone", ID)?,

            coins: table.declare(Economy, "coins", CAMP)?,
            coins_spent: table.declare(Economy, "coins_spent", CAMP)?,
            income_timer_ms: table.declare(Economy, "income_timer_ms", SINGLE)?,

            win_point: table.declare(Score, "win_point", CAMP)?,
            kills: table.declare(Score, "kills", ID_CAMP)?,
            damage_dealt: table.declare(Score, "damage_dealt", ID_CAMP)?,
            penalties: table.declare(Score, "penalties", ID_CAMP)?,

            settled: table.declare(Settlement, "settled", SINGLE)?,
            winner: table.declare(Settlement, "winner", SINGLE)?,
            settle_reason: table.declare(Settlement, "settle_reason", SINGLE)?,
            stage_elapsed_ms: table.declare(Settlement, "stage_elapsed_ms", SINGLE)?,

            online: table.declare(Operator, "online", ID)?,
            operators_online: table.declare(Operator, "operators_online", CAMP)?,
        })
    }

    /// Builds a fresh table holding every binding.
    pub fn build() -> Result<(Self, PropertyTable), ConfigError> {
        let mut table = PropertyTable::new();
        let props = Self::declare(&mut table)?;
        Ok((props, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_register_without_collisions() {
        let (props, table) = Properties::build().expect("bindings");
        assert_eq!(table.len(), 34);
        assert_eq!(props.health.name(), "health");
        assert_eq!(table.role(Capability::Shooter).count(), 5);
    }

    #[test]
    fn declaring_twice_into_one_table_fails() {
        let mut table = PropertyTable::new();
        Properties::declare(&mut table).expect("first");
        let err = Properties::declare(&mut table).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateProperty { name: "health" });
    }
}
