//! Imperative requests.

use super::{AmmoType, ArmorType};
use crate::identity::{Camp, ChassisMode, Identity};

/// A robot fired `amount` projectiles.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShootCommand {
    pub shooter: Identity,
    pub amount: u32,
}

/// An armor plate registered a hit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageCommand {
    pub shooter: Identity,
    pub victim: Identity,
    pub damage: u32,
    pub ammo_type: AmmoType,
    pub armor_type: ArmorType,
    pub armor_id: u8,
}

/// Referee override of a camp's win points.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WinPointCommand {
    pub camp: Camp,
    pub new_win_point: i32,
}

/// Request to buy `amount` rounds at a supply zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupplyCommand {
    pub operator: Identity,
    pub amount: u32,
}

/// Chassis power sample reported by the power meter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChassisPowerCommand {
    pub operator: Identity,
    pub power_w: f32,
}

/// Request to reconfigure a chassis. Only accepted during repair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChassisModeCommand {
    pub operator: Identity,
    pub mode: ChassisMode,
}
