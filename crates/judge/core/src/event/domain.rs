//! Facts published by the stage clock and rule systems.
//!
//! Times are milliseconds since the current stage began, as reported by the
//! stage clock at publish time.

use super::{PenaltyType, SettleReason};
use crate::identity::{Camp, ChassisMode, Identity};
use crate::stage::JudgeSystemStage;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KillEvent {
    pub time: u64,
    pub killer: Identity,
    pub victim: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviveEvent {
    pub time: u64,
    pub reviver: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelUpdateEvent {
    pub operator: Identity,
    pub prev_level: u8,
    pub new_level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChassisModeChangedEvent {
    pub operator: Identity,
    pub prev: ChassisMode,
    pub next: ChassisMode,
}

/// Final result. `winner` is `None` for a draw.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchSettleEvent {
    pub winner: Option<Camp>,
    pub reason: SettleReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorLoginEvent {
    pub id: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorLogoutEvent {
    pub id: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnterZoneEvent {
    pub zone_id: u32,
    pub operator_id: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExitZoneEvent {
    pub zone_id: u32,
    pub operator_id: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JudgePenaltyEvent {
    pub penalty_type: PenaltyType,
    pub target_id: Identity,
    /// Referee seat that issued the penalty; 0 for automatic penalties.
    pub judge_id: u32,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StageChangedEvent {
    pub prev: JudgeSystemStage,
    pub next: JudgeSystemStage,
}

/// Periodic tick from the timekeeper.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTickEvent {
    pub tick: u64,
    pub delta_ms: u32,
}

/// Damage the life system actually applied after buffs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageAppliedEvent {
    pub shooter: Identity,
    pub victim: Identity,
    pub amount: u32,
    pub remaining: u32,
}
