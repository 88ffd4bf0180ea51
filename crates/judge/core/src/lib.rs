//! Synchronous rules substrate for the judge system.
//!
//! `judge-core` defines the namespaced [`AttributeStore`] backing every entity
//! attribute, the typed [`Property`] bindings that address it, the
//! capability-typed entity views, the message taxonomy carried by the event
//! bus, and the [`RuleTables`] contract through which competition constants
//! are supplied. It has no async runtime; the `judge-runtime` crate wires these
//! pieces into a running match.
pub mod bindings;
pub mod entity;
pub mod error;
pub mod event;
pub mod identity;
pub mod key;
pub mod property;
pub mod stage;
pub mod store;
pub mod tables;

pub use bindings::Properties;
pub use entity::{
    Chassis, Entity, EntityCore, Experienced, Healthed, Roster, RosterEntry, Shooter,
};
pub use error::{ConfigError, ErrorSeverity, JudgeError};
pub use event::{
    AmmoType, ArmorType, ChassisModeChangedEvent, ChassisModeCommand, ChassisPowerCommand,
    ClockTickEvent, DamageAppliedEvent, DamageCommand, EnterZoneEvent, EventKind, ExitZoneEvent,
    JudgeEvent, JudgePenaltyEvent, KillEvent, LevelUpdateEvent, MatchSettleEvent, Message,
    OperatorLoginEvent, OperatorLogoutEvent, PenaltyType, ReviveEvent, SettleReason, ShootCommand,
    StageChangedEvent, SupplyCommand, Topic, WinPointCommand,
};
pub use identity::{Camp, ChassisMode, Identity, RobotVariant};
pub use key::{PropertyKey, key};
pub use property::{Capability, Property, PropertyDecl, PropertyTable, Scope, StorageMode};
pub use stage::{JudgeSystemStage, TimeLimit};
pub use store::{AttributeStore, AttributeValue, Reader, ValueKind, Writer};
pub use tables::{
    BuffRules, EconomyRules, LevelProfile, PenaltyRules, RuleTables, ScoreRules, ZoneKind,
    ZoneRule, ammo_for,
};
