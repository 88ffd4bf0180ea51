//! Commands and domain events exchanged over the event bus.
//!
//! Every message is an immutable, structurally comparable record that names
//! participants by [`Identity`](crate::Identity) value, never by reference.
//! Commands ([`Topic::Command`]) request something; domain events
//! ([`Topic::Event`]) state that something happened.
//!
//! # Marker capability
//!
//! The bus transports anything implementing [`Message`]. Messages that belong
//! to the judge domain additionally opt in to [`JudgeEvent`] and expose it via
//! [`Message::as_judge_event`]; interceptors use the marker to filter foreign
//! traffic.

mod command;
mod domain;

use core::any::Any;
use core::fmt;

pub use command::{
    ChassisModeCommand, ChassisPowerCommand, DamageCommand, ShootCommand, SupplyCommand,
    WinPointCommand,
};
pub use domain::{
    ChassisModeChangedEvent, ClockTickEvent, DamageAppliedEvent, EnterZoneEvent, ExitZoneEvent,
    JudgePenaltyEvent, KillEvent, LevelUpdateEvent, MatchSettleEvent, OperatorLoginEvent,
    OperatorLogoutEvent, ReviveEvent, StageChangedEvent,
};

/// Routing class of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    /// Imperative requests from referee inputs or sensors.
    Command,
    /// Facts published by rule systems and the stage clock.
    Event,
}

/// Anything the event bus can carry.
pub trait Message: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn topic(&self) -> Topic;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Marker capability. `None` for messages outside the judge domain.
    fn as_judge_event(&self) -> Option<&dyn JudgeEvent> {
        None
    }
}

/// Marker for judge-domain messages.
pub trait JudgeEvent: Message {
    fn kind(&self) -> EventKind;
}

/// Every judge-domain message type.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    ShootCommand,
    DamageCommand,
    WinPointCommand,
    SupplyCommand,
    ChassisPowerCommand,
    ChassisModeCommand,
    KillEvent,
    ReviveEvent,
    LevelUpdateEvent,
    MatchSettleEvent,
    OperatorLoginEvent,
    OperatorLogoutEvent,
    EnterZoneEvent,
    ExitZoneEvent,
    JudgePenaltyEvent,
    StageChangedEvent,
    ClockTickEvent,
    DamageAppliedEvent,
    ChassisModeChangedEvent,
}

macro_rules! judge_message {
    ($($ty:ident => $topic:ident),+ $(,)?) => {
        $(
            impl Message for $ty {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn topic(&self) -> Topic {
                    Topic::$topic
                }

                fn name(&self) -> &'static str {
                    EventKind::$ty.into()
                }

                fn as_judge_event(&self) -> Option<&dyn JudgeEvent> {
                    Some(self)
                }
            }

            impl JudgeEvent for $ty {
                fn kind(&self) -> EventKind {
                    EventKind::$ty
                }
            }
        )+
    };
}

judge_message! {
    ShootCommand => Command,
    DamageCommand => Command,
    WinPointCommand => Command,
    SupplyCommand => Command,
    ChassisPowerCommand => Command,
    ChassisModeCommand => Command,
    KillEvent => Event,
    ReviveEvent => Event,
    LevelUpdateEvent => Event,
    MatchSettleEvent => Event,
    OperatorLoginEvent => Event,
    OperatorLogoutEvent => Event,
    EnterZoneEvent => Event,
    ExitZoneEvent => Event,
    JudgePenaltyEvent => Event,
    StageChangedEvent => Event,
    ClockTickEvent => Event,
    DamageAppliedEvent => Event,
    ChassisModeChangedEvent => Event,
}

/// Projectile caliber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AmmoType {
    #[default]
    Small,
    Large,
    Dart,
}

/// Armor plate size that registered a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArmorType {
    #[default]
    Small,
    Large,
}

/// Kind of referee or automatic penalty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PenaltyType {
    /// Warning; counted, no health effect.
    YellowCard,
    /// Disqualifies the target's camp.
    RedCard,
    /// Barrel heat exceeded its limit.
    Overheat,
    /// Chassis drew more power than its buffer allows.
    PowerOverrun,
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum SettleReason {
    BaseDestroyed = 1,
    Disqualified = 2,
    WinPoints = 3,
    BaseHealth = 4,
    TotalHealth = 5,
    Draw = 6,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Camp, Identity};

    fn penalty(reason: &str) -> JudgePenaltyEvent {
        JudgePenaltyEvent {
            penalty_type: PenaltyType::YellowCard,
            target_id: Identity::new(Camp::Red, 3),
            judge_id: 2,
            reason: reason.to_owned(),
        }
    }

    #[test]
    fn penalties_compare_structurally() {
        assert_eq!(penalty("collision"), penalty("collision"));
        assert_ne!(penalty("collision"), penalty("blocking"));

        let mut other_judge = penalty("collision");
        other_judge.judge_id = 3;
        assert_ne!(penalty("collision"), other_judge);

        let mut other_type = penalty("collision");
        other_type.penalty_type = PenaltyType::RedCard;
        assert_ne!(penalty("collision"), other_type);
    }

    #[test]
    fn judge_messages_carry_the_marker() {
        let shot = ShootCommand {
            shooter: Identity::new(Camp::Blue, 1),
            amount: 1,
        };
        let marker = shot.as_judge_event().expect("judge message");
        assert_eq!(marker.kind(), EventKind::ShootCommand);
        assert_eq!(shot.topic(), Topic::Command);
        assert_eq!(shot.name(), "shoot_command");
    }

    #[test]
    fn downcast_through_any() {
        let message: Box<dyn Message> = Box::new(penalty("x"));
        let penalty = message
            .as_any()
            .downcast_ref::<JudgePenaltyEvent>()
            .expect("concrete type");
        assert_eq!(penalty.judge_id, 2);
        assert_eq!(message.topic(), Topic::Event);
    }
}
