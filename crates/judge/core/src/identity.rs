//! Participant identities and camps.
//!
//! An [`Identity`] names one participant (camp + role index) and doubles as the
//! attribute-store namespace for everything that participant owns. Camp-wide
//! and server-wide values reuse the same namespace type through reserved role
//! indices, so the store needs a single key shape.

use core::fmt;

/// Team affiliation.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Camp {
    Red,
    Blue,
    /// Server / referee side. Owns Single-mode values.
    #[default]
    Neutral,
}

impl Camp {
    /// The two competing camps, in a fixed order.
    pub const COMPETING: [Camp; 2] = [Camp::Red, Camp::Blue];

    /// Returns the opposing camp. Neutral has no opponent.
    pub const fn opponent(self) -> Option<Camp> {
        match self {
            Camp::Red => Some(Camp::Blue),
            Camp::Blue => Some(Camp::Red),
            Camp::Neutral => None,
        }
    }

    /// Compact numeric code used when a camp is stored as an attribute.
    pub const fn code(self) -> u8 {
        match self {
            Camp::Neutral => 0,
            Camp::Red => 1,
            Camp::Blue => 2,
        }
    }

    /// Inverse of [`Camp::code`].
    pub const fn from_code(code: u8) -> Option<Camp> {
        match code {
            0 => Some(Camp::Neutral),
            1 => Some(Camp::Red),
            2 => Some(Camp::Blue),
            _ => None,
        }
    }
}

/// Immutable participant identifier: camp plus role index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    pub camp: Camp,
    pub role: u8,
}

impl Identity {
    /// Role index reserved for camp-wide namespaces.
    pub const CAMP_ROLE: u8 = u8::MAX;

    /// Canonical namespace of Single-mode properties.
    pub const SERVER: Self = Self {
        camp: Camp::Neutral,
        role: 0,
    };

    pub const fn new(camp: Camp, role: u8) -> Self {
        Self { camp, role }
    }

    /// Namespace holding camp-level aggregates for `camp`.
    pub const fn camp_wide(camp: Camp) -> Self {
        Self {
            camp,
            role: Self::CAMP_ROLE,
        }
    }

    /// Returns true if this identity is a camp-wide namespace.
    #[inline]
    pub const fn is_camp_wide(self) -> bool {
        self.role == Self::CAMP_ROLE
    }

    /// Returns true if this identity is the server namespace.
    #[inline]
    pub const fn is_server(self) -> bool {
        matches!(self.camp, Camp::Neutral) && self.role == 0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_camp_wide() {
            write!(f, "{}/*", self.camp)
        } else {
            write!(f, "{}/{}", self.camp, self.role)
        }
    }
}

/// Concrete robot kind. Selects the capability set and the constant tables.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RobotVariant {
    Hero,
    Engineer,
    Infantry,
    Aerial,
    Sentry,
    Outpost,
    Base,
}

impl RobotVariant {
    /// Whether a destroyed robot of this kind comes back after a countdown.
    pub const fn revivable(self) -> bool {
        matches!(
            self,
            RobotVariant::Hero | RobotVariant::Engineer | RobotVariant::Infantry | RobotVariant::Sentry
        )
    }

    /// Structures cannot move, shoot or level up.
    pub const fn is_structure(self) -> bool {
        matches!(self, RobotVariant::Outpost | RobotVariant::Base)
    }
}

/// Chassis configuration. Only infantry can switch; every other kind uses
/// [`ChassisMode::Standard`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum ChassisMode {
    #[default]
    Standard = 0,
    PowerFirst = 1,
    HealthFirst = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camp_wide_namespace_never_equals_a_robot() {
        let hero = Identity::new(Camp::Red, 1);
        assert_ne!(Identity::camp_wide(Camp::Red), hero);
        assert!(Identity::camp_wide(Camp::Blue).is_camp_wide());
        assert!(!hero.is_camp_wide());
    }

    #[test]
    fn camp_codes_round_trip() {
        for camp in [Camp::Red, Camp::Blue, Camp::Neutral] {
            assert_eq!(Camp::from_code(camp.code()), Some(camp));
        }
        assert_eq!(Camp::from_code(9), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Identity::new(Camp::Blue, 3).to_string(), "blue/3");
        assert_eq!(Identity::camp_wide(Camp::Red).to_string(), "red/*");
        assert_eq!("INFANTRY".parse::<RobotVariant>().unwrap(), RobotVariant::Infantry);
    }
}
