//! Match stages and their time limits.

use core::fmt;

/// Phase of the match lifecycle.
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
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum JudgeSystemStage {
    #[default]
    OutOfMatch = 0,
    Repair = 1,
    SelfCheck = 2,
    Countdown = 3,
    Match = 4,
    Settlement = 5,
}

impl JudgeSystemStage {
    /// The stage a running match proceeds to when this one expires.
    ///
    /// Settlement loops back to Repair; OutOfMatch stays put.
    pub const fn next(self) -> Self {
        match self {
            Self::OutOfMatch => Self::OutOfMatch,
            Self::Repair => Self::SelfCheck,
            Self::SelfCheck => Self::Countdown,
            Self::Countdown => Self::Match,
            Self::Match => Self::Settlement,
            Self::Settlement => Self::Repair,
        }
    }

    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Configured duration of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimeLimit {
    Unbounded,
    Seconds(u32),
}

impl TimeLimit {
    /// Limit in milliseconds, `None` if unbounded.
    pub const fn as_millis(self) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Seconds(secs) => Some(secs as u64 * 1000),
        }
    }

    /// Whether `elapsed_ms` has reached the limit.
    pub const fn is_expired(self, elapsed_ms: u64) -> bool {
        match self.as_millis() {
            Some(limit) => elapsed_ms >= limit,
            None => false,
        }
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Seconds(secs) => write!(f, "{secs}s"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_stages_cycle() {
        let mut stage = JudgeSystemStage::Repair;
        let mut seen = vec![stage];
        for _ in 0..5 {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                JudgeSystemStage::Repair,
                JudgeSystemStage::SelfCheck,
                JudgeSystemStage::Countdown,
                JudgeSystemStage::Match,
                JudgeSystemStage::Settlement,
                JudgeSystemStage::Repair,
            ]
        );
        assert_eq!(JudgeSystemStage::OutOfMatch.next(), JudgeSystemStage::OutOfMatch);
    }

    #[test]
    fn time_limit_expiry() {
        assert!(!TimeLimit::Unbounded.is_expired(u64::MAX));
        assert!(!TimeLimit::Seconds(3).is_expired(2_999));
        assert!(TimeLimit::Seconds(3).is_expired(3_000));
        assert_eq!(TimeLimit::Seconds(420).to_string(), "420s");
    }
}
