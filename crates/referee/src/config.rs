//! Referee console configuration.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use judge_runtime::JudgeConfig;

/// Console settings read from the environment.
#[derive(Clone, Debug, Default)]
pub struct RefereeConfig {
    /// Rule table file; the bundled reference table when unset.
    pub tables: Option<PathBuf>,
    pub judge: JudgeConfig,
}

impl RefereeConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JUDGE_TABLES` - Path to a TOML rule table
    /// - `JUDGE_TICK_MS` - Timekeeper tick interval in milliseconds (default: 100)
    /// - `JUDGE_AUTO_ADVANCE` - Advance expired stages automatically (default: true)
    /// - `JUDGE_EVENT_BUFFER` - Per-topic broadcast capacity (default: 100)
    pub fn from_env() -> Self {
        let mut config = Self {
            tables: env::var_os("JUDGE_TABLES").map(PathBuf::from),
            ..Self::default()
        };

        if let Some(tick_ms) = read_env::<u64>("JUDGE_TICK_MS") {
            config.judge.tick_interval = Duration::from_millis(tick_ms.max(1));
        }
        if let Some(auto_advance) = read_env::<bool>("JUDGE_AUTO_ADVANCE") {
            config.judge.auto_advance = auto_advance;
        }
        if let Some(buffer) = read_env::<usize>("JUDGE_EVENT_BUFFER") {
            config.judge.event_buffer_size = buffer.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
