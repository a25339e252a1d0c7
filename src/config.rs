//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Timing of the onboarding conversation's staged reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long the typing indicator shows before a guide message lands.
    pub typing_delay: Duration,
    /// Extra reveal time per word after the first.
    pub word_reveal_step: Duration,
    /// Reveal time of the first word.
    pub word_reveal_base: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(1300),
            word_reveal_step: Duration::from_millis(35),
            word_reveal_base: Duration::from_millis(180),
        }
    }
}

impl TimingConfig {
    /// Build from `WAVE_*_MS` environment variables, falling back to defaults
    /// for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            typing_delay: millis_var("WAVE_TYPING_DELAY_MS")?.unwrap_or(defaults.typing_delay),
            word_reveal_step: millis_var("WAVE_WORD_REVEAL_STEP_MS")?
                .unwrap_or(defaults.word_reveal_step),
            word_reveal_base: millis_var("WAVE_WORD_REVEAL_BASE_MS")?
                .unwrap_or(defaults.word_reveal_base),
        })
    }

    /// Time the word-by-word animation of `text` takes to finish.
    ///
    /// Suggested answers wait this long after their guide message lands, so
    /// chips never appear under half-revealed text.
    pub fn reveal_duration(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as u32;
        self.word_reveal_step * (words - 1) + self.word_reveal_base
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default)]
pub struct WaveConfig {
    pub timing: TimingConfig,
    /// Optional JSON script replacing the built-in onboarding script.
    pub script_path: Option<PathBuf>,
}

impl WaveConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            timing: TimingConfig::from_env()?,
            script_path: std::env::var("WAVE_SCRIPT_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn millis_var(key: &str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_millis(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a millisecond count ({e})"),
        })
}
