use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{MetronomeError, MetronomeResult};
use crate::sequencer::{TempoRange, DEFAULT_LOOKAHEAD, MAX_LOOKAHEAD};

/// Construction-time settings. Nothing here changes while the metronome runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub poll_interval_ms: u64,
    pub lookahead_secs: f64,
    pub min_tempo: f64,
    pub max_tempo: f64,
    pub initial_tempo: f64,
    /// WAV file for the tick; the built-in click is used when unset
    pub sample_path: Option<PathBuf>,
    pub volume: f32,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            lookahead_secs: DEFAULT_LOOKAHEAD,
            min_tempo: 1.0,
            max_tempo: 320.0,
            initial_tempo: 120.0,
            sample_path: None,
            volume: 0.8,
        }
    }
}

impl MetronomeConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> MetronomeResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(MetronomeError::Config("poll interval must be at least 1ms".into()));
        }
        if !(self.lookahead_secs > 0.0 && self.lookahead_secs <= MAX_LOOKAHEAD) {
            return Err(MetronomeError::Config(format!(
                "lookahead must be within (0, {}] seconds, got {}",
                MAX_LOOKAHEAD, self.lookahead_secs
            )));
        }
        if !(self.min_tempo.is_finite() && self.min_tempo > 0.0) {
            return Err(MetronomeError::Config(format!(
                "minimum tempo must be positive, got {}",
                self.min_tempo
            )));
        }
        if !self.max_tempo.is_finite() || self.min_tempo > self.max_tempo {
            return Err(MetronomeError::Config(format!(
                "tempo range [{}, {}] is empty",
                self.min_tempo, self.max_tempo
            )));
        }
        if !self.tempo_range().contains(self.initial_tempo) {
            return Err(MetronomeError::Config(format!(
                "initial tempo {} outside [{}, {}]",
                self.initial_tempo, self.min_tempo, self.max_tempo
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(MetronomeError::Config(format!(
                "volume must be within 0.0-1.0, got {}",
                self.volume
            )));
        }
        Ok(())
    }

    pub fn tempo_range(&self) -> TempoRange {
        TempoRange::new(self.min_tempo, self.max_tempo)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MetronomeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert_eq!(config.lookahead_secs, 0.1);
        assert_eq!(config.tempo_range(), TempoRange::new(1.0, 320.0));
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            MetronomeConfig { poll_interval_ms: 0, ..Default::default() },
            MetronomeConfig { lookahead_secs: 0.0, ..Default::default() },
            MetronomeConfig { lookahead_secs: f64::NAN, ..Default::default() },
            MetronomeConfig { lookahead_secs: 1e9, ..Default::default() },
            MetronomeConfig { lookahead_secs: f64::INFINITY, ..Default::default() },
            MetronomeConfig { min_tempo: 0.0, ..Default::default() },
            MetronomeConfig { min_tempo: 200.0, max_tempo: 100.0, ..Default::default() },
            MetronomeConfig { initial_tempo: 400.0, ..Default::default() },
            MetronomeConfig { volume: 1.5, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(MetronomeError::Config(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn lookahead_upper_bound_is_inclusive() {
        let config = MetronomeConfig { lookahead_secs: MAX_LOOKAHEAD, ..Default::default() };
        assert!(config.validate().is_ok());
        let config = MetronomeConfig { lookahead_secs: MAX_LOOKAHEAD + 0.5, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "initial_tempo": 90, "sample_path": "tick.wav" }}"#).unwrap();

        let config = MetronomeConfig::load(file.path()).unwrap();
        assert_eq!(config.initial_tempo, 90.0);
        assert_eq!(config.sample_path, Some(PathBuf::from("tick.wav")));
        assert_eq!(config.poll_interval_ms, 25);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(MetronomeConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(MetronomeConfig::load(Path::new("/nonexistent/tickoxide.json")).is_err());
    }
}
