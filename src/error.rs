use thiserror::Error;

/// Errors surfaced by the metronome core
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetronomeError {
    /// The host cannot provide an isolated timer or audio capability
    #[error("environment unsupported: {0}")]
    EnvironmentUnsupported(String),

    /// No usable audio output device
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The tick sample could not be decoded
    #[error("failed to decode sample: {0}")]
    Decode(String),

    /// A tempo outside the configured range (or non-positive)
    #[error("tempo {value} out of range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type MetronomeResult<T> = Result<T, MetronomeError>;
