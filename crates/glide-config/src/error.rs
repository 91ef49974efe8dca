//! Configuration error types.

/// Errors that can occur when loading, saving, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read `config.ron`.
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to write `config.ron`.
    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),

    /// `config.ron` is not valid RON for [`Config`](crate::Config).
    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// Replay knobs are inconsistent with each other.
    #[error("invalid knobs: {0}")]
    InvalidKnobs(String),
}
