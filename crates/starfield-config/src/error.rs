//! Errors from locating, reading, and writing `config.ron`.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No `--config` was given and the platform has no config directory.
    #[error("no config directory available, pass --config")]
    NoConfigDir,

    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// The file exists but is not valid RON for [`crate::Config`].
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),
}
