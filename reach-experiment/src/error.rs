use std::path::PathBuf;
use thiserror::Error;

/// Misconfiguration detected before a session starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("trial count must be at least 1")]
    NoTrials,

    #[error("target layout has no locations")]
    EmptyLocationSet,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session aborted during trial {trial}")]
    Aborted { trial: usize },
}
