use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort palette derivation. Nothing is published when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode audio: {0}")]
    Decode(String),
    #[error("resampling to {target} Hz failed: {reason}")]
    Resample { target: u32, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("derivation cancelled")]
    Cancelled,
}

/// A configuration value the pipeline cannot run with.
#[derive(Debug, Error, PartialEq)]
#[error("invalid config: {field} {requirement}")]
pub struct ConfigError {
    pub field: &'static str,
    pub requirement: &'static str,
}

impl From<symphonia::core::errors::Error> for DeriveError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        DeriveError::Decode(err.to_string())
    }
}
