use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up or persisting a run.
///
/// Individual invocations never produce these; their failures are
/// reported as [`crate::execution::ExecutionOutcome`] values.
#[derive(Debug, Error)]
pub enum PatoError {
    #[error("invalid configuration value for {key}: {value:?} ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("worker pool is no longer accepting submissions")]
    PoolClosed,

    #[error("output directory {} is not usable: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatoError {
    pub fn invalid_config(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PatoError>;
