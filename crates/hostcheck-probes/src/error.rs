//! Error types for probe execution and strategy files

use std::path::PathBuf;

use hostcheck_core::BuildError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to read strategy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid strategy file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid strategy: {0}")]
    Build(#[from] BuildError),

    #[error("{name} has an empty command")]
    EmptyCommand { name: String },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("Failed to start probe runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Result type for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
