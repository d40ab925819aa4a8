//! # Harness Error Types

use std::path::PathBuf;

use strata_core::AllocError;
use thiserror::Error;

/// Errors that can stop a soak run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::SoakConfig`].
    #[error("malformed configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The allocator under test failed in a way the soak does not tolerate.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
