//! Errors raised by the repository builder

use std::path::PathBuf;

use thiserror::Error;

use crate::resolve::ResolutionError;
use crate::scan::ScanError;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Failed to write archive {path}: {message}")]
    Packaging { path: PathBuf, message: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Destination already exists: {} (use --force to overwrite)", .0.display())]
    DestinationExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl BuildError {
    pub fn packaging(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        Self::Packaging {
            path: path.into(),
            message: msg.to_string(),
        }
    }
}

impl From<reqwest::Error> for BuildError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
