//! Installer errors.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal installer failures. Empty matches and missing requested libraries
/// are warnings, not errors.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The repository archive or one of its artifacts could not be read.
    #[error("Cannot read archive {}: {message}", path.display())]
    ArchiveRead {
        /// Archive that failed.
        path: PathBuf,
        /// Underlying reason.
        message: String,
    },

    /// Filesystem failure in the library or scratch directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact pattern could not be compiled.
    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] regex::Error),
}
