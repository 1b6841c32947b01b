//! Reporter trait for dependency injection
//!
//! Builder and installer report progress and non-fatal conditions through
//! this trait so the core logic is not coupled to a particular terminal
//! front end.

use std::fmt;

use crate::types::{LibraryName, LibrarySet};

/// A non-fatal condition. Warnings are reported and recorded but never change
/// whether an operation succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Some requested libraries could not be resolved or downloaded and were
    /// left out of the repository.
    PartialDownload {
        /// Libraries that failed.
        failed: LibrarySet,
    },
    /// No archive entry matched the target contrib path.
    NoPackagesFound {
        /// The contrib directory that was searched.
        contrib_dir: String,
    },
    /// Some explicitly requested libraries have no artifact in the archive.
    MissingRequested {
        /// The requested names with no matching artifact.
        missing: LibrarySet,
        /// How many names were requested.
        requested: usize,
        /// How many artifacts matched.
        found: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialDownload { failed } => write!(
                f,
                "{} package(s) could not be downloaded and were skipped: {}",
                failed.len(),
                failed.joined()
            ),
            Self::NoPackagesFound { contrib_dir } => {
                write!(f, "No packages found in the archive under '{contrib_dir}'")
            }
            Self::MissingRequested {
                missing,
                requested,
                found,
            } => write!(
                f,
                "Not all requested packages were found in the archive ({found} of {requested}); missing: {}",
                missing.joined()
            ),
        }
    }
}

/// Sink for user-visible progress and status.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Fetching", "Installing").
    fn section(&self, title: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Report a non-fatal condition.
    fn warning(&self, warning: &Warning);

    /// A library is about to be installed; `current` is 1-based.
    fn installing(&self, name: &LibraryName, current: usize, total: usize);

    /// A library was left alone, with the reason.
    fn skipped(&self, name: &LibraryName, reason: &str);

    /// Marks a library operation as successfully completed.
    fn done(&self, name: &LibraryName, detail: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, warning: &Warning) {
        (**self).warning(warning);
    }
    fn installing(&self, name: &LibraryName, current: usize, total: usize) {
        (**self).installing(name, current, total);
    }
    fn skipped(&self, name: &LibraryName, reason: &str) {
        (**self).skipped(name, reason);
    }
    fn done(&self, name: &LibraryName, detail: &str) {
        (**self).done(name, detail);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &Warning) {}
    fn installing(&self, _: &LibraryName, _: usize, _: usize) {}
    fn skipped(&self, _: &LibraryName, _: &str) {}
    fn done(&self, _: &LibraryName, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reporter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullReporter>();
    }

    #[test]
    fn warning_messages_name_the_libraries() {
        let warning = Warning::PartialDownload {
            failed: LibrarySet::from_names(["bogus", "nope"]),
        };
        assert_eq!(
            warning.to_string(),
            "2 package(s) could not be downloaded and were skipped: bogus, nope"
        );

        let warning = Warning::MissingRequested {
            missing: LibrarySet::from_names(["zeta"]),
            requested: 2,
            found: 1,
        };
        assert!(warning.to_string().ends_with("missing: zeta"));
    }
}
