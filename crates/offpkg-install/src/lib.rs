//! offpkg-install - install libraries from an offline repository archive.
//!
//! This crate is the half of offpkg that runs on the disconnected machine.
//! It deliberately depends on nothing but `offpkg-schema` and the archive
//! crates so the `offpkg-install` binary can be carried over on its own,
//! before anything else is installed.
//!
//! # Archive Layout
//!
//! ```text
//! repository.zip
//! └── bin/<platform>/contrib/<runtime-version>/
//!     ├── <name>_<version>.<ext>   # one artifact per library, itself an archive
//!     ├── PACKAGES                 # not read here
//!     └── PACKAGES.gz              # not read here
//! ```

pub mod args;
pub mod console;
pub mod error;
pub mod extract;
pub mod install;

pub use args::InstallArgs;
pub use console::ConsoleReporter;
pub use error::InstallError;
pub use install::{DEFAULT_ARCHIVE, InstallOptions, InstallReport, install_repository};
