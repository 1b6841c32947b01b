//! Core library for offpkg.
//!
//! Builds portable package repositories for offline installation: scan a
//! project for the libraries it uses, resolve their dependencies against a
//! mirror's index, fetch the binaries for one platform and runtime version,
//! and zip the result. The install side lives in `offpkg-install`.

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod package;
pub mod paths;
pub mod resolve;
pub mod scan;

pub use builder::{BuildReport, BuildRequest, RepositoryBuilder};
pub use config::{BuildConfig, ResolveStrategy};
pub use error::BuildError;
pub use export::{bundled_installer, export_installer};
pub use fetch::{FetchOptions, FetchOutcome, Fetcher, MirrorFetcher};
pub use resolve::{DependencyResolver, IndexResolver, ResolutionError, closure};
pub use scan::{FileCategory, PatternScanner, ScanError, SourceScanner};

/// User Agent string for mirror requests
pub const USER_AGENT: &str = concat!("offpkg/", env!("CARGO_PKG_VERSION"));
