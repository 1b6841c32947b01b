//! Shared types for offpkg.
//!
//! Everything both halves of the system agree on lives here: library names
//! and sets, the platform/runtime-version target, the on-disk repository
//! layout, the `PACKAGES` index format, and the progress reporter. The
//! standalone installer links against this crate and nothing else from the
//! workspace.

pub mod index;
pub mod layout;
pub mod platform;
pub mod reporter;
pub mod types;
pub mod version;

// Re-exports
pub use index::{IndexEntry, PackageIndex};
pub use layout::*;
pub use platform::{Platform, RepositoryTarget};
pub use reporter::{NullReporter, Reporter, Warning};
pub use types::*;
