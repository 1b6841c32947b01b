//! Dependency resolution.
//!
//! A [`DependencyResolver`] answers one question: what does this set of
//! libraries directly need? [`closure`] loops it to a fixed point.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use offpkg_schema::{DependencyKind, LibrarySet, PackageIndex, SchemaError};

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Dependency closure did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("Package index unavailable at {location}: {message}")]
    IndexUnavailable { location: String, message: String },

    #[error("Invalid package index at {location}: {source}")]
    InvalidIndex {
        location: String,
        source: SchemaError,
    },
}

pub trait DependencyResolver: Send + Sync {
    /// Direct dependencies of every member of `set`, restricted to `kinds`.
    /// Members the resolver does not know contribute nothing.
    fn direct_dependencies(
        &self,
        set: &LibrarySet,
        kinds: &[DependencyKind],
    ) -> Result<LibrarySet, ResolutionError>;

    /// Libraries that ship with the runtime and are never downloaded.
    fn base_libraries(&self) -> &LibrarySet;
}

/// Resolves against a parsed `PACKAGES` index.
#[derive(Debug, Clone)]
pub struct IndexResolver {
    index: PackageIndex,
    base: LibrarySet,
}

impl IndexResolver {
    pub fn new(index: PackageIndex, base: LibrarySet) -> Self {
        Self { index, base }
    }

    /// Parse index text; `location` is only used in error messages.
    pub fn from_text(text: &str, location: &str, base: LibrarySet) -> Result<Self, ResolutionError> {
        let index = PackageIndex::parse(text).map_err(|source| ResolutionError::InvalidIndex {
            location: location.to_string(),
            source,
        })?;
        Ok(Self::new(index, base))
    }

    pub fn from_file(path: &Path, base: LibrarySet) -> Result<Self, ResolutionError> {
        let location = path.display().to_string();
        let text =
            std::fs::read_to_string(path).map_err(|e| ResolutionError::IndexUnavailable {
                location: location.clone(),
                message: e.to_string(),
            })?;
        Self::from_text(&text, &location, base)
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }
}

impl DependencyResolver for IndexResolver {
    fn direct_dependencies(
        &self,
        set: &LibrarySet,
        kinds: &[DependencyKind],
    ) -> Result<LibrarySet, ResolutionError> {
        Ok(set
            .iter()
            .filter_map(|name| self.index.find(name))
            .flat_map(|entry| entry.dependencies(kinds).cloned())
            .collect())
    }

    fn base_libraries(&self) -> &LibrarySet {
        &self.base
    }
}

/// Expand `set` to its dependency closure, excluding base libraries.
///
/// Only libraries added in the previous round are queried, so each member
/// is asked about once. `max_iterations` bounds the number of rounds.
///
/// # Errors
///
/// Returns [`ResolutionError::NoConvergence`] if new members are still
/// appearing after `max_iterations` rounds, or whatever the resolver returns.
pub fn closure<D: DependencyResolver + ?Sized>(
    resolver: &D,
    set: &LibrarySet,
    kinds: &[DependencyKind],
    max_iterations: usize,
) -> Result<LibrarySet, ResolutionError> {
    let base = resolver.base_libraries();
    let mut resolved = set.difference(base);
    let mut frontier = resolved.clone();

    for round in 1..=max_iterations {
        let added = resolver
            .direct_dependencies(&frontier, kinds)?
            .difference(base)
            .difference(&resolved);
        if added.is_empty() {
            debug!(rounds = round, size = resolved.len(), "closure converged");
            return Ok(resolved);
        }
        resolved = resolved.union(&added);
        frontier = added;
    }

    Err(ResolutionError::NoConvergence {
        iterations: max_iterations,
    })
}
