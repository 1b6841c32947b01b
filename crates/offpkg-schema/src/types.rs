//! Library names, sets and dependency kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Errors raised while parsing schema values from user input or index files.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// A library name was empty or contained characters outside `[A-Za-z0-9._]`.
    #[error("Invalid library name: '{0}'")]
    InvalidName(String),

    /// A platform string did not name a supported binary flavor.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// A dependency kind string was not one of the recognized relationship kinds.
    #[error("Unknown dependency kind: {0}")]
    UnknownDependencyKind(String),

    /// A `PACKAGES` stanza was structurally invalid.
    #[error("Malformed index at line {line}: {message}")]
    MalformedIndex {
        /// 1-based line number in the index text.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
}

/// A case-sensitive library identifier.
///
/// Unlike most package managers the runtime this mirrors treats `Matrix` and
/// `matrix` as different libraries, so no normalization happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryName(String);

impl LibraryName {
    /// Create a library name without validation.
    ///
    /// Use [`LibraryName::parse`] for anything that came from a user or a file.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Parse and validate a library name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidName`] if the name is empty, does not start
    /// with a letter, or contains characters other than ASCII alphanumerics,
    /// `.` and `_`.
    pub fn parse(name: &str) -> Result<Self, SchemaError> {
        let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(SchemaError::InvalidName(name.to_string()))
        }
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LibraryName {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LibraryName> for String {
    fn from(value: LibraryName) -> Self {
        value.0
    }
}

impl std::str::FromStr for LibraryName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<std::path::Path> for LibraryName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl AsRef<str> for LibraryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for LibraryName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for LibraryName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for LibraryName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LibraryName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A duplicate-free collection of library names.
///
/// Backed by an ordered set so reports and archive contents come out in a
/// stable order regardless of scan or resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySet(BTreeSet<LibraryName>);

impl LibrarySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw names without validation.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(|n| LibraryName::new(n.as_ref())).collect()
    }

    /// Insert a name, returning `true` if it was not already present.
    pub fn insert(&mut self, name: LibraryName) -> bool {
        self.0.insert(name)
    }

    /// Whether the set contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Number of names in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &LibraryName> {
        self.0.iter()
    }

    /// Set union.
    pub fn union(&self, other: &LibrarySet) -> LibrarySet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Names in `self` that are not in `other`.
    pub fn difference(&self, other: &LibrarySet) -> LibrarySet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Whether every name in `self` is also in `other`.
    pub fn is_subset(&self, other: &LibrarySet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Render as a comma-separated list for messages.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(LibraryName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<LibraryName> for LibrarySet {
    fn from_iter<T: IntoIterator<Item = LibraryName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<LibraryName> for LibrarySet {
    fn extend<T: IntoIterator<Item = LibraryName>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for LibrarySet {
    type Item = LibraryName;
    type IntoIter = std::collections::btree_set::IntoIter<LibraryName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LibrarySet {
    type Item = &'a LibraryName;
    type IntoIter = std::collections::btree_set::Iter<'a, LibraryName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Relationship kinds a library can declare in the package index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Required when the library is loaded.
    Depends,
    /// Namespace imports, also required at load time.
    Imports,
    /// Headers needed when building from source.
    LinkingTo,
    /// Optional, typically only for tests and vignettes.
    Suggests,
    /// Libraries this one adds functionality to.
    Enhances,
}

impl DependencyKind {
    /// Every kind, in index field order.
    pub const ALL: [DependencyKind; 5] = [
        Self::Depends,
        Self::Imports,
        Self::LinkingTo,
        Self::Suggests,
        Self::Enhances,
    ];

    /// Kinds followed when nothing else is configured: everything needed to
    /// load and build a library, nothing optional.
    pub const DEFAULT: [DependencyKind; 3] = [Self::Depends, Self::Imports, Self::LinkingTo];

    /// The `PACKAGES` field carrying this relationship.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Depends => "Depends",
            Self::Imports => "Imports",
            Self::LinkingTo => "LinkingTo",
            Self::Suggests => "Suggests",
            Self::Enhances => "Enhances",
        }
    }

    /// Inverse of [`DependencyKind::field_name`].
    pub fn from_field_name(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_name() == field)
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "depends" => Ok(Self::Depends),
            "imports" => Ok(Self::Imports),
            "linking-to" | "linkingto" => Ok(Self::LinkingTo),
            "suggests" => Ok(Self::Suggests),
            "enhances" => Ok(Self::Enhances),
            _ => Err(SchemaError::UnknownDependencyKind(s.to_string())),
        }
    }
}

/// The libraries that ship with every runtime installation and are never
/// downloaded.
pub const BASE_LIBRARIES: [&str; 14] = [
    "base",
    "compiler",
    "datasets",
    "graphics",
    "grDevices",
    "grid",
    "methods",
    "parallel",
    "splines",
    "stats",
    "stats4",
    "tcltk",
    "tools",
    "utils",
];

/// [`BASE_LIBRARIES`] as a set.
pub fn base_libraries() -> LibrarySet {
    LibrarySet::from_names(BASE_LIBRARIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_name_is_case_sensitive() {
        let upper = LibraryName::new("Matrix");
        let lower = LibraryName::new("matrix");
        assert_ne!(upper, lower);
        assert_eq!(upper, "Matrix");
    }

    #[test]
    fn test_library_name_parse() {
        assert!(LibraryName::parse("data.table").is_ok());
        assert!(LibraryName::parse("R6").is_ok());
        assert!(LibraryName::parse("").is_err());
        assert!(LibraryName::parse("1abc").is_err());
        assert!(LibraryName::parse("foo/bar").is_err());
        assert!(LibraryName::parse("foo bar").is_err());
    }

    #[test]
    fn test_library_set_dedups() {
        let mut set = LibrarySet::from_names(["b", "a", "b"]);
        assert_eq!(set.len(), 2);
        assert!(!set.insert(LibraryName::new("a")));
        assert_eq!(set.joined(), "a, b");
    }

    #[test]
    fn test_library_set_contains_by_str() {
        let set = LibrarySet::from_names(["ggplot2", "data.table"]);
        assert!(set.contains("ggplot2"));
        assert!(set.contains("data.table"));
        assert!(!set.contains("Ggplot2"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_library_set_algebra() {
        let left = LibrarySet::from_names(["a", "b", "c"]);
        let right = LibrarySet::from_names(["b", "d"]);
        assert_eq!(left.union(&right), LibrarySet::from_names(["a", "b", "c", "d"]));
        assert_eq!(left.difference(&right), LibrarySet::from_names(["a", "c"]));
        assert!(LibrarySet::from_names(["a"]).is_subset(&left));
    }

    #[test]
    fn test_dependency_kind_parsing() {
        assert_eq!("linking-to".parse(), Ok(DependencyKind::LinkingTo));
        assert_eq!("Imports".parse(), Ok(DependencyKind::Imports));
        assert!("recommends".parse::<DependencyKind>().is_err());
        assert_eq!(
            DependencyKind::from_field_name("Suggests"),
            Some(DependencyKind::Suggests)
        );
    }

    #[test]
    fn test_base_libraries_contains_runtime_core() {
        let base = base_libraries();
        assert!(base.contains("stats"));
        assert!(base.contains("grDevices"));
        assert!(!base.contains("ggplot2"));
    }
}
