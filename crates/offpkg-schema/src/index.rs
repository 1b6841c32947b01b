//! `PACKAGES` index format.
//!
//! Stanzas of `Field: value` lines separated by blank lines. Values may
//! continue on following lines that start with whitespace. Dependency
//! fields are comma separated and may carry a parenthesized version
//! constraint, which offpkg ignores.
//!
//! ```text
//! Package: alpha
//! Version: 1.0
//! Depends: R (>= 3.5), gamma
//! Imports: stats,
//!     utils
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

use crate::types::{DependencyKind, LibraryName, LibrarySet, SchemaError};
use crate::version::is_newer;

/// Pseudo-dependency naming the runtime itself.
const RUNTIME_PSEUDO_DEP: &str = "R";

/// One library's record in a package index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Library name.
    pub name: LibraryName,
    /// Version string as published.
    pub version: String,
    /// Declared relationships, by kind.
    #[serde(default)]
    pub dependencies: BTreeMap<DependencyKind, Vec<LibraryName>>,
}

impl IndexEntry {
    /// Create an entry with no dependencies.
    pub fn new(name: LibraryName, version: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach dependencies of one kind.
    pub fn with_dependencies<I, S>(mut self, kind: DependencyKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dependencies
            .entry(kind)
            .or_default()
            .extend(names.into_iter().map(|n| LibraryName::new(n.as_ref())));
        self
    }

    /// Direct dependencies restricted to `kinds`.
    pub fn dependencies<'a>(
        &'a self,
        kinds: &'a [DependencyKind],
    ) -> impl Iterator<Item = &'a LibraryName> + 'a {
        kinds
            .iter()
            .filter_map(|k| self.dependencies.get(k))
            .flatten()
    }
}

/// A parsed package index, keyed by library name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    entries: BTreeMap<LibraryName, IndexEntry>,
}

impl PackageIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `PACKAGES` text.
    ///
    /// When a library appears more than once, the newest version wins.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedIndex`] for lines that are neither a
    /// field nor a continuation, and for stanzas without `Package` or
    /// `Version`.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let mut index = Self::new();
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut stanza_start = 1;

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                if !fields.is_empty() {
                    index.upsert(entry_from_fields(&fields, stanza_start)?);
                    fields.clear();
                }
                stanza_start = line_no + 1;
                continue;
            }

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = fields.last_mut() else {
                    return Err(SchemaError::MalformedIndex {
                        line: line_no,
                        message: "continuation line outside of a field".to_string(),
                    });
                };
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                return Err(SchemaError::MalformedIndex {
                    line: line_no,
                    message: format!("expected 'Field: value', got '{line}'"),
                });
            };
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }

        if !fields.is_empty() {
            index.upsert(entry_from_fields(&fields, stanza_start)?);
        }

        Ok(index)
    }

    /// Render back to `PACKAGES` text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.values().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("Package: {}\nVersion: {}\n", entry.name, entry.version));
            for (kind, deps) in &entry.dependencies {
                if deps.is_empty() {
                    continue;
                }
                let joined = deps
                    .iter()
                    .map(LibraryName::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("{}: {joined}\n", kind.field_name()));
            }
        }
        out
    }

    /// Insert an entry, replacing an existing one only if this one is newer.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self.entries.entry(entry.name.clone()) {
            Entry::Occupied(mut existing) => {
                if is_newer(&existing.get().version, &entry.version) {
                    existing.insert(entry);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    /// Look up a library by exact name.
    pub fn find(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    /// Every library name in the index.
    pub fn names(&self) -> LibrarySet {
        self.entries.keys().cloned().collect()
    }

    /// Iterate over entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_from_fields(fields: &[(String, String)], line: usize) -> Result<IndexEntry, SchemaError> {
    let lookup = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let name = lookup("Package").ok_or_else(|| SchemaError::MalformedIndex {
        line,
        message: "stanza has no Package field".to_string(),
    })?;
    let version = lookup("Version").ok_or_else(|| SchemaError::MalformedIndex {
        line,
        message: format!("stanza for '{name}' has no Version field"),
    })?;

    let name = LibraryName::parse(name).map_err(|_| SchemaError::MalformedIndex {
        line,
        message: format!("invalid package name '{name}'"),
    })?;

    let mut entry = IndexEntry::new(name, version);
    for (key, value) in fields {
        if let Some(kind) = DependencyKind::from_field_name(key) {
            let deps: Vec<LibraryName> = parse_dependency_list(value).collect();
            if !deps.is_empty() {
                entry.dependencies.entry(kind).or_default().extend(deps);
            }
        }
    }

    Ok(entry)
}

/// Parse a dependency field value such as `R (>= 3.5), gamma, delta(>= 1.0)`.
pub fn parse_dependency_list(value: &str) -> impl Iterator<Item = LibraryName> + '_ {
    value.split(',').filter_map(|item| {
        let name = item.split('(').next().unwrap_or_default().trim();
        if name.is_empty() || name == RUNTIME_PSEUDO_DEP {
            None
        } else {
            Some(LibraryName::new(name))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Package: alpha
Version: 1.0
Depends: R (>= 3.5), gamma
Imports: stats,
    utils (>= 4.0)

Package: gamma
Version: 0.2-1
LinkingTo: Rcpp

Package: alpha
Version: 0.9
";

    #[test]
    fn test_parse_sample() {
        let index = PackageIndex::parse(SAMPLE).unwrap();
        assert_eq!(index.len(), 2);

        let alpha = index.find("alpha").unwrap();
        assert_eq!(alpha.version, "1.0");
        let deps: Vec<&str> = alpha
            .dependencies(&DependencyKind::ALL)
            .map(LibraryName::as_str)
            .collect();
        assert_eq!(deps, vec!["gamma", "stats", "utils"]);

        let gamma = index.find("gamma").unwrap();
        assert_eq!(
            gamma.dependencies(&[DependencyKind::Depends]).count(),
            0,
            "LinkingTo must not leak into Depends"
        );
        assert_eq!(gamma.dependencies(&[DependencyKind::LinkingTo]).count(), 1);
    }

    #[test]
    fn test_newest_version_wins() {
        let mut index = PackageIndex::new();
        index.upsert(IndexEntry::new(LibraryName::new("a"), "1.2-10"));
        index.upsert(IndexEntry::new(LibraryName::new("a"), "1.2-9"));
        assert_eq!(index.find("a").unwrap().version, "1.2-10");
    }

    #[test]
    fn test_parse_large_index_with_duplicates() {
        let mut text = String::new();
        for i in 0..5000 {
            text.push_str(&format!("Package: lib{i}\nVersion: 1.{i}\n\n"));
        }
        for i in (0..5000).rev() {
            text.push_str(&format!("Package: lib{i}\nVersion: 1.{}\n\n", i + 1));
        }

        let index = PackageIndex::parse(&text).unwrap();
        assert_eq!(index.len(), 5000);
        assert_eq!(index.find("lib0").unwrap().version, "1.1");
        assert_eq!(index.find("lib4999").unwrap().version, "1.5000");
        assert!(index.find("lib5000").is_none());
        assert_eq!(index.iter().next().unwrap().name, "lib0");
    }

    #[test]
    fn test_render_parse_preserves_entries() {
        let index = PackageIndex::parse(SAMPLE).unwrap();
        let rendered = index.render();
        assert!(rendered.contains("Package: gamma\nVersion: 0.2-1\nLinkingTo: Rcpp\n"));
        assert_eq!(PackageIndex::parse(&rendered).unwrap(), index);
    }

    #[test]
    fn test_missing_version_is_malformed() {
        let err = PackageIndex::parse("Package: a\nDepends: b\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedIndex { line: 1, .. }));
    }

    #[test]
    fn test_garbage_line_is_malformed() {
        let err = PackageIndex::parse("Package: a\nnot a field\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedIndex { line: 2, .. }));
    }

    #[test]
    fn test_dependency_list_ignores_runtime_and_constraints() {
        let deps: Vec<LibraryName> = parse_dependency_list("R (>= 4.1), a(>= 1), , b").collect();
        assert_eq!(deps, vec![LibraryName::new("a"), LibraryName::new("b")]);
    }
}
