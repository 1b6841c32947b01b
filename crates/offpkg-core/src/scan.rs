//! Source scanning: find the libraries a project references.
//!
//! Three file categories are recognised. Plain scripts are scanned in full;
//! literate documents only inside their code chunks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use offpkg_schema::{LibraryName, LibrarySet};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    NotUtf8(PathBuf),

    #[error("{}: code chunk opened on line {line} is never closed", path.display())]
    UnterminatedChunk { path: PathBuf, line: usize },

    #[error("Failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },
}

/// Kinds of source file the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Plain scripts: `.R`, `.r`
    Script,
    /// Markdown with fenced code chunks: `.Rmd`, `.rmd`, `.qmd`
    Markdown,
    /// Sweave documents: `.Rnw`
    Sweave,
}

impl FileCategory {
    pub const ALL: [FileCategory; 3] = [Self::Script, Self::Markdown, Self::Sweave];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Script => &["R", "r"],
            Self::Markdown => &["Rmd", "rmd", "qmd"],
            Self::Sweave => &["Rnw"],
        }
    }

    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}

/// Produces the set of libraries referenced by files of one category.
pub trait SourceScanner: Send + Sync {
    fn scan(&self, dir: &Path, category: FileCategory, recursive: bool)
    -> Result<LibrarySet, ScanError>;

    /// Union of every category.
    fn scan_all(&self, dir: &Path, recursive: bool) -> Result<LibrarySet, ScanError> {
        let mut found = LibrarySet::new();
        for category in FileCategory::ALL {
            found.extend(self.scan(dir, category, recursive)?);
        }
        Ok(found)
    }
}

static ATTACH_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:library|require|requireNamespace)\s*\(\s*(?:package\s*=\s*)?["']?([A-Za-z][A-Za-z0-9._]*)["']?"#,
    )
    .expect("Invalid attach call regex")
});

static NAMESPACE_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9._:])([A-Za-z][A-Za-z0-9._]*):::?[A-Za-z._`]")
        .expect("Invalid namespace access regex")
});

static SWEAVE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<<.*>>=\s*$").expect("Invalid Sweave chunk regex"));

static MARKDOWN_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```+\s*\{r[\s,}]").expect("Invalid markdown chunk regex"));

/// Regex-based scanner for R sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScanner;

impl SourceScanner for PatternScanner {
    fn scan(
        &self,
        dir: &Path,
        category: FileCategory,
        recursive: bool,
    ) -> Result<LibrarySet, ScanError> {
        let mut found = LibrarySet::new();
        let walker = WalkDir::new(dir)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| ScanError::Walk {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() || !category.matches(entry.path()) {
                continue;
            }

            let refs = scan_file(entry.path(), category)?;
            debug!(file = %entry.path().display(), count = refs.len(), "scanned");
            found.extend(refs);
        }

        Ok(found)
    }
}

fn scan_file(path: &Path, category: FileCategory) -> Result<LibrarySet, ScanError> {
    let bytes = fs::read(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ScanError::NotUtf8(path.to_path_buf()))?;

    let code = match category {
        FileCategory::Script => text,
        FileCategory::Markdown => chunks(
            &text,
            |l| MARKDOWN_OPEN.is_match(l),
            |l| l.starts_with("```"),
        )
        .map_err(|line| ScanError::UnterminatedChunk {
            path: path.to_path_buf(),
            line,
        })?,
        FileCategory::Sweave => chunks(
            &text,
            |l| SWEAVE_OPEN.is_match(l),
            |l| l == "@" || l.starts_with("@ "),
        )
        .map_err(|line| ScanError::UnterminatedChunk {
            path: path.to_path_buf(),
            line,
        })?,
    };

    Ok(references(&code))
}

/// Concatenate the bodies of code chunks. On an unterminated chunk returns
/// the 1-based line it was opened on.
fn chunks(
    text: &str,
    opens: impl Fn(&str) -> bool,
    closes: impl Fn(&str) -> bool,
) -> Result<String, usize> {
    let mut code = String::new();
    let mut open_line = None;

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        match open_line {
            None if opens(trimmed) => open_line = Some(i + 1),
            None => {}
            // A new chunk header implicitly closes the previous chunk.
            Some(_) if opens(trimmed) => open_line = Some(i + 1),
            Some(_) if closes(trimmed.trim_end()) => open_line = None,
            Some(_) => {
                code.push_str(line);
                code.push('\n');
            }
        }
    }

    match open_line {
        Some(line) => Err(line),
        None => Ok(code),
    }
}

/// Library names referenced in a block of code. Comment lines are ignored.
pub fn references(code: &str) -> LibrarySet {
    let mut found = LibrarySet::new();
    for line in code.lines() {
        let line = strip_comment(line);
        for caps in ATTACH_CALL.captures_iter(line) {
            found.insert(LibraryName::new(&caps[1]));
        }
        for caps in NAMESPACE_ACCESS.captures_iter(line) {
            found.insert(LibraryName::new(&caps[1]));
        }
    }
    found
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}
