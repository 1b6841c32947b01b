use std::path::Path;

use anyhow::{Context, Result};
use offpkg_core::{PatternScanner, SourceScanner};

pub fn scan(dir: &Path, recursive: bool) -> Result<()> {
    let found = PatternScanner
        .scan_all(dir, recursive)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    for name in &found {
        println!("{name}");
    }
    Ok(())
}
