//! Packaging a repository tree into a single zip archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::BuildError;

/// Zip every file under `root` into `output`, keeping paths relative to
/// `root` and `/`-separated. An existing `output` is overwritten.
///
/// # Errors
///
/// Any failure is a [`BuildError::Packaging`] naming `output`.
pub fn package_repository(root: &Path, output: &Path) -> Result<PathBuf, BuildError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| BuildError::packaging(output, e))?;
    }

    let file = File::create(output).map_err(|e| BuildError::packaging(output, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::packaging(output, e))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| BuildError::packaging(output, e))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(rel, options).map_err(|e| BuildError::packaging(output, e))?;
        } else if entry.file_type().is_file() {
            zip.start_file(rel, options).map_err(|e| BuildError::packaging(output, e))?;
            let mut src = File::open(entry.path()).map_err(|e| BuildError::packaging(output, e))?;
            io::copy(&mut src, &mut zip).map_err(|e| BuildError::packaging(output, e))?;
            count += 1;
        }
    }

    zip.finish().map_err(|e| BuildError::packaging(output, e))?;
    info!(output = %output.display(), files = count, "repository archive written");
    Ok(output.to_path_buf())
}
