//! Archive extraction module
//!
//! Handles the outer repository zip (listing, single-entry extraction) and
//! the per-library inner artifacts, which are either zip or gzip-compressed
//! tar archives.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;
use zip::ZipArchive;

/// Failure while reading or unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Underlying filesystem or stream error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file extension is not a known artifact format.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The archive is corrupt, empty, or contains an unsafe path.
    #[error("Archive error: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Container format of a per-library artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// `.zip`
    Zip,
    /// `.tgz` / `.tar.gz`
    TarGz,
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Detect artifact format from file extension
pub fn detect_format(path: &Path) -> Option<ArtifactFormat> {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".zip") {
        Some(ArtifactFormat::Zip)
    } else if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        Some(ArtifactFormat::TarGz)
    } else {
        None
    }
}

/// Entry names of a zip archive in central-directory order, without
/// extracting anything.
pub fn list_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    archive.file_names().map(str::to_string).collect()
}

/// Copy a single zip entry to `dest` (a file path).
pub fn extract_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry: &str,
    dest: &Path,
) -> Result<(), ExtractError> {
    let mut file = archive.by_name(entry)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut outfile = File::create(dest)?;
    io::copy(&mut file, &mut outfile)?;
    Ok(())
}

/// Name of the top-level directory of an artifact, taken from the first path
/// it lists.
pub fn top_level_dir(artifact: &Path) -> Result<String, ExtractError> {
    let first = match require_format(artifact)? {
        ArtifactFormat::Zip => {
            let mut archive = ZipArchive::new(BufReader::new(File::open(artifact)?))?;
            if archive.is_empty() {
                None
            } else {
                Some(PathBuf::from(archive.by_index(0)?.name()))
            }
        }
        ArtifactFormat::TarGz => {
            let reader = GzDecoder::new(BufReader::new(File::open(artifact)?));
            let mut archive = tar::Archive::new(reader);
            match archive.entries()?.next() {
                Some(entry) => Some(entry?.path()?.into_owned()),
                None => None,
            }
        }
    };

    first
        .as_deref()
        .and_then(|p| {
            p.components().find_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
        })
        .ok_or_else(|| {
            ExtractError::Archive(format!("{} has no entries", artifact.display()))
        })
}

/// Extract an artifact into `dest_dir`, dispatching on its extension.
pub fn extract_artifact(
    artifact: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    match require_format(artifact)? {
        ArtifactFormat::Zip => extract_zip(artifact, dest_dir),
        ArtifactFormat::TarGz => extract_tar_gz(artifact, dest_dir),
    }
}

fn require_format(path: &Path) -> Result<ArtifactFormat, ExtractError> {
    detect_format(path).ok_or_else(|| ExtractError::UnsupportedFormat(path.display().to_string()))
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
///
/// Link entries are refused and every entry goes through `unpack_in`, so
/// modes are kept and nothing is written outside `dest_dir`.
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path = sanitize(&entry.path()?)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            return Err(ExtractError::Archive(format!(
                "Link entries are not supported: {}",
                relative_path.display()
            )));
        }

        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::Archive(format!(
                "Entry escapes the destination: {}",
                relative_path.display()
            )));
        }

        if entry_type.is_dir() {
            continue;
        }

        extracted_files.push(ExtractedFile {
            absolute_path: dest_dir.join(&relative_path),
            relative_path,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        apply_mode(&absolute_path, file.unix_mode())?;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Reject absolute paths and `..` components.
fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}
