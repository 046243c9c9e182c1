//! Archive unpacking and build-metadata detection.
//!
//! Source distributions arrive as `.tar.gz`, `.tgz`, `.tar.zst`, or `.zip`;
//! wheels as `.whl`. Every entry path is validated before it is written so
//! an archive cannot escape its destination (zip-slip).

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// Files whose presence marks an unpacked source distribution as buildable.
pub const SDIST_METADATA_FILES: [&str; 3] = ["pyproject.toml", "setup.py", "setup.cfg"];

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The archive's file name has no recognised extension.
    #[error("unsupported archive format: {file_name}")]
    UnsupportedFormat {
        /// The file name that could not be classified.
        file_name: String,
    },

    /// The zip container could not be read.
    #[error("invalid zip archive: {reason}")]
    Zip {
        /// The zip reader's description of the problem.
        reason: String,
    },
}

/// The container formats the installer can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// Zstandard-compressed tarball (`.tar.zst`).
    TarZst,
    /// Zip source distribution (`.zip`).
    Zip,
    /// Built wheel (`.whl`), a zip with a `*.dist-info` directory.
    Wheel,
}

impl ArchiveFormat {
    /// Classify an archive by its file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use venvpin_installer::environment::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::detect("boto3-1.17.86.tar.gz"),
    ///     Some(ArchiveFormat::TarGz)
    /// );
    /// assert_eq!(
    ///     ArchiveFormat::detect("six-1.16.0-py2.py3-none-any.whl"),
    ///     Some(ArchiveFormat::Wheel)
    /// );
    /// assert_eq!(ArchiveFormat::detect("README.md"), None);
    /// ```
    #[must_use]
    pub fn detect(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.zst") {
            Some(Self::TarZst)
        } else if lower.ends_with(".whl") {
            Some(Self::Wheel)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Classify an archive by its file name, failing on unknown extensions.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnsupportedFormat`] when
    /// [`detect`](Self::detect) finds no match.
    pub fn require(file_name: &str) -> Result<Self, ExtractionError> {
        Self::detect(file_name).ok_or_else(|| ExtractionError::UnsupportedFormat {
            file_name: file_name.to_owned(),
        })
    }
}

/// Unpack `bytes` in `format` into `dest_dir`.
///
/// Returns the relative paths of the regular files written. Symbolic and
/// hard links are skipped.
///
/// # Errors
///
/// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
/// escape `dest_dir`, [`ExtractionError::EmptyArchive`] if no files were
/// written, and [`ExtractionError::Io`] or [`ExtractionError::Zip`] on
/// decode or write failures.
pub fn unpack(
    format: ArchiveFormat,
    bytes: &[u8],
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractionError> {
    fs::create_dir_all(dest_dir)?;
    let extracted = match format {
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(Cursor::new(bytes)), dest_dir)?,
        ArchiveFormat::TarZst => unpack_tar(zstd::Decoder::new(Cursor::new(bytes))?, dest_dir)?,
        ArchiveFormat::Zip | ArchiveFormat::Wheel => unpack_zip(bytes, dest_dir)?,
    };
    if extracted.is_empty() {
        return Err(ExtractionError::EmptyArchive);
    }
    Ok(extracted)
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            log::debug!("skipping link entry {}", entry_path.display());
            continue;
        }

        let dest_path = dest_dir.join(&entry_path);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;

        if entry_type.is_file() {
            extracted.push(entry_path);
        }
    }
    Ok(extracted)
}

fn unpack_zip(bytes: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(zip_error)?;
        let Some(entry_path) = file.enclosed_name() else {
            return Err(ExtractionError::PathTraversal {
                path: file.name().to_owned(),
            });
        };
        validate_entry_path(&entry_path)?;

        let dest_path = dest_dir.join(&entry_path);
        if file.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&dest_path)?;
        io::copy(&mut file, &mut out)?;
        extracted.push(entry_path);
    }
    Ok(extracted)
}

fn zip_error(err: zip::result::ZipError) -> ExtractionError {
    match err {
        zip::result::ZipError::Io(e) => ExtractionError::Io(e),
        other => ExtractionError::Zip {
            reason: other.to_string(),
        },
    }
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Locate the directory of an unpacked source distribution that carries
/// build metadata.
///
/// Sdists conventionally wrap everything in a single `<name>-<version>/`
/// directory; when that is the only top-level entry it is searched,
/// otherwise `unpacked` itself is.
///
/// # Errors
///
/// Returns an I/O error if `unpacked` cannot be listed.
pub fn find_sdist_project(unpacked: &Path) -> io::Result<Option<PathBuf>> {
    let project = single_subdirectory(unpacked)?.unwrap_or_else(|| unpacked.to_path_buf());
    let has_metadata = SDIST_METADATA_FILES
        .iter()
        .any(|name| project.join(name).is_file());
    Ok(has_metadata.then_some(project))
}

/// Return true when an unpacked wheel contains `*.dist-info/METADATA`.
///
/// # Errors
///
/// Returns an I/O error if `unpacked` cannot be listed.
pub fn has_wheel_metadata(unpacked: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(unpacked)? {
        let entry = entry?;
        let is_dist_info = entry.file_name().to_string_lossy().ends_with(".dist-info");
        if is_dist_info && entry.path().join("METADATA").is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn single_subdirectory(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?;
    let Some(first) = entries.next().transpose()? else {
        return Ok(None);
    };
    if entries.next().is_some() {
        return Ok(None);
    }
    let path = first.path();
    Ok(path.is_dir().then_some(path))
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
