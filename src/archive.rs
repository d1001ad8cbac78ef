//! Locating and packaging dSYM bundles for upload.
//!
//! The search path is classified by suffix: a `.dSYM` path is a single
//! bundle, a `.zip` path is a pre-packaged archive (e.g. downloaded from App
//! Store Connect) that is extracted into a scratch directory first, and
//! anything else is a directory scanned for bundles. Whatever the branch,
//! the output is one gzip-compressed tar file under the builder's output
//! directory.
//!
//! Archive entry names are made relative by handing the bundle root to the
//! tar writer explicitly; the process working directory is never touched.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

/// Suffix identifying a debug-symbol bundle.
pub const BUNDLE_SUFFIX: &str = ".dSYM";

/// Suffix identifying a pre-packaged zip archive of bundles.
const PACKAGED_SUFFIX: &str = ".zip";

/// A packaged archive of symbol bundles ready for upload.
///
/// The file is intentionally left behind after the run so a failed upload
/// can be retried or inspected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolArchive {
    /// Location of the gzip-compressed tar file.
    pub path: Utf8PathBuf,
    /// Size of the archive in bytes.
    pub size_bytes: u64,
}

/// Errors raised while locating or packaging bundles.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Raised when the search path yields no symbol bundles.
    #[error("no dSYM bundles found under {search_path}")]
    NoBundlesFound {
        /// Search path that was classified and scanned.
        search_path: Utf8PathBuf,
    },
    /// Raised when the search path cannot be enumerated.
    #[error("failed to scan {path}: {message}")]
    Scan {
        /// Path that could not be enumerated.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a packaged zip archive cannot be extracted.
    #[error("failed to extract {path}: {message}")]
    Extract {
        /// Archive that could not be extracted.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when writing the tar archive fails.
    #[error("failed to write archive under {path}: {message}")]
    Io {
        /// Path involved in the failed write.
        path: String,
        /// Human-readable error message.
        message: String,
    },
}

impl ArchiveError {
    fn io(path: &Path, err: &dyn std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Packages dSYM bundles found under a search path into a `.tgz` file.
#[derive(Clone, Debug)]
pub struct ArchiveBuilder {
    output_dir: PathBuf,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir(),
        }
    }
}

impl ArchiveBuilder {
    /// Creates a builder writing archives to the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides where archives and extraction scratch space are created.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Classifies the search path and produces exactly one archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoBundlesFound`] when the search path yields
    /// no bundles, and the other variants for scan, extraction, or write
    /// failures.
    pub fn build(&self, search_path: &Utf8Path) -> Result<SymbolArchive, ArchiveError> {
        if search_path.as_str().ends_with(BUNDLE_SUFFIX) {
            tracing::debug!(path = %search_path, "treating search path as a single bundle");
            let name = search_path
                .file_name()
                .ok_or_else(|| ArchiveError::Scan {
                    path: search_path.to_string(),
                    message: String::from("path has no file name"),
                })?
                .to_owned();
            let root = search_path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            self.pack(root.as_std_path(), &[name])
        } else if search_path.as_str().ends_with(PACKAGED_SUFFIX) {
            tracing::debug!(path = %search_path, "treating search path as a packaged archive");
            self.build_from_packaged(search_path)
        } else {
            tracing::debug!(path = %search_path, "scanning search path for bundles");
            let bundles = scan_directory(search_path.as_std_path())?;
            if bundles.is_empty() {
                return Err(ArchiveError::NoBundlesFound {
                    search_path: search_path.to_owned(),
                });
            }
            self.pack(search_path.as_std_path(), &bundles)
        }
    }

    /// Extracts a zip archive into scratch space and packages the bundles it
    /// contains. The scratch directory is removed afterwards even when
    /// packaging fails; removal errors are suppressed.
    fn build_from_packaged(&self, search_path: &Utf8Path) -> Result<SymbolArchive, ArchiveError> {
        let scratch = tempfile::Builder::new()
            .prefix("symsend-extract-")
            .tempdir_in(&self.output_dir)
            .map_err(|err| ArchiveError::io(&self.output_dir, &err))?;

        let extract = |err: &dyn std::fmt::Display| ArchiveError::Extract {
            path: search_path.to_string(),
            message: err.to_string(),
        };
        let file = File::open(search_path.as_std_path()).map_err(|err| extract(&err))?;
        let mut packaged = zip::ZipArchive::new(file).map_err(|err| extract(&err))?;
        packaged.extract(scratch.path()).map_err(|err| extract(&err))?;

        let outcome = scan_directory(scratch.path()).and_then(|bundles| {
            if bundles.is_empty() {
                return Err(ArchiveError::NoBundlesFound {
                    search_path: search_path.to_owned(),
                });
            }
            self.pack(scratch.path(), &bundles)
        });
        scratch.close().ok();
        outcome
    }

    /// Writes the named bundles under `root` into a fresh `.tgz` file.
    fn pack(&self, root: &Path, bundles: &[String]) -> Result<SymbolArchive, ArchiveError> {
        let staged = tempfile::Builder::new()
            .prefix("symsend-")
            .suffix(".tgz")
            .tempfile_in(&self.output_dir)
            .map_err(|err| ArchiveError::io(&self.output_dir, &err))?;
        let (file, archive_path) = staged
            .keep()
            .map_err(|err| ArchiveError::io(&self.output_dir, &err))?;

        let mut writer = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for bundle in bundles {
            let bundle_path = root.join(bundle);
            tracing::debug!(bundle = %bundle, "adding bundle to archive");
            if bundle_path.is_dir() {
                writer
                    .append_dir_all(bundle, &bundle_path)
                    .map_err(|err| ArchiveError::io(&bundle_path, &err))?;
            } else {
                writer
                    .append_path_with_name(&bundle_path, bundle)
                    .map_err(|err| ArchiveError::io(&bundle_path, &err))?;
            }
        }
        let encoder = writer
            .into_inner()
            .map_err(|err| ArchiveError::io(&archive_path, &err))?;
        encoder
            .finish()
            .map_err(|err| ArchiveError::io(&archive_path, &err))?;

        let size_bytes = fs::metadata(&archive_path)
            .map_err(|err| ArchiveError::io(&archive_path, &err))?
            .len();
        let path = Utf8PathBuf::from_path_buf(archive_path).map_err(|lossy| ArchiveError::Io {
            path: lossy.display().to_string(),
            message: String::from("archive path is not valid UTF-8"),
        })?;

        Ok(SymbolArchive { path, size_bytes })
    }
}

/// Lists bundle names directly under `dir` (non-recursive), sorted for
/// deterministic archive ordering.
fn scan_directory(dir: &Path) -> Result<Vec<String>, ArchiveError> {
    let scan = |err: &dyn std::fmt::Display| ArchiveError::Scan {
        path: dir.display().to_string(),
        message: err.to_string(),
    };
    let mut bundles = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| scan(&err))? {
        let dir_entry = entry.map_err(|err| scan(&err))?;
        let file_name = dir_entry.file_name();
        if let Some(name) = file_name.to_str()
            && name.ends_with(BUNDLE_SUFFIX)
        {
            bundles.push(name.to_owned());
        }
    }
    bundles.sort();
    Ok(bundles)
}

#[cfg(test)]
mod tests;
