use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::errors::{ConversionError, Result};

// @module: File and directory utilities

// @const: Stale staging artifacts left by an interrupted run
static TEMP_FILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+\.tmp\..+$").unwrap());

/// Default bound on `_N` suffixes tried when deduplicating output names
pub const DEFAULT_MAX_FILENAME_ATTEMPTS: u32 = 999;

/// Filesystem operations used by the conversion pipeline
///
/// Conversions only touch the disk through this trait so tests can inject
/// failures at precise points.
pub trait FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn file_size(&self, path: &Path) -> io::Result<u64>;
}

/// `FileSystem` backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    /// Directory holding `path`, `.` for bare file names
    pub fn parent_dir<P: AsRef<Path>>(path: P) -> PathBuf {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Pick a free output path `<dir>/<base><ext>`, then `<base>_1<ext>`, `<base>_2<ext>`, ...
    ///
    /// `extension` includes the leading dot. Fails with `FilenameExhaustion`
    /// once `max_attempts` suffixes are taken.
    pub fn generate_output_filename(
        fs: &dyn FileSystem,
        base: &str,
        output_dir: &Path,
        extension: &str,
        max_attempts: u32,
    ) -> Result<PathBuf> {
        let candidate = output_dir.join(format!("{}{}", base, extension));
        if !fs.exists(&candidate) {
            return Ok(candidate);
        }

        for i in 1..=max_attempts {
            let candidate = output_dir.join(format!("{}_{}{}", base, i, extension));
            if !fs.exists(&candidate) {
                debug!("Output name taken, using {:?}", candidate);
                return Ok(candidate);
            }
        }

        Err(ConversionError::FilenameExhaustion {
            base: base.to_string(),
            attempts: max_attempts,
        })
    }

    /// Run stamp shared by every temp file of one conversion
    pub fn run_stamp() -> String {
        Local::now().format("%Y%m%d%H%M%S%3f").to_string()
    }

    /// Staging path `<final>.tmp.<stamp>` next to the final output
    pub fn temp_path_for(final_path: &Path, stamp: &str) -> PathBuf {
        let mut name = final_path.as_os_str().to_os_string();
        name.push(".tmp.");
        name.push(stamp);
        PathBuf::from(name)
    }

    /// Whether a file name looks like a staging artifact (`*.tmp.*`)
    pub fn is_temp_artifact(name: &str) -> bool {
        TEMP_FILE_REGEX.is_match(name)
    }

    /// Delete staging artifacts (`*.tmp.*`) directly inside `dir`
    ///
    /// Best effort: failures are logged and skipped. Returns the removed paths.
    pub fn purge_temp_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !Self::is_temp_artifact(&name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed.push(entry.path().to_path_buf()),
                Err(e) => warn!("Failed to remove stale temp file {:?}: {}", entry.path(), e),
            }
        }

        if !removed.is_empty() {
            debug!("Purged {} stale temp file(s)", removed.len());
        }
        removed
    }

    /// Remove a file if present, logging instead of failing
    pub fn remove_quietly(fs: &dyn FileSystem, path: &Path) {
        if !fs.exists(path) {
            return;
        }
        if let Err(e) = fs.remove_file(path) {
            warn!("Cleanup failed for {:?}: {}", path, e);
        }
    }
}
