/*!
 * Common test utilities for the srtsheet test suite
 */

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use srtsheet::file_utils::{FileSystem, StdFileSystem};
use srtsheet::subtitle_processor::format_timestamp;
use srtsheet::validation::MemoryProbe;

/// Route library logs to the test harness; `RUST_LOG=debug` shows them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a test file with raw bytes
pub fn create_test_bytes(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// SRT text with `count` one-second subtitles, each prefixed by `label`
pub fn sample_srt(label: &str, count: u64) -> String {
    let mut content = String::new();
    for i in 1..=count {
        content.push_str(&format!(
            "{}\n{} --> {}\n{} line {}\n\n",
            i,
            format_timestamp(i * 1000),
            format_timestamp(i * 1000 + 500),
            label,
            i
        ));
    }
    content
}

/// Writes `<base>_<CODE>.srt` for each code with `count` synchronized subtitles
pub fn create_language_set(dir: &Path, base: &str, codes: &[&str], count: u64) -> Result<Vec<PathBuf>> {
    codes
        .iter()
        .map(|code| create_test_file(dir, &format!("{}_{}.srt", base, code), &sample_srt(code, count)))
        .collect()
}

/// Every file in `dir` with its contents, for before/after comparisons
pub fn snapshot_dir(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut snapshot = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            snapshot.insert(
                entry.file_name().to_string_lossy().to_string(),
                fs::read(entry.path())?,
            );
        }
    }
    Ok(snapshot)
}

/// Names of the files in `dir`, sorted
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    Ok(snapshot_dir(dir)?.into_keys().collect())
}

/// Real filesystem that fails the Nth write or rename (1-based)
pub struct FailingFileSystem {
    fail_write_at: Option<u32>,
    fail_rename_at: Option<u32>,
    error_kind: io::ErrorKind,
    writes: Cell<u32>,
    renames: Cell<u32>,
}

impl FailingFileSystem {
    pub fn failing_write(at: u32, error_kind: io::ErrorKind) -> Self {
        Self {
            fail_write_at: Some(at),
            fail_rename_at: None,
            error_kind,
            writes: Cell::new(0),
            renames: Cell::new(0),
        }
    }

    pub fn failing_rename(at: u32, error_kind: io::ErrorKind) -> Self {
        Self {
            fail_write_at: None,
            fail_rename_at: Some(at),
            error_kind,
            writes: Cell::new(0),
            renames: Cell::new(0),
        }
    }

    pub fn renames(&self) -> u32 {
        self.renames.get()
    }
}

impl FileSystem for FailingFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        StdFileSystem.read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let n = self.writes.get() + 1;
        self.writes.set(n);
        if self.fail_write_at == Some(n) {
            // Leave a partial file behind, like an interrupted write
            let half = &contents[..contents.len() / 2];
            StdFileSystem.write(path, half)?;
            return Err(io::Error::new(self.error_kind, "injected write failure"));
        }
        StdFileSystem.write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let n = self.renames.get() + 1;
        self.renames.set(n);
        if self.fail_rename_at == Some(n) {
            return Err(io::Error::new(self.error_kind, "injected rename failure"));
        }
        StdFileSystem.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        StdFileSystem.exists(path)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        StdFileSystem.file_size(path)
    }
}

/// Memory probe reporting a fixed amount
pub struct FixedMemory(pub Option<u64>);

impl MemoryProbe for FixedMemory {
    fn available_memory(&self) -> Option<u64> {
        self.0
    }
}

/// Plenty of memory, so only the large-file check can prompt
pub fn plenty_of_memory() -> FixedMemory {
    FixedMemory(Some(u64::MAX / 2))
}
