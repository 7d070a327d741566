/*!
 * Two-phase commit of conversion outputs.
 *
 * Phase 1 (`stage`) writes each output to `<final>.tmp.<stamp>` in the target
 * folder. Phase 2 (`commit`) moves any file already at the final name aside
 * to `<final>.tmp.<stamp>.orig` and renames each temp file into place. A
 * failure in either phase deletes every temp file and every output already
 * finalized by this log, then moves displaced files back, leaving the folder
 * as it was before the conversion started.
 *
 * The log belongs to one conversion. Dropping it without a successful commit
 * rolls back.
 */

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::errors::{ConversionError, Result};
use crate::file_utils::{FileManager, FileSystem};

/// Output written to its staging path and waiting for phase 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub temp_path: PathBuf,
    pub final_path: PathBuf,
}

/// Transaction log of one multi-file write
pub struct CommitLog<'a> {
    fs: &'a dyn FileSystem,
    stamp: String,
    staged: Vec<StagedFile>,
    finalized: Vec<PathBuf>,
    // (aside path, original path) of files replaced during phase 2
    displaced: Vec<(PathBuf, PathBuf)>,
}

impl<'a> CommitLog<'a> {
    /// Start a log; `stamp` suffixes every temp file of this run
    pub fn new(fs: &'a dyn FileSystem, stamp: impl Into<String>) -> Self {
        Self {
            fs,
            stamp: stamp.into(),
            staged: Vec::new(),
            finalized: Vec::new(),
            displaced: Vec::new(),
        }
    }

    /// Staged files in staging order
    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Phase 1: write `contents` to the staging path of `final_path`
    ///
    /// On failure every temp file of this log, including a partial one, is
    /// removed before the error is returned.
    pub fn stage(&mut self, final_path: &Path, contents: &[u8]) -> Result<()> {
        let temp_path = FileManager::temp_path_for(final_path, &self.stamp);

        // Recorded first so a partial write is covered by rollback
        self.staged.push(StagedFile {
            temp_path: temp_path.clone(),
            final_path: final_path.to_path_buf(),
        });

        if let Err(e) = self.fs.write(&temp_path, contents) {
            warn!("Staging {:?} failed: {}", temp_path, e);
            self.rollback();
            return Err(ConversionError::from_io(final_path, e));
        }

        debug!("Staged {:?} ({} bytes)", temp_path, contents.len());
        Ok(())
    }

    /// Phase 2: move every staged file to its final name
    ///
    /// Returns the finalized paths in staging order.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);

        for (i, file) in staged.iter().enumerate() {
            if let Err(e) = self.finalize(file) {
                warn!("Finalizing {:?} failed, rolling back: {}", file.final_path, e);
                // Put back what still needs cleaning
                self.staged = staged[i..].to_vec();
                self.rollback();
                return Err(ConversionError::from_io(&file.final_path, e));
            }
            self.finalized.push(file.final_path.clone());
        }

        // Nothing should remain, sweep anyway
        for file in &staged {
            FileManager::remove_quietly(self.fs, &file.temp_path);
        }
        for (aside, _) in std::mem::take(&mut self.displaced) {
            FileManager::remove_quietly(self.fs, &aside);
        }

        Ok(std::mem::take(&mut self.finalized))
    }

    fn finalize(&mut self, file: &StagedFile) -> std::io::Result<()> {
        if self.fs.exists(&file.final_path) {
            let aside = FileManager::temp_path_for(&file.final_path, &format!("{}.orig", self.stamp));
            self.fs.rename(&file.final_path, &aside)?;
            self.displaced.push((aside, file.final_path.clone()));
        }
        self.fs.rename(&file.temp_path, &file.final_path)
    }

    /// Delete every temp file and every output finalized by this log, then
    /// restore the files they displaced
    ///
    /// Best effort: a cleanup failure is logged and never replaces the error
    /// being reported.
    pub fn rollback(&mut self) {
        for file in self.staged.drain(..) {
            FileManager::remove_quietly(self.fs, &file.temp_path);
        }
        for path in self.finalized.drain(..) {
            FileManager::remove_quietly(self.fs, &path);
        }
        for (aside, original) in self.displaced.drain(..).rev() {
            if let Err(e) = self.fs.rename(&aside, &original) {
                warn!("Could not restore {:?} from {:?}: {}", original, aside, e);
            }
        }
    }
}

impl Drop for CommitLog<'_> {
    // No-op after a successful commit or an explicit rollback
    fn drop(&mut self) {
        self.rollback();
    }
}
