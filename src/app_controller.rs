use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app_config::{Config, ConversionMode};
use crate::converter::{ConversionOutcome, Converter};
use crate::errors::{ConversionError, ErrorKind};
use crate::file_utils::{FileManager, FileSystem, StdFileSystem};
use crate::validation::{self, ConfirmPrompt, MemoryProbe, SystemMemory, ValidationReport};

// @module: Application controller for subtitle conversion

/// Main application controller: drives one conversion per call
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Disk access used by conversions and checks
    fs: Box<dyn FileSystem>,

    // @field: Available memory source for the pre-flight check
    memory: Box<dyn MemoryProbe>,
}

impl Controller {
    /// Create a controller with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fs: Box::new(StdFileSystem),
            memory: Box::new(SystemMemory),
        })
    }

    /// Replace the filesystem collaborator
    pub fn with_file_system(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the memory probe
    pub fn with_memory_probe(mut self, memory: Box<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Merge `<base>_<CODE>.srt` files into one spreadsheet
    pub fn run_srt_to_xlsx(&self, paths: &[PathBuf], prompt: &dyn ConfirmPrompt) -> Result<ConversionOutcome> {
        let start_time = Instant::now();
        if let Some(first) = paths.first() {
            self.purge_before_convert(&FileManager::parent_dir(first));
        }
        info!("Converting {} subtitle file(s) to a spreadsheet", paths.len());

        let converter = self.converter(prompt);
        let outcome = converter
            .srt_to_xlsx(paths)
            .map_err(|e| self.report_failure(ConversionMode::SrtToXlsx, e))?;
        self.report_outcome(&outcome, start_time);
        Ok(outcome)
    }

    /// Split a spreadsheet into one SRT per non-empty language
    pub fn run_xlsx_to_srt(&self, path: &Path, prompt: &dyn ConfirmPrompt) -> Result<ConversionOutcome> {
        let start_time = Instant::now();
        if !FileManager::file_exists(path) {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }
        self.purge_before_convert(&FileManager::parent_dir(path));
        info!("Converting spreadsheet {:?} to subtitle files", path);

        let converter = self.converter(prompt);
        let outcome = converter
            .xlsx_to_srt(path)
            .map_err(|e| self.report_failure(ConversionMode::XlsxToSrt, e))?;
        self.report_outcome(&outcome, start_time);
        Ok(outcome)
    }

    /// Validate SRT inputs without writing anything
    pub fn check(&self, paths: &[PathBuf]) -> ValidationReport {
        let report = validation::validate_files(self.fs.as_ref(), paths);
        if report.is_valid() {
            info!("{}", report.render());
        } else {
            warn!("Validation found problems:\n{}", report.render());
        }
        report
    }

    /// Delete stale temp files left in `dir` by an interrupted run
    pub fn purge(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !FileManager::dir_exists(dir) {
            return Err(anyhow!("Directory does not exist: {:?}", dir));
        }
        let removed = FileManager::purge_temp_files(dir);
        info!("Removed {} stale temp file(s) from {:?}", removed.len(), dir);
        Ok(removed)
    }

    fn converter<'a>(&'a self, prompt: &'a dyn ConfirmPrompt) -> Converter<'a> {
        Converter::new(
            self.fs.as_ref(),
            prompt,
            self.memory.as_ref(),
            self.config.conversion.clone(),
        )
    }

    fn purge_before_convert(&self, dir: &Path) {
        if !self.config.conversion.purge_temp_files {
            return;
        }
        let removed = FileManager::purge_temp_files(dir);
        if !removed.is_empty() {
            info!("Removed {} stale temp file(s) before converting", removed.len());
        }
    }

    // Log the grouped report for a failed run and hand the error back
    fn report_failure(&self, mode: ConversionMode, e: ConversionError) -> anyhow::Error {
        let report = ValidationReport::from_error(&e);
        error!("{} failed:\n{}", mode.display_name(), report.render());
        if e.kind() == ErrorKind::OutputLocked {
            warn!("Close the file in any program that has it open, then try again");
        }
        anyhow::Error::new(e)
    }

    fn report_outcome(&self, outcome: &ConversionOutcome, start_time: Instant) {
        match outcome {
            ConversionOutcome::Completed { outputs } => {
                for output in outputs {
                    info!("Created {:?}", output);
                }
                info!("Conversion completed in {}", Self::format_duration(start_time.elapsed()));
            }
            ConversionOutcome::Cancelled => {
                debug!("Nothing written");
                info!("Conversion cancelled");
            }
        }
    }

    /// Format a duration in a human-readable form
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
