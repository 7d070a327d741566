/*!
 * Conversion orchestrator.
 *
 * Two independent procedures share the commit protocol in `commit`:
 *
 * - `srt_to_xlsx`: many `<base>_<CODE>.srt` files in one folder become one
 *   `<base>.xlsx` next to them
 * - `xlsx_to_srt`: one spreadsheet becomes one `<stem>_<CODE>.srt` per
 *   non-empty language column, committed all-or-nothing
 *
 * Nothing is written before every input check has passed. A declined
 * pre-flight warning ends the run with `ConversionOutcome::Cancelled`.
 */

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app_config::{ConversionConfig, ConversionMode};
use crate::commit::CommitLog;
use crate::errors::{ConversionError, Result};
use crate::file_utils::{FileManager, FileSystem};
use crate::language_utils::{self, LanguageCode};
use crate::subtitle_processor::{self, SubtitlesByLanguage};
use crate::validation::preflight;
use crate::validation::{ConfirmPrompt, MemoryProbe, validate_same_directory, validate_timestamp_sync};
use crate::workbook;

/// UTF-8 byte order mark written at the start of every generated SRT
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of a conversion that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Every output was committed, in commit order
    Completed { outputs: Vec<PathBuf> },
    /// The user declined a pre-flight warning; nothing was written
    Cancelled,
}

impl ConversionOutcome {
    pub fn outputs(&self) -> &[PathBuf] {
        match self {
            Self::Completed { outputs } => outputs,
            Self::Cancelled => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Runs conversions against injected collaborators
pub struct Converter<'a> {
    fs: &'a dyn FileSystem,
    prompt: &'a dyn ConfirmPrompt,
    memory: &'a dyn MemoryProbe,
    settings: ConversionConfig,
}

impl<'a> Converter<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        prompt: &'a dyn ConfirmPrompt,
        memory: &'a dyn MemoryProbe,
        settings: ConversionConfig,
    ) -> Self {
        Self {
            fs,
            prompt,
            memory,
            settings,
        }
    }

    /// Merge per-language SRT files into one spreadsheet
    pub fn srt_to_xlsx(&self, paths: &[PathBuf]) -> Result<ConversionOutcome> {
        let Some(first) = paths.first() else {
            return Err(ConversionError::NoInput);
        };
        validate_same_directory(paths)?;

        // Pre-flight: total size against available memory
        let mut total_size = 0u64;
        for path in paths {
            let size = self
                .fs
                .file_size(path)
                .map_err(|e| ConversionError::from_io(path, e))?;
            total_size = total_size.saturating_add(size);
        }
        if !self.memory_ok(total_size, ConversionMode::SrtToXlsx) {
            info!("Conversion cancelled at memory warning");
            return Ok(ConversionOutcome::Cancelled);
        }

        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = self
                .fs
                .read(path)
                .map_err(|e| ConversionError::from_io(path, e))?;
            let estimate = preflight::estimate_subtitle_count(&bytes);
            if !preflight::check_large_file_warning(estimate, &self.settings, self.prompt) {
                info!("Conversion cancelled at large-file warning for {:?}", path);
                return Ok(ConversionOutcome::Cancelled);
            }
            contents.push(bytes);
        }

        // Per file: language code, then structure
        let mut collection = SubtitlesByLanguage::new();
        let mut sources: BTreeMap<LanguageCode, &Path> = BTreeMap::new();
        for (path, bytes) in paths.iter().zip(&contents) {
            let code = language_utils::extract_language_code(path)?;
            if let Some(previous) = sources.get(&code) {
                return Err(ConversionError::DuplicateLanguage {
                    code: code.to_string(),
                    paths: vec![previous.to_path_buf(), path.clone()],
                });
            }
            sources.insert(code, path);

            let subtitles =
                subtitle_processor::parse_bytes(bytes).map_err(|e| ConversionError::parse(path, e))?;
            debug!("Parsed {} subtitle(s) from {:?} as {}", subtitles.len(), path, code);
            collection.insert(code, subtitles);
        }

        validate_timestamp_sync(&collection)?;

        let sheet = workbook::generate(&collection)?;
        let bytes = sheet.to_bytes()?;

        let base = language_utils::strip_language_suffix(first);
        language_utils::validate_filename_characters(&base)?;
        let output_dir = FileManager::parent_dir(first);
        let output_path = FileManager::generate_output_filename(
            self.fs,
            &base,
            &output_dir,
            ".xlsx",
            self.settings.max_filename_attempts,
        )?;

        let mut log = CommitLog::new(self.fs, FileManager::run_stamp());
        log.stage(&output_path, &bytes)?;
        let outputs = log.commit()?;

        info!(
            "Wrote {} row(s) for {} language(s) to {:?}",
            sheet.rows().len(),
            collection.len(),
            output_path
        );
        Ok(ConversionOutcome::Completed { outputs })
    }

    /// Split a spreadsheet into one SRT per non-empty language
    pub fn xlsx_to_srt(&self, path: &Path) -> Result<ConversionOutcome> {
        let size = self
            .fs
            .file_size(path)
            .map_err(|e| ConversionError::from_io(path, e))?;
        if !self.memory_ok(size, ConversionMode::XlsxToSrt) {
            info!("Conversion cancelled at memory warning");
            return Ok(ConversionOutcome::Cancelled);
        }

        let bytes = self
            .fs
            .read(path)
            .map_err(|e| ConversionError::from_io(path, e))?;
        let sheet = workbook::SubtitleSheet::read_from(Cursor::new(bytes))?;

        if !preflight::check_large_file_warning(sheet.rows().len(), &self.settings, self.prompt) {
            info!("Conversion cancelled at large-file warning for {:?}", path);
            return Ok(ConversionOutcome::Cancelled);
        }

        let mut collection = sheet.into_languages();
        for code in workbook::empty_languages(&collection) {
            debug!("Skipping empty language column {}", code);
            collection.remove(&code);
        }
        if collection.is_empty() {
            return Err(ConversionError::NoConvertibleLanguages);
        }

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let output_dir = FileManager::parent_dir(path);

        // Names are all resolved before the first write
        let mut planned = Vec::with_capacity(collection.len());
        for (code, subtitles) in &collection {
            let base = format!("{}_{}", stem, code);
            language_utils::validate_filename_characters(&base)?;
            let output_path = FileManager::generate_output_filename(
                self.fs,
                &base,
                &output_dir,
                ".srt",
                self.settings.max_filename_attempts,
            )?;
            let mut contents = UTF8_BOM.to_vec();
            contents.extend_from_slice(subtitle_processor::generate_srt_content(subtitles).as_bytes());
            planned.push((output_path, contents));
        }

        let mut log = CommitLog::new(self.fs, FileManager::run_stamp());
        for (output_path, contents) in &planned {
            log.stage(output_path, contents)?;
        }
        let outputs = log.commit()?;

        info!("Wrote {} subtitle file(s) from {:?}", outputs.len(), path);
        Ok(ConversionOutcome::Completed { outputs })
    }

    fn memory_ok(&self, input_size: u64, mode: ConversionMode) -> bool {
        preflight::check_memory_availability(input_size, mode, &self.settings, self.memory, self.prompt)
    }
}
