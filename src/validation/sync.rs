/*!
 * Cross-file validation.
 *
 * Synchronization is only meaningful once every file parsed on its own, so
 * `validate_timestamp_sync` expects a collection built from successful parses.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{ConversionError, Result};
use crate::file_utils::{FileManager, FileSystem};
use crate::language_utils::{self, LanguageCode};
use crate::subtitle_processor::{self, SubtitlesByLanguage};

use super::report::ValidationReport;

/// Fail when the inputs do not all share one parent directory
pub fn validate_same_directory<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    let directories: BTreeSet<PathBuf> = paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            FileManager::parent_dir(absolute)
        })
        .collect();

    if directories.len() > 1 {
        return Err(ConversionError::DirectoryMismatch {
            directories: directories.into_iter().collect(),
        });
    }
    Ok(())
}

/// Check every language has the same count and identical timing pairs
///
/// The first language in canonical order is the reference. The reported
/// position is 1-based.
pub fn validate_timestamp_sync(collection: &SubtitlesByLanguage) -> Result<()> {
    let Some((_, reference)) = collection.iter().next() else {
        return Ok(());
    };

    if collection.values().any(|subs| subs.len() != reference.len()) {
        return Err(ConversionError::CountMismatch {
            counts: collection
                .iter()
                .map(|(code, subs)| (code.to_string(), subs.len()))
                .collect(),
        });
    }

    for (index, expected) in reference.iter().enumerate() {
        let in_sync = collection
            .values()
            .all(|subs| subs[index].timing() == expected.timing());
        if !in_sync {
            return Err(ConversionError::TimestampSync {
                position: index + 1,
                timings: collection
                    .iter()
                    .map(|(code, subs)| {
                        let (start, end) = subs[index].timing();
                        (code.to_string(), start.to_string(), end.to_string())
                    })
                    .collect(),
            });
        }
    }

    debug!(
        "{} language(s) in sync over {} subtitle(s)",
        collection.len(),
        reference.len()
    );
    Ok(())
}

/// Run every input check and collect all problems instead of stopping at the first
///
/// Per-file problems (language code, encoding, structure) are reported for each
/// file. Synchronization is only checked when all files parsed cleanly.
pub fn validate_files(fs: &dyn FileSystem, paths: &[PathBuf]) -> ValidationReport {
    let mut report = ValidationReport::new();

    if paths.is_empty() {
        report.add_error(&ConversionError::NoInput, None);
        return report;
    }
    if let Err(e) = validate_same_directory(paths) {
        report.add_error(&e, None);
    }

    let mut collection = SubtitlesByLanguage::new();
    let mut seen: BTreeMap<LanguageCode, PathBuf> = BTreeMap::new();
    let mut all_parsed = true;

    for path in paths {
        report.add_checked_file(path);

        let code = match language_utils::extract_language_code(path) {
            Ok(code) => code,
            Err(e) => {
                report.add_error(&e, Some(path));
                all_parsed = false;
                continue;
            }
        };
        if let Some(previous) = seen.get(&code) {
            let e = ConversionError::DuplicateLanguage {
                code: code.to_string(),
                paths: vec![previous.clone(), path.clone()],
            };
            report.add_error(&e, Some(path));
            all_parsed = false;
            continue;
        }
        seen.insert(code, path.clone());

        let parsed = fs
            .read(path)
            .map_err(|e| ConversionError::from_io(path, e))
            .and_then(|bytes| {
                subtitle_processor::parse_bytes(&bytes).map_err(|e| ConversionError::parse(path, e))
            });
        match parsed {
            Ok(subtitles) => {
                collection.insert(code, subtitles);
            }
            Err(e) => {
                report.add_error(&e, Some(path));
                all_parsed = false;
            }
        }
    }

    if all_parsed {
        if let Err(e) = validate_timestamp_sync(&collection) {
            report.add_error(&e, None);
        }
    }

    report
}
