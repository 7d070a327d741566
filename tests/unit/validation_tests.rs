/*!
 * Tests for cross-file validation, reports and pre-flight checks
 */

use std::path::PathBuf;

use anyhow::Result;
use srtsheet::app_config::{ConversionConfig, ConversionMode};
use srtsheet::errors::{ConversionError, ErrorKind};
use srtsheet::file_utils::StdFileSystem;
use srtsheet::language_utils::LanguageCode;
use srtsheet::subtitle_processor::{Subtitle, SubtitlesByLanguage};
use srtsheet::validation::preflight::{
    check_large_file_warning, check_memory_availability, estimate_required_memory,
};
use srtsheet::validation::{
    AlwaysConfirm, AlwaysDecline, IssueGroup, ValidationReport, validate_files,
    validate_same_directory, validate_timestamp_sync,
};

use crate::common::{self, FixedMemory};

fn subtitles(timings: &[(&str, &str)]) -> Vec<Subtitle> {
    timings
        .iter()
        .enumerate()
        .map(|(i, (start, end))| Subtitle::new(i as u64 + 1, *start, *end, format!("line {}", i + 1)))
        .collect()
}

#[test]
fn test_validate_same_directory_withOneFolder_shouldPass() -> Result<()> {
    validate_same_directory(&["/data/a_KO.srt", "/data/a_EN.srt"])?;
    Ok(())
}

#[test]
fn test_validate_same_directory_withTwoFolders_shouldFail() {
    let err = validate_same_directory(&["/data/a_KO.srt", "/other/a_EN.srt"]).unwrap_err();
    match err {
        ConversionError::DirectoryMismatch { directories } => assert_eq!(directories.len(), 2),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_validate_timestamp_sync_withDifferentCounts_shouldFailWithCountMismatch() {
    let mut collection = SubtitlesByLanguage::new();
    collection.insert(LanguageCode::Ko, subtitles(&[("00:00:01,000", "00:00:02,000")]));
    collection.insert(
        LanguageCode::En,
        subtitles(&[("00:00:01,000", "00:00:02,000"), ("00:00:03,000", "00:00:04,000")]),
    );

    let err = validate_timestamp_sync(&collection).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CountMismatch);
    assert_eq!(err.code(), 108);
    match err {
        ConversionError::CountMismatch { counts } => {
            assert_eq!(counts, vec![("KO".to_string(), 1), ("EN".to_string(), 2)]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_validate_timestamp_sync_withMismatchAtThird_shouldReportPositionThree() {
    let reference = [
        ("00:00:01,000", "00:00:02,000"),
        ("00:00:03,000", "00:00:04,000"),
        ("00:00:05,000", "00:00:06,000"),
    ];
    let shifted = [
        ("00:00:01,000", "00:00:02,000"),
        ("00:00:03,000", "00:00:04,000"),
        ("00:00:05,100", "00:00:06,000"),
    ];
    let mut collection = SubtitlesByLanguage::new();
    collection.insert(LanguageCode::Ko, subtitles(&reference));
    collection.insert(LanguageCode::En, subtitles(&reference));
    collection.insert(LanguageCode::Ja, subtitles(&shifted));

    let err = validate_timestamp_sync(&collection).unwrap_err();
    assert_eq!(err.code(), 103);
    match err {
        ConversionError::TimestampSync { position, timings } => {
            assert_eq!(position, 3);
            assert_eq!(timings.len(), 3);
            assert_eq!(timings[2].0, "JA");
            assert_eq!(timings[2].1, "00:00:05,100");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_validate_files_withValidSet_shouldReturnCleanReport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let paths = common::create_language_set(temp_dir.path(), "show", &["KO", "EN", "JA"], 4)?;

    let report = validate_files(&StdFileSystem, &paths);
    assert!(report.is_valid());
    assert_eq!(report.checked_files.len(), 3);
    assert_eq!(report.render(), "No problems found in 3 file(s)\n");
    Ok(())
}

#[test]
fn test_validate_files_withSeveralBrokenFiles_shouldCollectEveryProblem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let ko = common::create_test_file(dir, "show_KO.srt", &common::sample_srt("KO", 2))?;
    let en = common::create_test_file(
        dir,
        "show_EN.srt",
        "1\n00:00:01,000 --> 00:00:01,500\nA\n\n3\n00:00:03,000 --> 00:00:03,500\nB\n",
    )?;
    let fr = common::create_test_file(dir, "show_FR.srt", &common::sample_srt("FR", 2))?;

    let report = validate_files(&StdFileSystem, &[ko, en.clone(), fr.clone()]);
    assert!(!report.is_valid());
    assert_eq!(report.issues.len(), 2);

    let groups = report.group_by_file();
    let en_issues = &groups[&IssueGroup::File(en)];
    assert_eq!(en_issues[0].code, 101);
    assert_eq!(en_issues[0].subtitle, Some(2));
    assert_eq!(en_issues[0].line, Some(5));
    assert_eq!(en_issues[0].format_location().as_deref(), Some("line 5, subtitle #2"));
    assert_eq!(groups[&IssueGroup::File(fr)][0].code, 204);

    // No sync check once a file failed
    assert!(!groups.contains_key(&IssueGroup::CrossFile));

    let rendered = report.render();
    assert!(rendered.contains("=== File: show_EN.srt ==="));
    assert!(rendered.contains("=== File: show_FR.srt ==="));
    assert!(rendered.contains("[101]"));
    assert!(rendered.ends_with("2 error(s) in 2 group(s)\n"));
    Ok(())
}

#[test]
fn test_validate_files_withUnsyncedFiles_shouldReportCrossFileGroup() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let ko = common::create_test_file(dir, "show_KO.srt", &common::sample_srt("KO", 3))?;
    let en = common::create_test_file(dir, "show_EN.srt", &common::sample_srt("EN", 2))?;

    let report = validate_files(&StdFileSystem, &[ko, en]);
    let groups = report.group_by_file();
    assert_eq!(groups[&IssueGroup::CrossFile][0].kind, ErrorKind::CountMismatch);
    assert!(report.render().contains("=== Cross-file validation ==="));
    Ok(())
}

#[test]
fn test_validate_files_withSameLanguageTwice_shouldReportDuplicateLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let first = common::create_test_file(dir, "show_KO.srt", &common::sample_srt("KO", 2))?;
    let second = common::create_test_file(dir, "other_ko.srt", &common::sample_srt("KO", 2))?;

    let report = validate_files(&StdFileSystem, &[first, second]);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, ErrorKind::DuplicateLanguage);
    assert_eq!(report.issues[0].code, 211);
    Ok(())
}

#[test]
fn test_validate_files_withNoPaths_shouldReportNoInput() {
    let report = validate_files(&StdFileSystem, &Vec::<PathBuf>::new());
    assert_eq!(report.issues[0].kind, ErrorKind::NoInput);
}

#[test]
fn test_validation_report_fromError_withWorkbookRow_shouldUseRowAsLine() {
    let err = ConversionError::InvalidWorkbook {
        message: "row 7: bad".to_string(),
        row: Some(7),
    };
    let report = ValidationReport::from_error(&err);
    assert_eq!(report.issues[0].line, Some(7));
    assert_eq!(report.issues[0].message, "Invalid spreadsheet: row 7: bad");
}

#[test]
fn test_memory_check_withEnoughMemory_shouldContinueWithoutPrompt() {
    let config = ConversionConfig::default();
    let memory = FixedMemory(Some(1_000_000));
    assert!(check_memory_availability(1_000, ConversionMode::SrtToXlsx, &config, &memory, &AlwaysDecline));
}

#[test]
fn test_memory_check_withTooLittleMemory_shouldAskPrompt() {
    let config = ConversionConfig::default();
    let memory = FixedMemory(Some(10_000));
    // 5 x 2000 = 10000 > 0.7 x 10000
    assert!(!check_memory_availability(2_000, ConversionMode::SrtToXlsx, &config, &memory, &AlwaysDecline));
    assert!(check_memory_availability(2_000, ConversionMode::SrtToXlsx, &config, &memory, &AlwaysConfirm));
    // 3 x 2000 = 6000 <= 7000
    assert!(check_memory_availability(2_000, ConversionMode::XlsxToSrt, &config, &memory, &AlwaysDecline));
}

#[test]
fn test_memory_check_withUnknownMemory_shouldContinue() {
    let config = ConversionConfig::default();
    assert!(check_memory_availability(u64::MAX, ConversionMode::SrtToXlsx, &config, &FixedMemory(None), &AlwaysDecline));
}

#[test]
fn test_estimate_required_memory_withSrtInput_shouldUseLargerMultiplier() {
    let config = ConversionConfig::default();
    assert_eq!(estimate_required_memory(100, ConversionMode::SrtToXlsx, &config), 500);
    assert_eq!(estimate_required_memory(100, ConversionMode::XlsxToSrt, &config), 300);
}

#[test]
fn test_large_file_warning_withCountAboveThreshold_shouldAskPrompt() {
    let config = ConversionConfig {
        large_file_subtitle_threshold: 10,
        ..ConversionConfig::default()
    };
    assert!(check_large_file_warning(10, &config, &AlwaysDecline));
    assert!(!check_large_file_warning(11, &config, &AlwaysDecline));
    assert!(check_large_file_warning(11, &config, &AlwaysConfirm));
}
