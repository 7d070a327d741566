/*!
 * Tests for the two-phase commit of output files
 */

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use srtsheet::commit::CommitLog;
use srtsheet::errors::ErrorKind;
use srtsheet::file_utils::StdFileSystem;

use crate::common::{self, FailingFileSystem};

fn five_outputs(dir: &std::path::Path) -> Vec<PathBuf> {
    ["KO", "EN", "CT", "CS", "JA"]
        .iter()
        .map(|code| dir.join(format!("show_{}.srt", code)))
        .collect()
}

#[test]
fn test_commit_withAllFilesStaged_shouldFinalizeEveryOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let outputs = five_outputs(temp_dir.path());

    let mut log = CommitLog::new(&StdFileSystem, "1");
    for output in &outputs {
        log.stage(output, b"content")?;
    }
    assert_eq!(log.staged().len(), 5);
    assert!(log.staged()[0].temp_path.to_string_lossy().ends_with("show_KO.srt.tmp.1"));

    let finalized = log.commit()?;
    assert_eq!(finalized, outputs);
    assert_eq!(
        common::file_names(temp_dir.path())?,
        vec!["show_CS.srt", "show_CT.srt", "show_EN.srt", "show_JA.srt", "show_KO.srt"]
    );
    Ok(())
}

#[test]
fn test_commit_withExistingFinalFile_shouldReplaceIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = common::create_test_file(temp_dir.path(), "show.xlsx", "old")?;

    let mut log = CommitLog::new(&StdFileSystem, "1");
    log.stage(&output, b"new")?;
    log.commit()?;

    assert_eq!(std::fs::read(&output)?, b"new");
    assert_eq!(common::file_names(temp_dir.path())?, vec!["show.xlsx"]);
    Ok(())
}

#[test]
fn test_commit_withFailureAfterReplacingFile_shouldRestoreOriginal() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let existing = common::create_test_file(temp_dir.path(), "show_KO.srt", "original")?;
    let before = common::snapshot_dir(temp_dir.path())?;

    // Renames: move show_KO.srt aside, finalize it, then fail on show_EN.srt
    let fs = FailingFileSystem::failing_rename(3, io::ErrorKind::PermissionDenied);
    let mut log = CommitLog::new(&fs, "1");
    log.stage(&existing, b"replacement")?;
    log.stage(&temp_dir.path().join("show_EN.srt"), b"content")?;

    let err = log.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputLocked);
    assert_eq!(std::fs::read(&existing)?, b"original");
    assert_eq!(common::snapshot_dir(temp_dir.path())?, before);
    Ok(())
}

#[test]
fn test_commit_withRenameFailureAfterTwoOfFive_shouldLeaveDirectoryUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "show.xlsx", "source")?;
    let before = common::snapshot_dir(temp_dir.path())?;

    let fs = FailingFileSystem::failing_rename(3, io::ErrorKind::PermissionDenied);
    let mut log = CommitLog::new(&fs, "1");
    for output in five_outputs(temp_dir.path()) {
        log.stage(&output, b"content")?;
    }

    let err = log.commit().unwrap_err();
    assert_eq!(fs.renames(), 3);
    assert_eq!(err.kind(), ErrorKind::OutputLocked);
    assert_eq!(err.path(), Some(temp_dir.path().join("show_CT.srt").as_path()));
    assert_eq!(common::snapshot_dir(temp_dir.path())?, before);
    Ok(())
}

#[test]
fn test_commit_withStorageFullDuringRename_shouldReportInsufficientStorage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let fs = FailingFileSystem::failing_rename(1, io::ErrorKind::StorageFull);
    let mut log = CommitLog::new(&fs, "1");
    log.stage(&temp_dir.path().join("show_KO.srt"), b"content")?;

    let err = log.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStorage);
    assert_eq!(err.code(), 303);
    assert!(common::file_names(temp_dir.path())?.is_empty());
    Ok(())
}

#[test]
fn test_stage_withWriteFailure_shouldRemoveEveryTempFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let fs = FailingFileSystem::failing_write(3, io::ErrorKind::StorageFull);
    let mut log = CommitLog::new(&fs, "1");
    let outputs = five_outputs(temp_dir.path());
    log.stage(&outputs[0], b"content")?;
    log.stage(&outputs[1], b"content")?;

    let err = log.stage(&outputs[2], b"content").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStorage);
    assert!(log.staged().is_empty());
    assert!(common::file_names(temp_dir.path())?.is_empty());
    Ok(())
}

#[test]
fn test_drop_withoutCommit_shouldRollBack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    {
        let mut log = CommitLog::new(&StdFileSystem, "1");
        log.stage(&temp_dir.path().join("show_KO.srt"), b"content")?;
        assert_eq!(common::file_names(temp_dir.path())?.len(), 1);
    }
    assert!(common::file_names(temp_dir.path())?.is_empty());
    Ok(())
}
