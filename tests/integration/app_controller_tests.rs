/*!
 * Integration tests for the application controller
 */

use anyhow::Result;
use srtsheet::app_config::Config;
use srtsheet::app_controller::Controller;
use srtsheet::errors::{ConversionError, ErrorKind};
use srtsheet::validation::{AlwaysConfirm, AlwaysDecline};

use crate::common;

fn controller(config: Config) -> Result<Controller> {
    common::init_test_logging();
    Ok(Controller::with_config(config)?.with_memory_probe(Box::new(common::plenty_of_memory())))
}

#[test]
fn test_controller_withInvalidConfig_shouldRefuseToStart() {
    let mut config = Config::default();
    config.conversion.memory_threshold_ratio = 2.0;
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_run_srt_to_xlsx_withStaleTempFiles_shouldPurgeBeforeConverting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let inputs = common::create_language_set(dir, "show", &["KO", "EN"], 2)?;
    common::create_test_file(dir, "show.xlsx.tmp.20250101000000000", "stale")?;

    let outcome = controller(Config::default())?.run_srt_to_xlsx(&inputs, &AlwaysDecline)?;
    assert_eq!(outcome.outputs(), &[dir.join("show.xlsx")]);
    assert_eq!(common::file_names(dir)?, vec!["show.xlsx", "show_EN.srt", "show_KO.srt"]);
    Ok(())
}

#[test]
fn test_run_srt_to_xlsx_withPurgeDisabled_shouldKeepTempFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let inputs = common::create_language_set(dir, "show", &["KO"], 2)?;
    common::create_test_file(dir, "old.srt.tmp.1", "stale")?;

    let mut config = Config::default();
    config.conversion.purge_temp_files = false;
    controller(config)?.run_srt_to_xlsx(&inputs, &AlwaysConfirm)?;

    assert!(dir.join("old.srt.tmp.1").exists());
    Ok(())
}

#[test]
fn test_run_xlsx_to_srt_withMissingFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = temp_dir.path().join("missing.xlsx");
    assert!(controller(Config::default())?.run_xlsx_to_srt(&missing, &AlwaysConfirm).is_err());
    Ok(())
}

#[test]
fn test_run_srt_to_xlsx_withInvalidInput_shouldExposeConversionError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let ko = common::create_test_file(temp_dir.path(), "show_KO.srt", "1\n00:00:01,000 --> 00:00:02,000\nA\n")?;
    let en = common::create_test_file(temp_dir.path(), "show_EN.srt", &common::sample_srt("EN", 2))?;

    let err = controller(Config::default())?
        .run_srt_to_xlsx(&[ko, en], &AlwaysConfirm)
        .unwrap_err();
    let conversion = err
        .downcast_ref::<ConversionError>()
        .expect("controller keeps the conversion error");
    assert_eq!(conversion.kind(), ErrorKind::CountMismatch);
    Ok(())
}

#[test]
fn test_check_withBrokenFile_shouldReturnReportWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let ko = common::create_test_file(dir, "show_KO.srt", "0\n00:00:01,000 --> 00:00:02,000\nA\n")?;
    let before = common::snapshot_dir(dir)?;

    let report = controller(Config::default())?.check(&[ko]);
    assert!(!report.is_valid());
    assert_eq!(report.issues[0].kind, ErrorKind::ZeroIndexViolation);
    assert_eq!(common::snapshot_dir(dir)?, before);
    Ok(())
}

#[test]
fn test_purge_withMissingDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = controller(Config::default())?;

    assert!(controller.purge(&temp_dir.path().join("nope")).is_err());

    common::create_test_file(temp_dir.path(), "a.xlsx.tmp.1", "")?;
    assert_eq!(controller.purge(temp_dir.path())?.len(), 1);
    Ok(())
}
