/*!
 * Advisory pre-flight checks.
 *
 * Neither check can fail a conversion on its own: when an estimate crosses
 * its threshold the user is asked whether to continue, and declining is a
 * normal cancellation.
 */

use log::{debug, warn};

use crate::app_config::{ConversionConfig, ConversionMode};

/// Yes/no confirmation capability
pub trait ConfirmPrompt {
    /// Ask the user; `true` means continue
    fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Prompt that always continues
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _title: &str, _message: &str) -> bool {
        true
    }
}

/// Prompt that always cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysDecline;

impl ConfirmPrompt for AlwaysDecline {
    fn confirm(&self, _title: &str, _message: &str) -> bool {
        false
    }
}

/// Source of the currently available system memory
pub trait MemoryProbe {
    /// Available bytes, `None` when unknown
    fn available_memory(&self) -> Option<u64>;
}

/// Reads `MemAvailable` from `/proc/meminfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl MemoryProbe for SystemMemory {
    fn available_memory(&self) -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo_available(&meminfo)
    }
}

/// Extract `MemAvailable` (reported in kB) as bytes
pub fn parse_meminfo_available(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

/// Working memory a conversion of `input_size` bytes is expected to need
pub fn estimate_required_memory(input_size: u64, mode: ConversionMode, config: &ConversionConfig) -> u64 {
    let multiplier = match mode {
        ConversionMode::SrtToXlsx => config.srt_memory_multiplier,
        ConversionMode::XlsxToSrt => config.xlsx_memory_multiplier,
    };
    input_size.saturating_mul(multiplier)
}

/// Compare the estimate against a share of available memory
///
/// Returns whether to continue. Unknown availability skips the check.
pub fn check_memory_availability(
    input_size: u64,
    mode: ConversionMode,
    config: &ConversionConfig,
    memory: &dyn MemoryProbe,
    prompt: &dyn ConfirmPrompt,
) -> bool {
    let required = estimate_required_memory(input_size, mode, config);
    let Some(available) = memory.available_memory() else {
        debug!("Available memory unknown, skipping memory check");
        return true;
    };

    let threshold = available as f64 * config.memory_threshold_ratio;
    if (required as f64) <= threshold {
        return true;
    }

    warn!(
        "Estimated memory {} bytes exceeds {:.0} bytes ({}% of available)",
        required,
        threshold,
        (config.memory_threshold_ratio * 100.0).round()
    );
    prompt.confirm(
        "Memory warning",
        "Memory may be insufficient for this conversion. Continue?",
    )
}

/// Rough subtitle count: a block usually spans four lines
///
/// Multi-line bodies make this overshoot, so it only ever drives a warning.
pub fn estimate_subtitle_count(bytes: &[u8]) -> usize {
    let text = String::from_utf8_lossy(bytes);
    text.lines().count() / 4
}

/// Warn about very large inputs; returns whether to continue
pub fn check_large_file_warning(
    subtitle_count: usize,
    config: &ConversionConfig,
    prompt: &dyn ConfirmPrompt,
) -> bool {
    if subtitle_count <= config.large_file_subtitle_threshold {
        return true;
    }

    warn!(
        "About {} subtitles, above the large-file threshold of {}",
        subtitle_count, config.large_file_subtitle_threshold
    );
    prompt.confirm(
        "Large file",
        "The file is large and may take a while to process. Continue?",
    )
}
