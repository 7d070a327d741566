use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::file_utils::DEFAULT_MAX_FILENAME_ATTEMPTS;

// @module: Application configuration, loaded from and saved to a JSON file

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Conversion thresholds and limits
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Direction used by the last successful run
    #[serde(default)]
    pub last_mode: ConversionMode,

    /// Folder of the last successful run
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
}

/// Conversion direction
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    // @mode: Many SRT files into one spreadsheet
    #[default]
    SrtToXlsx,
    // @mode: One spreadsheet into one SRT per language
    XlsxToSrt,
}

impl ConversionMode {
    // @returns: Arrow label shown to users
    pub fn display_name(&self) -> &str {
        match self {
            Self::SrtToXlsx => "SRT → XLSX",
            Self::XlsxToSrt => "XLSX → SRT",
        }
    }
}

impl std::fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SrtToXlsx => write!(f, "srt_to_xlsx"),
            Self::XlsxToSrt => write!(f, "xlsx_to_srt"),
        }
    }
}

impl std::str::FromStr for ConversionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt_to_xlsx" => Ok(Self::SrtToXlsx),
            "xlsx_to_srt" => Ok(Self::XlsxToSrt),
            _ => Err(anyhow!("Invalid conversion mode: {}", s)),
        }
    }
}

/// Limits used by pre-flight checks and output naming
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversionConfig {
    // @field: Memory estimate multiplier for SRT → XLSX
    #[serde(default = "default_srt_memory_multiplier")]
    pub srt_memory_multiplier: u64,

    // @field: Memory estimate multiplier for XLSX → SRT
    #[serde(default = "default_xlsx_memory_multiplier")]
    pub xlsx_memory_multiplier: u64,

    // @field: Share of available memory an estimate may use before warning
    #[serde(default = "default_memory_threshold_ratio")]
    pub memory_threshold_ratio: f64,

    // @field: Estimated subtitle count that triggers the large-file warning
    #[serde(default = "default_large_file_subtitle_threshold")]
    pub large_file_subtitle_threshold: usize,

    // @field: Bound on `_N` suffixes when an output name is taken
    #[serde(default = "default_max_filename_attempts")]
    pub max_filename_attempts: u32,

    // @field: Delete stale `*.tmp.*` files in the working folder before converting
    #[serde(default = "default_true")]
    pub purge_temp_files: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            srt_memory_multiplier: default_srt_memory_multiplier(),
            xlsx_memory_multiplier: default_xlsx_memory_multiplier(),
            memory_threshold_ratio: default_memory_threshold_ratio(),
            large_file_subtitle_threshold: default_large_file_subtitle_threshold(),
            max_filename_attempts: default_max_filename_attempts(),
            purge_temp_files: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_srt_memory_multiplier() -> u64 {
    5 // parsing plus sheet construction
}

fn default_xlsx_memory_multiplier() -> u64 {
    3
}

fn default_memory_threshold_ratio() -> f64 {
    0.7
}

fn default_large_file_subtitle_threshold() -> usize {
    10_000
}

fn default_max_filename_attempts() -> u32 {
    DEFAULT_MAX_FILENAME_ATTEMPTS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let conversion = &self.conversion;

        if !(conversion.memory_threshold_ratio > 0.0 && conversion.memory_threshold_ratio <= 1.0) {
            return Err(anyhow!(
                "memory_threshold_ratio must be in (0, 1], got {}",
                conversion.memory_threshold_ratio
            ));
        }

        if conversion.srt_memory_multiplier == 0 || conversion.xlsx_memory_multiplier == 0 {
            return Err(anyhow!("Memory multipliers must be at least 1"));
        }

        if conversion.max_filename_attempts == 0 {
            return Err(anyhow!("max_filename_attempts must be at least 1"));
        }

        Ok(())
    }

    /// Load the configuration file, writing a default one when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Remember the direction and folder of a successful run
    pub fn remember_run(&mut self, mode: ConversionMode, directory: PathBuf) {
        self.last_mode = mode;
        self.last_directory = Some(directory);
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            conversion: ConversionConfig::default(),
            last_mode: ConversionMode::default(),
            last_directory: None,
        }
    }
}
