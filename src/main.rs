// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use srtsheet::app_config::{self, Config, ConversionMode};
use srtsheet::app_controller::Controller;
use srtsheet::converter::ConversionOutcome;
use srtsheet::file_utils::FileManager;
use srtsheet::validation::{AlwaysConfirm, ConfirmPrompt};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge <base>_<CODE>.srt files from one folder into <base>.xlsx
    #[command(name = "srt2xlsx")]
    SrtToXlsx {
        /// Subtitle files, one per language
        #[arg(value_name = "SRT_FILES", required = true)]
        files: Vec<PathBuf>,
    },

    /// Split a spreadsheet into one <stem>_<CODE>.srt per non-empty language
    #[command(name = "xlsx2srt")]
    XlsxToSrt {
        /// Spreadsheet to split
        #[arg(value_name = "XLSX_FILE")]
        file: PathBuf,
    },

    /// Validate subtitle files and report every problem without writing anything
    Check {
        /// Subtitle files, one per language
        #[arg(value_name = "SRT_FILES")]
        files: Vec<PathBuf>,
    },

    /// Delete stale *.tmp.* files left by an interrupted conversion
    Purge {
        /// Folder to clean
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Generate shell completions for srtsheet
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// srtsheet - multi-language subtitle sheets
///
/// Converts synchronized per-language SRT files into one spreadsheet and back.
#[derive(Parser, Debug)]
#[command(name = "srtsheet")]
#[command(version)]
#[command(about = "Convert multi-language SRT subtitles to and from XLSX")]
#[command(long_about = "srtsheet merges synchronized subtitle files named <base>_<CODE>.srt into a
single spreadsheet with one column per language, and splits such a spreadsheet back
into subtitle files. Supported codes: KO, EN, CT, CS, JA, TH, ES-LATAM, PT-BR, RU.

EXAMPLES:
    srtsheet srt2xlsx show_KO.srt show_EN.srt   # Creates show.xlsx
    srtsheet xlsx2srt show.xlsx                 # Creates show_KO.srt, show_EN.srt, ...
    srtsheet check show_*.srt                   # Lists every problem found
    srtsheet --yes xlsx2srt big.xlsx            # Skip size and memory prompts
    srtsheet completions bash > srtsheet.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in srtsheet.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "srtsheet.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Answer yes to memory and large-file warnings
    #[arg(short, long, global = true)]
    yes: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Yes/no prompt on the terminal, default no
struct TerminalPrompt;

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, title: &str, message: &str) -> bool {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{}: {} [y/N] ", title, message);
        let _ = stderr.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn main() -> Result<()> {
    // Logger starts at info, the configured level is applied once loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "srtsheet", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config.clone())?;
    let prompt: Box<dyn ConfirmPrompt> = if cli.yes {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(TerminalPrompt)
    };

    match cli.command {
        Commands::SrtToXlsx { files } => {
            let outcome = controller.run_srt_to_xlsx(&files, prompt.as_ref())?;
            if let Some(first) = files.first() {
                remember_run(&mut config, &cli.config_path, ConversionMode::SrtToXlsx, first, &outcome);
            }
        }
        Commands::XlsxToSrt { file } => {
            let outcome = controller.run_xlsx_to_srt(&file, prompt.as_ref())?;
            remember_run(&mut config, &cli.config_path, ConversionMode::XlsxToSrt, &file, &outcome);
        }
        Commands::Check { files } => {
            let report = controller.check(&files);
            if !report.is_valid() {
                error!("{} problem(s) found", report.issues.len());
                std::process::exit(1);
            }
        }
        Commands::Purge { dir } => {
            controller.purge(&dir)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

// Persist the last direction and folder; failures only logged
fn remember_run(config: &mut Config, config_path: &str, mode: ConversionMode, input: &Path, outcome: &ConversionOutcome) {
    if outcome.is_cancelled() {
        return;
    }
    let absolute = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
    config.remember_run(mode, FileManager::parent_dir(absolute));
    if let Err(e) = config.save(config_path) {
        warn!("Could not save last run to {}: {:#}", config_path, e);
    } else {
        info!("Done ({})", mode.display_name());
    }
}
