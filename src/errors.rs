/*!
 * Error types for the srtsheet library.
 *
 * Structural problems found while reading a single SRT file are `ParseError`s.
 * Once the offending file is known they are wrapped into `ConversionError::Parse`,
 * which is the only error type crossing the conversion boundary.
 */

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ENOSPC, EDQUOT
#[cfg(unix)]
const DISK_FULL_OS_CODES: &[i32] = &[28, 122];
// ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
#[cfg(windows)]
const DISK_FULL_OS_CODES: &[i32] = &[39, 112];
#[cfg(not(any(unix, windows)))]
const DISK_FULL_OS_CODES: &[i32] = &[];

// ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
#[cfg(windows)]
const LOCKED_OS_CODES: &[i32] = &[32, 33];
#[cfg(not(windows))]
const LOCKED_OS_CODES: &[i32] = &[];

/// Flat discriminant over every error the library can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EncodingDetectionFailure,
    MalformedNumberLine,
    ZeroIndexViolation,
    DuplicateIndexViolation,
    SequenceGapViolation,
    TimestampFormatViolation,
    TimeRangeViolation,
    UnsupportedLanguageCode,
    DuplicateLanguage,
    DirectoryMismatch,
    CountMismatch,
    TimestampSyncViolation,
    HeaderMismatch,
    InvalidWorkbook,
    InvalidFilename,
    FilenameExhaustion,
    OutputLocked,
    InsufficientStorage,
    NoInput,
    NoConvertibleLanguages,
    Internal,
    Io,
}

/// Why a timestamp pair was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRangeReason {
    /// End time is not strictly after start time
    EndNotAfterStart,
    /// One of the timestamps reaches 24:00:00,000
    BeyondDay,
}

/// Errors that can occur while decoding and parsing one SRT file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// None of the supported encodings could decode the bytes
    #[error("[Error 202] Unable to detect the file encoding")]
    EncodingDetection,

    /// Expected a subtitle number line
    #[error("[Error 102] Subtitle number not found at line {line}: '{content}'")]
    MalformedNumberLine { line: usize, content: String },

    /// Numbering starts at 0
    #[error("[Error 105] Subtitle numbers must start at 1 (line {line})")]
    ZeroIndex { line: usize },

    /// A number was used twice
    #[error("[Error 104] Duplicate subtitle number #{number} at line {line}")]
    DuplicateIndex { number: u64, line: usize },

    /// A number was skipped or out of order
    #[error("[Error 101] Subtitle numbers are not sequential: expected #{expected}, found #{found} at line {line}")]
    SequenceGap { expected: u64, found: u64, line: usize },

    /// The timing line does not read `HH:MM:SS,mmm --> HH:MM:SS,mmm`
    #[error("[Error 102] Invalid timestamp line at line {line}: '{content}'")]
    TimestampFormat { line: usize, content: String },

    /// End before start, or beyond 24 hours
    #[error("[Error 107] Invalid time range for subtitle #{number} at line {line}: {start} --> {end}")]
    TimeRange {
        number: u64,
        line: usize,
        start: String,
        end: String,
        reason: TimeRangeReason,
    },
}

impl ParseError {
    /// Flat kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EncodingDetection => ErrorKind::EncodingDetectionFailure,
            Self::MalformedNumberLine { .. } => ErrorKind::MalformedNumberLine,
            Self::ZeroIndex { .. } => ErrorKind::ZeroIndexViolation,
            Self::DuplicateIndex { .. } => ErrorKind::DuplicateIndexViolation,
            Self::SequenceGap { .. } => ErrorKind::SequenceGapViolation,
            Self::TimestampFormat { .. } => ErrorKind::TimestampFormatViolation,
            Self::TimeRange { .. } => ErrorKind::TimeRangeViolation,
        }
    }

    /// Line in the decoded text where the problem was found
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::EncodingDetection => None,
            Self::MalformedNumberLine { line, .. }
            | Self::ZeroIndex { line }
            | Self::DuplicateIndex { line, .. }
            | Self::SequenceGap { line, .. }
            | Self::TimestampFormat { line, .. }
            | Self::TimeRange { line, .. } => Some(*line),
        }
    }

    /// Subtitle number the problem belongs to, when one was read
    pub fn subtitle_number(&self) -> Option<u64> {
        match self {
            Self::DuplicateIndex { number, .. } | Self::TimeRange { number, .. } => Some(*number),
            Self::SequenceGap { expected, .. } => Some(*expected),
            _ => None,
        }
    }
}

/// Main error type for conversions and validation
#[derive(Error, Debug)]
pub enum ConversionError {
    /// A structural error inside one input file
    #[error("{error} ({})", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: ParseError,
    },

    /// The filename carries no supported language code
    #[error("[Error 204] Unsupported language code: {name}")]
    UnsupportedLanguageCode { name: String },

    /// Two inputs carry the same language code
    #[error("[Error 211] Language {code} is selected more than once: {}", format_paths(paths))]
    DuplicateLanguage { code: String, paths: Vec<PathBuf> },

    /// Input files live in more than one directory
    #[error("[Error 207] All files must be in the same folder (found {} folders)", directories.len())]
    DirectoryMismatch { directories: Vec<PathBuf> },

    /// Languages carry a different number of subtitles
    #[error("[Error 108] Subtitle counts differ between files: {}", format_counts(counts))]
    CountMismatch { counts: Vec<(String, usize)> },

    /// Languages disagree on a timing pair
    #[error("[Error 103] Timestamps differ between files (subtitle #{position}): {}", format_timings(timings))]
    TimestampSync {
        position: usize,
        timings: Vec<(String, String, String)>,
    },

    /// Spreadsheet header row is not the fixed layout
    #[error("[Error 106] Spreadsheet header is invalid: column {column} expected '{expected}', found '{}'", found.as_deref().unwrap_or(""))]
    HeaderMismatch {
        column: usize,
        expected: String,
        found: Option<String>,
    },

    /// The spreadsheet package or one of its cells cannot be interpreted
    #[error("[Error 208] Invalid spreadsheet: {message}")]
    InvalidWorkbook { message: String, row: Option<usize> },

    /// Output name contains characters Windows refuses
    #[error("[Error 205] Filename contains characters that cannot be used: {name}")]
    InvalidFilename { name: String },

    /// No free output name within the attempt bound
    #[error("[Error 206] Cannot create output file, too many files named '{base}'")]
    FilenameExhaustion { base: String, attempts: u32 },

    /// Output is held open by another program
    #[error("[Error 203] File is already open: {}", path.display())]
    OutputLocked { path: PathBuf },

    /// Disk or quota exhausted while writing
    #[error("[Error 303] Not enough disk space to write {}", path.display())]
    InsufficientStorage { path: PathBuf },

    /// Nothing was selected
    #[error("[Error 210] No files were selected")]
    NoInput,

    /// Every language column of the spreadsheet is empty
    #[error("[Error 209] Nothing to convert, every language column is empty")]
    NoConvertibleLanguages,

    /// A consistency check that validation should have made impossible
    #[error("[Error 900] Internal error: {0}")]
    Internal(String),

    /// Any other I/O failure
    #[error("[Error 901] I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConversionError {
    /// Attach a file path to a parse error
    pub fn parse<P: AsRef<Path>>(path: P, error: ParseError) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            error,
        }
    }

    /// Map an I/O failure on `path` to the matching error kind
    pub fn from_io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::OutputLocked { path },
            io::ErrorKind::StorageFull => Self::InsufficientStorage { path },
            _ => match source.raw_os_error() {
                Some(code) if LOCKED_OS_CODES.contains(&code) => Self::OutputLocked { path },
                Some(code) if DISK_FULL_OS_CODES.contains(&code) => {
                    Self::InsufficientStorage { path }
                }
                _ => Self::Io { path, source },
            },
        }
    }

    /// Flat kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { error, .. } => error.kind(),
            Self::UnsupportedLanguageCode { .. } => ErrorKind::UnsupportedLanguageCode,
            Self::DuplicateLanguage { .. } => ErrorKind::DuplicateLanguage,
            Self::DirectoryMismatch { .. } => ErrorKind::DirectoryMismatch,
            Self::CountMismatch { .. } => ErrorKind::CountMismatch,
            Self::TimestampSync { .. } => ErrorKind::TimestampSyncViolation,
            Self::HeaderMismatch { .. } => ErrorKind::HeaderMismatch,
            Self::InvalidWorkbook { .. } => ErrorKind::InvalidWorkbook,
            Self::InvalidFilename { .. } => ErrorKind::InvalidFilename,
            Self::FilenameExhaustion { .. } => ErrorKind::FilenameExhaustion,
            Self::OutputLocked { .. } => ErrorKind::OutputLocked,
            Self::InsufficientStorage { .. } => ErrorKind::InsufficientStorage,
            Self::NoInput => ErrorKind::NoInput,
            Self::NoConvertibleLanguages => ErrorKind::NoConvertibleLanguages,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Numeric code shown to users
    pub fn code(&self) -> u16 {
        self.kind().code()
    }

    /// File the error is tied to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Parse { path, .. }
            | Self::OutputLocked { path }
            | Self::InsufficientStorage { path }
            | Self::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Human message without the code prefix
    pub fn message(&self) -> String {
        let text = match self {
            Self::Parse { error, .. } => error.to_string(),
            other => other.to_string(),
        };
        match text.split_once("] ") {
            Some((prefix, rest)) if prefix.starts_with("[Error") => rest.to_string(),
            _ => text,
        }
    }
}

impl ErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::SequenceGapViolation => 101,
            Self::TimestampFormatViolation | Self::MalformedNumberLine => 102,
            Self::TimestampSyncViolation => 103,
            Self::DuplicateIndexViolation => 104,
            Self::ZeroIndexViolation => 105,
            Self::HeaderMismatch => 106,
            Self::TimeRangeViolation => 107,
            Self::CountMismatch => 108,
            Self::EncodingDetectionFailure => 202,
            Self::OutputLocked => 203,
            Self::UnsupportedLanguageCode => 204,
            Self::InvalidFilename => 205,
            Self::FilenameExhaustion => 206,
            Self::DirectoryMismatch => 207,
            Self::InvalidWorkbook => 208,
            Self::NoConvertibleLanguages => 209,
            Self::NoInput => 210,
            Self::DuplicateLanguage => 211,
            Self::InsufficientStorage => 303,
            Self::Internal => 900,
            Self::Io => 901,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(lang, count)| format!("{}={}", lang, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_timings(timings: &[(String, String, String)]) -> String {
    timings
        .iter()
        .map(|(lang, start, end)| format!("{} {} --> {}", lang, start, end))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ConversionError>;
