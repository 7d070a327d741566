use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::encoding;
use crate::errors::{ConversionError, ParseError, Result, TimeRangeReason};
use crate::language_utils::LanguageCode;

// @module: SRT parsing and generation

// @const: SRT timing line, exact digit widths
static TIMING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3}) --> ([0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})$")
        .unwrap()
});

// @const: Single SRT timestamp
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2}),([0-9]{3})$").unwrap()
});

/// One day in milliseconds; timestamps must stay strictly below it
pub const DAY_MS: u64 = 24 * 3_600_000;

/// Subtitles of every language, keyed in canonical column order
pub type SubtitlesByLanguage = BTreeMap<LanguageCode, Vec<Subtitle>>;

/// Parse an `HH:MM:SS,mmm` timestamp to milliseconds
pub fn timestamp_to_ms(timestamp: &str) -> Option<u64> {
    let caps = TIMESTAMP_REGEX.captures(timestamp)?;
    let field = |i: usize| caps[i].parse::<u64>().ok();
    Some(field(1)? * 3_600_000 + field(2)? * 60_000 + field(3)? * 1_000 + field(4)?)
}

/// Format milliseconds as an `HH:MM:SS,mmm` timestamp
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Check the start/end rule shared by SRT files and spreadsheet rows
///
/// Both timestamps must be well formed; end must be strictly after start and
/// both must be below 24 hours.
pub fn check_time_range(start: &str, end: &str) -> std::result::Result<(), Option<TimeRangeReason>> {
    let (Some(start_ms), Some(end_ms)) = (timestamp_to_ms(start), timestamp_to_ms(end)) else {
        return Err(None);
    };
    if end_ms <= start_ms {
        return Err(Some(TimeRangeReason::EndNotAfterStart));
    }
    if start_ms >= DAY_MS || end_ms >= DAY_MS {
        return Err(Some(TimeRangeReason::BeyondDay));
    }
    Ok(())
}

/// Single subtitle record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    number: u64,
    start_time: String,
    end_time: String,
    text: String,
}

impl Subtitle {
    pub fn new(number: u64, start_time: impl Into<String>, end_time: impl Into<String>, text: impl Into<String>) -> Self {
        Subtitle {
            number,
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn end_time(&self) -> &str {
        &self.end_time
    }

    /// Subtitle body, lines joined with `\n`; may be empty
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The (start, end) pair compared across languages
    pub fn timing(&self) -> (&str, &str) {
        (&self.start_time, &self.end_time)
    }

    // @returns: true when the body has no visible characters
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for Subtitle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.number)?;
        writeln!(f, "{} --> {}", self.start_time, self.end_time)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Parse decoded SRT text
///
/// Single forward pass: runs of blank lines between blocks are skipped, then
/// each block is read as number line, timing line and body. A whitespace-only
/// line ends the body. Numbers must run 1, 2, 3, ... without gaps.
pub fn parse_content(content: &str) -> std::result::Result<Vec<Subtitle>, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();

    let mut subtitles = Vec::new();
    let mut expected: u64 = 1;
    let mut i = 0;

    while i < lines.len() {
        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }
        if i >= lines.len() {
            break;
        }

        // Number line
        let number_line = lines[i].trim();
        let number_line_no = i + 1;
        let number: u64 = number_line.parse().map_err(|_| ParseError::MalformedNumberLine {
            line: number_line_no,
            content: number_line.to_string(),
        })?;

        if number == 0 {
            return Err(ParseError::ZeroIndex { line: number_line_no });
        }
        // Everything below `expected` has already been seen
        if number < expected {
            return Err(ParseError::DuplicateIndex {
                number,
                line: number_line_no,
            });
        }
        if number != expected {
            return Err(ParseError::SequenceGap {
                expected,
                found: number,
                line: number_line_no,
            });
        }
        i += 1;

        // Timing line
        let timing_line_no = i + 1;
        let timing_line = lines.get(i).map(|line| line.trim()).unwrap_or_default();
        let caps = TIMING_LINE_REGEX
            .captures(timing_line)
            .ok_or_else(|| ParseError::TimestampFormat {
                line: timing_line_no,
                content: timing_line.to_string(),
            })?;
        let start_time = caps[1].to_string();
        let end_time = caps[2].to_string();

        if let Err(reason) = check_time_range(&start_time, &end_time) {
            return Err(match reason {
                Some(reason) => ParseError::TimeRange {
                    number,
                    line: timing_line_no,
                    start: start_time,
                    end: end_time,
                    reason,
                },
                None => ParseError::TimestampFormat {
                    line: timing_line_no,
                    content: timing_line.to_string(),
                },
            });
        }
        i += 1;

        // Body
        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i]);
            i += 1;
        }

        subtitles.push(Subtitle {
            number,
            start_time,
            end_time,
            text: text_lines.join("\n"),
        });
        expected += 1;
    }

    Ok(subtitles)
}

/// Decode and parse raw SRT bytes
pub fn parse_bytes(bytes: &[u8]) -> std::result::Result<Vec<Subtitle>, ParseError> {
    let (content, detected) = encoding::decode(bytes)?;
    debug!("Decoded {} bytes as {}", bytes.len(), detected.name());
    parse_content(&content)
}

/// Read, decode and parse an SRT file
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Subtitle>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ConversionError::from_io(path, e))?;
    parse_bytes(&bytes).map_err(|e| ConversionError::parse(path, e))
}

/// Render subtitles back to SRT text, each block followed by a blank line
pub fn generate_srt_content(subtitles: &[Subtitle]) -> String {
    let mut content = String::new();
    for subtitle in subtitles {
        content.push_str(&subtitle.to_string());
    }
    content
}
