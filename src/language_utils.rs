/*!
 * Language utilities for the fixed subtitle language set.
 *
 * Each input SRT carries its language in the filename (`<base>_<CODE>.srt`),
 * and each language owns one column of the spreadsheet. The variant order of
 * `LanguageCode` is the canonical column order.
 */

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ConversionError, Result};

// @const: Filename pattern, case-insensitive
static LANGUAGE_FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^.*_(KO|EN|CT|CS|JA|TH|ES-LATAM|PT-BR|RU)\.srt$")
        .expect("language filename pattern is valid")
});

/// Characters Windows refuses in file names
pub const INVALID_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Supported subtitle language
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "KO")]
    Ko,
    #[serde(rename = "EN")]
    En,
    /// Traditional Chinese
    #[serde(rename = "CT")]
    Ct,
    /// Simplified Chinese
    #[serde(rename = "CS")]
    Cs,
    #[serde(rename = "JA")]
    Ja,
    #[serde(rename = "TH")]
    Th,
    #[serde(rename = "ES-LATAM")]
    EsLatam,
    #[serde(rename = "PT-BR")]
    PtBr,
    #[serde(rename = "RU")]
    Ru,
}

impl LanguageCode {
    /// All codes in canonical column order
    pub const ALL: [LanguageCode; 9] = [
        Self::Ko,
        Self::En,
        Self::Ct,
        Self::Cs,
        Self::Ja,
        Self::Th,
        Self::EsLatam,
        Self::PtBr,
        Self::Ru,
    ];

    // @returns: Upper-case code as used in filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "KO",
            Self::En => "EN",
            Self::Ct => "CT",
            Self::Cs => "CS",
            Self::Ja => "JA",
            Self::Th => "TH",
            Self::EsLatam => "ES-LATAM",
            Self::PtBr => "PT-BR",
            Self::Ru => "RU",
        }
    }

    // @returns: Bilingual spreadsheet header label
    pub fn header_label(&self) -> &'static str {
        match self {
            Self::Ko => "KO/한국어",
            Self::En => "EN/영어",
            Self::Ct => "CT/중국어 번체",
            Self::Cs => "CS/중국어 간체",
            Self::Ja => "JA/일본어",
            Self::Th => "TH/태국어",
            Self::EsLatam => "ES-LATAM/스페인어(남미)",
            Self::PtBr => "PT-BR/포르투갈어(브라질)",
            Self::Ru => "RU/러시아어",
        }
    }

    /// Position among the language columns (0-based)
    pub fn column_offset(&self) -> usize {
        Self::ALL
            .iter()
            .position(|code| code == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == upper)
            .ok_or(ConversionError::UnsupportedLanguageCode { name: s.to_string() })
    }
}

/// Extract the language code from a `<base>_<CODE>.srt` filename
///
/// Only the final path component is inspected. The code is matched
/// case-insensitively and normalized to upper case.
pub fn extract_language_code<P: AsRef<Path>>(filename: P) -> Result<LanguageCode> {
    let name = filename
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let captures = LANGUAGE_FILENAME_REGEX
        .captures(&name)
        .ok_or_else(|| ConversionError::UnsupportedLanguageCode { name: name.clone() })?;

    captures[1].parse()
}

/// Base name of a `<base>_<CODE>.srt` file: everything before the last underscore
pub fn strip_language_suffix<P: AsRef<Path>>(filename: P) -> String {
    let name = filename
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    match name.rsplit_once('_') {
        Some((base, _)) => base.to_string(),
        None => name,
    }
}

/// Reject names containing characters Windows cannot store
pub fn validate_filename_characters(name: &str) -> Result<()> {
    if name.contains(INVALID_FILENAME_CHARS) {
        return Err(ConversionError::InvalidFilename {
            name: name.to_string(),
        });
    }
    Ok(())
}
