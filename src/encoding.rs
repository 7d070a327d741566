/*!
 * Text encoding detection for subtitle files.
 *
 * Candidates are tried in a fixed order: UTF-8 byte-order mark, strict UTF-8,
 * strict CP949, and finally a statistical guess by `chardetng` that is only
 * accepted with confidence >= 0.70.
 */

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use log::debug;

use crate::errors::ParseError;

/// Minimum confidence the statistical pass must reach
pub const MIN_CONFIDENCE: f64 = 0.70;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Weight of one control character against ordinary characters
const CONTROL_PENALTY: f64 = 10.0;

/// Which rung of the detection ladder decoded the bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectedEncoding {
    Utf8Bom,
    Utf8,
    Cp949,
    Detected {
        encoding: &'static Encoding,
        confidence: f64,
    },
}

impl DetectedEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8Bom => "UTF-8 (BOM)",
            Self::Utf8 => "UTF-8",
            Self::Cp949 => "CP949",
            Self::Detected { encoding, .. } => encoding.name(),
        }
    }
}

/// Decode raw subtitle bytes into text
pub fn decode(bytes: &[u8]) -> Result<(String, DetectedEncoding), ParseError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        // A BOM promises UTF-8; anything else is not a file we can trust
        return match std::str::from_utf8(rest) {
            Ok(text) => Ok((text.to_string(), DetectedEncoding::Utf8Bom)),
            Err(_) => Err(ParseError::EncodingDetection),
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok((text.to_string(), DetectedEncoding::Utf8));
    }

    // encoding_rs's EUC-KR is the Windows-949 superset
    if let Some(text) = strict_decode(encoding_rs::EUC_KR, bytes) {
        return Ok((text.into_owned(), DetectedEncoding::Cp949));
    }

    let (text, encoding, confidence) = detect(bytes).ok_or(ParseError::EncodingDetection)?;
    debug!("Statistical encoding guess: {} ({:.2})", encoding.name(), confidence);
    if confidence < MIN_CONFIDENCE {
        return Err(ParseError::EncodingDetection);
    }

    Ok((text, DetectedEncoding::Detected { encoding, confidence }))
}

fn strict_decode<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// Statistical guess with its confidence
///
/// `chardetng` picks the encoding. The confidence is the plausibility of the
/// decoded text, halved when the detector could not rank its guess above any
/// other candidate. Returns `None` when the guess cannot decode the bytes.
fn detect(bytes: &[u8]) -> Option<(String, &'static Encoding, f64)> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (encoding, assured) = detector.guess_assess(None, false);

    let text = strict_decode(encoding, bytes)?;
    let mut confidence = plausibility(&text);
    if !assured {
        confidence /= 2.0;
    }
    Some((text.into_owned(), encoding, confidence))
}

/// Share of plausible text characters in `text`, in `0.0..=1.0`
///
/// Control characters other than line breaks and tabs count heavily against
/// the score; binary data decoded as text is full of them.
pub fn plausibility(text: &str) -> f64 {
    let mut total = 0usize;
    let mut score = 0.0f64;

    for c in text.chars() {
        total += 1;
        score += match c {
            '\n' | '\r' | '\t' => 1.0,
            c if c.is_ascii_graphic() || c == ' ' => 1.0,
            c if c.is_control() => 1.0 - CONTROL_PENALTY,
            '\u{E000}'..='\u{F8FF}' | '\u{FFFD}' => 0.0,
            c if c.is_alphabetic() => 1.0,
            // Symbols and punctuation outside ASCII are legal but rare in dialogue
            _ => 0.3,
        };
    }

    if total == 0 {
        return 1.0;
    }
    (score / total as f64).max(0.0)
}
