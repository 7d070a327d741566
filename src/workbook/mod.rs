/*!
 * Spreadsheet layout for multi-language subtitle sets.
 *
 * One sheet, fixed columns: `#`, `START`, `END`, then one text column per
 * language in canonical order. Row 1 is the header, each following row is one
 * subtitle. The header must match exactly when a sheet is read back.
 *
 * - `writer`: serializes a `SubtitleSheet` into an OOXML (.xlsx) package
 * - `reader`: loads the first worksheet of a package into a cell grid
 */

mod reader;
mod writer;

use std::io::{Cursor, Read, Seek};

use log::debug;

use crate::errors::{ConversionError, Result};
use crate::language_utils::LanguageCode;
use crate::subtitle_processor::{self, Subtitle, SubtitlesByLanguage};

pub use reader::{CellGrid, CellValue};

/// Number of language columns
pub const LANGUAGE_COLUMNS: usize = LanguageCode::ALL.len();

/// Total number of fixed columns
pub const COLUMN_COUNT: usize = 3 + LANGUAGE_COLUMNS;

/// Worksheet name used when generating
pub const SHEET_NAME: &str = "Subtitles";

/// Expected header row, in column order
pub fn headers() -> [&'static str; COLUMN_COUNT] {
    let mut headers = ["#", "START", "END", "", "", "", "", "", "", "", "", ""];
    for code in LanguageCode::ALL {
        headers[3 + code.column_offset()] = code.header_label();
    }
    headers
}

/// One data row of the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub number: u64,
    pub start_time: String,
    pub end_time: String,
    /// Text per language, indexed by `LanguageCode::column_offset`
    pub texts: [String; LANGUAGE_COLUMNS],
}

/// In-memory tabular document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleSheet {
    rows: Vec<SheetRow>,
}

impl SubtitleSheet {
    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    /// Serialize to .xlsx bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        writer::write_package(self, &mut cursor)
            .map_err(|e| ConversionError::Internal(format!("Failed to build spreadsheet: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Load and header-check the first worksheet of an .xlsx package
    pub fn read_from<R: Read + Seek>(reader: R) -> Result<Self> {
        let grid = reader::read_first_sheet(reader)?;
        Self::from_grid(&grid)
    }

    /// Interpret a cell grid with the fixed layout
    ///
    /// The scan stops at the first row whose `#` cell is empty.
    pub fn from_grid(grid: &CellGrid) -> Result<Self> {
        for (column, expected) in headers().iter().enumerate() {
            let found = grid.get(1, column).map(CellValue::to_text);
            if found.as_deref() != Some(*expected) {
                return Err(ConversionError::HeaderMismatch {
                    column: column + 1,
                    expected: expected.to_string(),
                    found,
                });
            }
        }

        let mut rows = Vec::new();
        let mut row = 2u32;
        loop {
            let number = match grid.get(row, 0) {
                None => break,
                Some(cell) if cell.to_text().trim().is_empty() => break,
                Some(cell) => parse_row_number(cell, row)?,
            };

            let start_time = cell_text(grid, row, 1);
            let end_time = cell_text(grid, row, 2);
            check_row_timing(&start_time, &end_time, row)?;

            let texts = std::array::from_fn(|offset| cell_text(grid, row, 3 + offset));
            rows.push(SheetRow {
                number,
                start_time,
                end_time,
                texts,
            });
            row += 1;
        }

        debug!("Read {} subtitle row(s) from spreadsheet", rows.len());
        Ok(Self { rows })
    }

    /// Split the sheet into one subtitle sequence per language
    ///
    /// Every language is present; use `empty_languages` to filter.
    pub fn into_languages(self) -> SubtitlesByLanguage {
        let mut collection: SubtitlesByLanguage = LanguageCode::ALL
            .iter()
            .map(|code| (*code, Vec::with_capacity(self.rows.len())))
            .collect();

        for row in self.rows {
            for (offset, text) in row.texts.into_iter().enumerate() {
                let code = LanguageCode::ALL[offset];
                if let Some(subtitles) = collection.get_mut(&code) {
                    subtitles.push(Subtitle::new(
                        row.number,
                        row.start_time.clone(),
                        row.end_time.clone(),
                        text,
                    ));
                }
            }
        }
        collection
    }
}

/// Build the sheet for a synchronized collection
///
/// Index and timings come from the first language in canonical order. Counts
/// are re-checked here even though cross-file validation runs first.
pub fn generate(collection: &SubtitlesByLanguage) -> Result<SubtitleSheet> {
    let Some((first_code, reference)) = collection.iter().next() else {
        return Ok(SubtitleSheet::default());
    };

    if let Some((code, subs)) = collection.iter().find(|(_, subs)| subs.len() != reference.len()) {
        return Err(ConversionError::Internal(format!(
            "subtitle counts differ between {} ({}) and {} ({})",
            first_code,
            reference.len(),
            code,
            subs.len()
        )));
    }

    let rows = reference
        .iter()
        .enumerate()
        .map(|(index, first)| {
            let mut texts: [String; LANGUAGE_COLUMNS] = Default::default();
            for (code, subtitles) in collection {
                texts[code.column_offset()] = subtitles[index].text().to_string();
            }
            SheetRow {
                number: first.number(),
                start_time: first.start_time().to_string(),
                end_time: first.end_time().to_string(),
                texts,
            }
        })
        .collect();

    Ok(SubtitleSheet { rows })
}

/// Read an .xlsx package into per-language subtitles
pub fn read<R: Read + Seek>(reader: R) -> Result<SubtitlesByLanguage> {
    Ok(SubtitleSheet::read_from(reader)?.into_languages())
}

/// True when every subtitle body is empty or whitespace
pub fn is_language_column_empty(subtitles: &[Subtitle]) -> bool {
    subtitles.iter().all(Subtitle::is_blank)
}

/// Languages whose whole column is blank, in canonical order
pub fn empty_languages(collection: &SubtitlesByLanguage) -> Vec<LanguageCode> {
    collection
        .iter()
        .filter(|(_, subtitles)| is_language_column_empty(subtitles))
        .map(|(code, _)| *code)
        .collect()
}

fn cell_text(grid: &CellGrid, row: u32, column: usize) -> String {
    grid.get(row, column).map(CellValue::to_text).unwrap_or_default()
}

fn parse_row_number(cell: &CellValue, row: u32) -> Result<u64> {
    let parsed = match cell {
        CellValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
        CellValue::Text(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ConversionError::InvalidWorkbook {
        message: format!("row {}: '{}' is not a subtitle number", row, cell.to_text()),
        row: Some(row as usize),
    })
}

fn check_row_timing(start: &str, end: &str, row: u32) -> Result<()> {
    subtitle_processor::check_time_range(start, end).map_err(|reason| {
        let problem = match reason {
            None => "timestamps must read HH:MM:SS,mmm",
            Some(_) => "end must be after start and both below 24:00:00,000",
        };
        ConversionError::InvalidWorkbook {
            message: format!("row {}: invalid timing '{}' --> '{}', {}", row, start, end, problem),
            row: Some(row as usize),
        }
    })
}
