//! Minimal .xlsx reader.
//!
//! Loads the first worksheet listed in `xl/workbook.xml` into a sparse grid.
//! Shared strings, inline strings, formula strings, numbers, booleans and
//! error cells are understood; styles and formulas are ignored.

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::errors::{ConversionError, Result};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

// Column XFD, the widest sheet spreadsheet applications produce
const MAX_COLUMNS: usize = 16_384;

/// Value of one non-empty cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl CellValue {
    /// Text as a user would see it; integral numbers print without decimals
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) | Self::Error(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

/// Sparse cell grid: 1-based rows, 0-based columns
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    cells: HashMap<(u32, usize), CellValue>,
}

impl CellGrid {
    pub fn get(&self, row: u32, column: usize) -> Option<&CellValue> {
        self.cells.get(&(row, column))
    }

    pub fn insert(&mut self, row: u32, column: usize, value: CellValue) {
        self.cells.insert((row, column), value);
    }

}

fn invalid(message: impl Into<String>) -> ConversionError {
    ConversionError::InvalidWorkbook {
        message: message.into(),
        row: None,
    }
}

/// Read the first worksheet of an .xlsx package
pub fn read_first_sheet<R: Read + Seek>(reader: R) -> Result<CellGrid> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| invalid(format!("not an .xlsx package: {}", e)))?;

    let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_part = first_sheet_part(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| invalid(format!("worksheet part '{}' is missing", sheet_part)))?;

    parse_sheet(&sheet_xml, &shared)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(invalid(format!("cannot open '{}': {}", name, e))),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| invalid(format!("cannot read '{}': {}", name, e)))?;
    Ok(Some(xml))
}

fn attribute(element: &BytesStart, local: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| invalid(format!("malformed attribute: {}", e)))?;
        if attr.key.local_name().as_ref() == local {
            let value = attr
                .unescape_value()
                .map_err(|e| invalid(format!("malformed attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve the part name of the first `<sheet>` in the workbook
fn first_sheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let Some(workbook) = read_part(archive, WORKBOOK_PART)? else {
        return Err(invalid("workbook part is missing"));
    };

    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"sheet" => {
                // r:id, the only namespaced "id" on <sheet>
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                        rel_id = attr.unescape_value().ok().map(|v| v.into_owned());
                    }
                }
                break;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(format!("malformed workbook part: {}", e))),
            _ => {}
        }
    }

    let Some(rel_id) = rel_id else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };
    let Some(rels) = read_part(archive, WORKBOOK_RELS_PART)? else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };

    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(e, b"Id")?.as_deref() == Some(rel_id.as_str()) {
                    if let Some(target) = attribute(e, b"Target")? {
                        return Ok(match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("xl/{}", target),
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(format!("malformed workbook relationships: {}", e))),
            _ => {}
        }
    }

    Ok(DEFAULT_SHEET_PART.to_string())
}

/// Text of every `<si>` item, runs concatenated, phonetic hints skipped
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref t)) if in_t && !in_phonetic => {
                let text = t
                    .unescape()
                    .map_err(|e| invalid(format!("malformed shared string: {}", e)))?;
                if let Some(current) = current.as_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(ref c)) if in_t && !in_phonetic => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&String::from_utf8_lossy(c));
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(format!("malformed shared strings: {}", e))),
            _ => {}
        }
    }

    Ok(strings)
}

/// Split an A1-style reference into (row, 0-based column)
///
/// Columns past XFD are rejected.
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(u32, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut column = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        column = column.checked_mul(26)?.checked_add(digit)?;
        if column > MAX_COLUMNS {
            return None;
        }
    }
    let row = digits.parse::<u32>().ok()?;
    Some((row, column - 1))
}

#[derive(Default)]
struct PendingCell {
    row: u32,
    column: usize,
    cell_type: Option<String>,
    value: String,
    inline: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<CellGrid> {
    let mut grid = CellGrid::default();
    let mut reader = Reader::from_str(xml);

    let mut row = 0u32;
    let mut next_column = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_v = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = start_row(e, row)?;
                    next_column = 0;
                }
                b"c" => {
                    let (cell_row, column) = locate_cell(e, row, next_column)?;
                    next_column = column + 1;
                    cell = Some(PendingCell {
                        row: cell_row,
                        column,
                        cell_type: attribute(e, b"t")?,
                        ..PendingCell::default()
                    });
                }
                b"v" => in_v = true,
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = start_row(e, row)?;
                    next_column = 0;
                }
                b"c" => {
                    let (_, column) = locate_cell(e, row, next_column)?;
                    next_column = column + 1;
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_v || (in_t && !in_phonetic) => {
                let text = t
                    .unescape()
                    .map_err(|e| invalid(format!("malformed cell text: {}", e)))?;
                if let Some(cell) = cell.as_mut() {
                    if in_v {
                        cell.value.push_str(&text);
                    } else {
                        cell.inline.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(ref c)) if in_v || (in_t && !in_phonetic) => {
                if let Some(cell) = cell.as_mut() {
                    let text = String::from_utf8_lossy(c);
                    if in_v {
                        cell.value.push_str(&text);
                    } else {
                        cell.inline.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(done) = cell.take() {
                        if let Some(value) = resolve_cell(&done, shared)? {
                            grid.insert(done.row, done.column, value);
                        }
                    }
                }
                b"v" => in_v = false,
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(format!("malformed worksheet: {}", e))),
            _ => {}
        }
    }

    Ok(grid)
}

fn start_row(element: &BytesStart, previous: u32) -> Result<u32> {
    match attribute(element, b"r")? {
        Some(r) => r
            .parse::<u32>()
            .map_err(|_| invalid(format!("invalid row number '{}'", r))),
        None => previous
            .checked_add(1)
            .ok_or_else(|| invalid(format!("row after {} is out of range", previous))),
    }
}

fn locate_cell(element: &BytesStart, row: u32, next_column: usize) -> Result<(u32, usize)> {
    match attribute(element, b"r")? {
        Some(reference) => {
            parse_cell_ref(&reference).ok_or_else(|| invalid(format!("invalid cell reference '{}'", reference)))
        }
        None => Ok((row, next_column)),
    }
}

fn resolve_cell(cell: &PendingCell, shared: &[String]) -> Result<Option<CellValue>> {
    let value = match cell.cell_type.as_deref() {
        Some("s") => {
            if cell.value.trim().is_empty() {
                return Ok(None);
            }
            let index: usize = cell
                .value
                .trim()
                .parse()
                .map_err(|_| invalid(format!("invalid shared string index '{}'", cell.value)))?;
            let text = shared
                .get(index)
                .ok_or_else(|| invalid(format!("shared string {} does not exist", index)))?;
            CellValue::Text(text.clone())
        }
        Some("inlineStr") => CellValue::Text(cell.inline.clone()),
        Some("str") => CellValue::Text(cell.value.clone()),
        Some("b") => CellValue::Bool(cell.value.trim() == "1"),
        Some("e") => CellValue::Error(cell.value.clone()),
        _ => {
            if cell.value.is_empty() {
                return Ok(None);
            }
            match cell.value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(cell.value.clone()),
            }
        }
    };
    Ok(Some(value))
}
