/*!
 * Structured validation results.
 *
 * A report is built fresh for one validation pass, rendered, then dropped.
 */

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::errors::{ConversionError, ErrorKind};

/// One problem found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Machine-checkable kind
    pub kind: ErrorKind,
    /// Numeric code shown to users
    pub code: u16,
    /// Description without the code prefix
    pub message: String,
    /// File the issue belongs to; `None` for cross-file issues
    pub file: Option<PathBuf>,
    /// Subtitle number, when known
    pub subtitle: Option<u64>,
    /// Line in the file, when known
    pub line: Option<usize>,
}

impl ValidationIssue {
    /// Build an issue from an error, falling back to `file` when the error has no path
    pub fn from_error(error: &ConversionError, file: Option<&Path>) -> Self {
        let (subtitle, line) = match error {
            ConversionError::Parse { error, .. } => (error.subtitle_number(), error.line()),
            ConversionError::TimestampSync { position, .. } => (Some(*position as u64), None),
            ConversionError::InvalidWorkbook { row, .. } => (None, *row),
            _ => (None, None),
        };

        Self {
            kind: error.kind(),
            code: error.code(),
            message: error.message(),
            file: error.path().or(file).map(Path::to_path_buf),
            subtitle,
            line,
        }
    }

    /// "line N, subtitle #M", or whichever part is known
    pub fn format_location(&self) -> Option<String> {
        match (self.line, self.subtitle) {
            (Some(line), Some(number)) => Some(format!("line {}, subtitle #{}", line, number)),
            (Some(line), None) => Some(format!("line {}", line)),
            (None, Some(number)) => Some(format!("subtitle #{}", number)),
            (None, None) => None,
        }
    }
}

/// Group heading used by the report
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueGroup {
    File(PathBuf),
    CrossFile,
}

/// Aggregated validation outcome
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Issues in the order they were found
    pub issues: Vec<ValidationIssue>,
    /// Every file that was examined
    pub checked_files: Vec<PathBuf>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single error
    pub fn from_error(error: &ConversionError) -> Self {
        let mut report = Self::new();
        report.add_error(error, None);
        report
    }

    pub fn add_error(&mut self, error: &ConversionError, file: Option<&Path>) {
        self.issues.push(ValidationIssue::from_error(error, file));
    }

    pub fn add_checked_file<P: AsRef<Path>>(&mut self, path: P) {
        self.checked_files.push(path.as_ref().to_path_buf());
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues grouped per file, cross-file issues in their own group
    pub fn group_by_file(&self) -> BTreeMap<IssueGroup, Vec<&ValidationIssue>> {
        let mut groups: BTreeMap<IssueGroup, Vec<&ValidationIssue>> = BTreeMap::new();
        for issue in &self.issues {
            let key = match &issue.file {
                Some(path) => IssueGroup::File(path.clone()),
                None => IssueGroup::CrossFile,
            };
            groups.entry(key).or_default().push(issue);
        }
        groups
    }

    /// Human-readable report, grouped by file with a closing summary
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.is_valid() {
            let _ = writeln!(out, "No problems found in {} file(s)", self.checked_files.len());
            return out;
        }

        let groups = self.group_by_file();
        for (group, issues) in &groups {
            let _ = match group {
                IssueGroup::File(path) => {
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    writeln!(out, "=== File: {} ===", name)
                }
                IssueGroup::CrossFile => writeln!(out, "=== Cross-file validation ==="),
            };
            for issue in issues {
                match issue.format_location() {
                    Some(location) => {
                        let _ = writeln!(out, "  • {}", location);
                        let _ = writeln!(out, "    [{}] {}", issue.code, issue.message);
                    }
                    None => {
                        let _ = writeln!(out, "  • [{}] {}", issue.code, issue.message);
                    }
                }
            }
        }

        let _ = writeln!(
            out,
            "\n{} error(s) in {} group(s)",
            self.issues.len(),
            groups.len()
        );
        out
    }
}
