//! Control-sheet parser for spreadsheet exports of the Statement of Applicability.
//!
//! The export is comma-delimited text with optional quoting. Quoted cells may
//! span several lines and escape a literal quote by doubling it. Data rows
//! follow a header row naming the `ISO 27001 Annex A Control` column and one
//! driver sub-header row, with columns:
//!
//! ```text
//! [unused, number, title, objective, business, risk, legal, contract,
//!  applicable, date last assessed, not-applicable reason]
//! ```
//!
//! Parsing never fails. Section separators, blank rows and anything else
//! that is not a control are dropped; each drop is reported at `debug`
//! level and in [`SheetReport::skipped`].

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::control::{Applicability, ControlRecord, Drivers};

/// Substring identifying the column header row.
pub const HEADER_MARKER: &str = "ISO 27001 Annex A Control";

/// Minimum number of fields in a data row.
pub const MIN_FIELDS: usize = 10;

static CONTROL_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)").expect("static regex must compile"));

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to read control sheet {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Why a row after the header did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewFields,
    NoControlNumber,
    SectionHeader,
    MissingText,
}

/// Records plus the rows that were dropped, by row index in the tokenized sheet.
#[derive(Debug, Default)]
pub struct SheetReport {
    pub records: Vec<ControlRecord>,
    pub skipped: Vec<(usize, SkipReason)>,
    /// False when no header row was found.
    pub header_found: bool,
}

/// Split delimited text into rows of trimmed fields.
pub fn tokenize(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(take_field(&mut field)),
            '\n' if !in_quotes => {
                row.push(take_field(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if !row.is_empty() || !field.is_empty() {
        row.push(take_field(&mut field));
        rows.push(row);
    }

    rows
}

fn take_field(field: &mut String) -> String {
    let value = field.trim().to_string();
    field.clear();
    value
}

/// Parse a control sheet into records, in source order.
pub fn parse_control_sheet(text: &str) -> Vec<ControlRecord> {
    parse_control_sheet_report(text).records
}

/// Parse a control sheet, keeping the reasons rows were skipped.
pub fn parse_control_sheet_report(text: &str) -> SheetReport {
    let rows = tokenize(text);

    let Some(header) = rows
        .iter()
        .position(|row| row.iter().any(|cell| cell.contains(HEADER_MARKER)))
    else {
        debug!(rows = rows.len(), "no control sheet header found");
        return SheetReport::default();
    };

    let mut report = SheetReport {
        header_found: true,
        ..SheetReport::default()
    };

    // Skip the header and the driver sub-header.
    for (index, row) in rows.iter().enumerate().skip(header + 2) {
        match parse_row(row) {
            Ok(record) => report.records.push(record),
            Err(reason) => {
                debug!(row = index, ?reason, "skipping sheet row");
                report.skipped.push((index, reason));
            }
        }
    }

    report
}

fn parse_row(row: &[String]) -> Result<ControlRecord, SkipReason> {
    if row.len() < MIN_FIELDS {
        return Err(SkipReason::TooFewFields);
    }

    let control_number = CONTROL_NUMBER_RE
        .captures(&row[1])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(SkipReason::NoControlNumber)?;

    let title = row[2].trim();
    let objective = row[3].trim();

    if title.is_empty() || title == "Organisational Controls" || title.contains("Controls") {
        return Err(SkipReason::SectionHeader);
    }

    let drivers = Drivers {
        business: is_yes(&row[4]),
        risk: is_yes(&row[5]),
        legal: is_yes(&row[6]),
        contract: is_yes(&row[7]),
    };
    let is_required = drivers.any();

    // Substring match: "Not Applicable" also contains "Applicable".
    let raw_applicable = if row[8].contains("Applicable") {
        Applicability::Applicable
    } else {
        Applicability::NotApplicable
    };
    let is_applicable = if is_required {
        raw_applicable
    } else {
        Applicability::NotApplicable
    };

    if control_number.is_empty() || objective.is_empty() {
        return Err(SkipReason::MissingText);
    }

    Ok(ControlRecord {
        control_number,
        title: title.to_string(),
        objective: objective.to_string(),
        drivers,
        is_required,
        is_applicable,
        date_last_assessed: row[9].trim().to_string(),
        not_applicable_reason: row.get(10).map(|s| s.trim()).unwrap_or("").to_string(),
    })
}

fn is_yes(field: &str) -> bool {
    field.eq_ignore_ascii_case("yes")
}

/// Read a control sheet from disk and parse it.
pub fn load_control_sheet(path: &Path) -> Result<Vec<ControlRecord>, SheetError> {
    let text = std::fs::read_to_string(path).map_err(|source| SheetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report = parse_control_sheet_report(&text);
    info!(
        path = %path.display(),
        controls = report.records.len(),
        skipped = report.skipped.len(),
        "loaded control sheet"
    );
    Ok(report.records)
}
