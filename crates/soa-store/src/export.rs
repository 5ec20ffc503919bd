//! Statement of Applicability sheet export.
//!
//! Rows follow the published workbook: a document preamble, the column
//! header, the driver sub-header, then one row per control. The first column
//! is left blank so the control columns line up with what the sheet parser
//! reads, and an exported register loads back unchanged.

use std::path::Path;

use chrono::NaiveDate;
use soa_core::{Applicability, ControlRecord, Drivers};
use tracing::info;

use crate::StoreError;

const COLUMNS: usize = 11;

/// Document metadata written into the sheet preamble.
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub company: String,
    /// e.g. `"Jane Doe, Engagement Lead"`.
    pub prepared_by: Option<String>,
    pub approved_by: Option<String>,
    pub date: NaiveDate,
}

impl ExportMeta {
    pub fn new(company: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            company: company.into(),
            prepared_by: None,
            approved_by: None,
            date,
        }
    }
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
    let mut row: Vec<String> = std::iter::once("")
        .chain(cells)
        .map(str::to_string)
        .collect();
    if row.len() > 1 && row.len() < COLUMNS {
        row.resize(COLUMNS, String::new());
    }
    row
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Build the sheet as rows of cells.
pub fn sheet_rows(records: &[ControlRecord], meta: &ExportMeta) -> Vec<Vec<String>> {
    let title = format!(
        "{} : Statement of Applicability | ISO 27001:2022 Annex A",
        meta.company
    );
    let date = meta.date.format("%B %-d, %Y").to_string();
    let prepared = meta.prepared_by.as_deref().unwrap_or("Name, title");
    let approved = meta.approved_by.as_deref().unwrap_or("Name, title");

    let mut rows = vec![
        row([title.as_str()]),
        row(["Classification: Confidential"]),
        row([]),
        row([
            "Document Information:",
            "",
            "",
            "Version",
            "Prepared By",
            "Approved By",
            "Approval Date",
        ]),
        row(["", "", "", "1.0", prepared, approved, date.as_str()]),
        row([]),
        row(["Scope and Context:"]),
        row([
            "This Statement of Applicability (SoA) identifies the controls from ISO/IEC 27001:2022 Annex A",
        ]),
        row(["that are applicable to our Information Security Management System (ISMS)."]),
        row(["Controls marked as \"Not Applicable\" include justification for their exclusion."]),
        row([]),
        row(["Assessment Criteria:"]),
        row([
            "Driver why control is required:",
            "",
            "",
            "Business",
            "Risk",
            "Legal",
            "Contract",
        ]),
        row([]),
        row([
            soa_core::sheet::HEADER_MARKER,
            "Title",
            "Control Objective",
            "Driver why control is required",
            "",
            "",
            "",
            "Is this Applicable?",
            "Date Last Assessed",
            "Why is this not applicable?",
        ]),
        row(["", "", "", "Business", "Risk", "Legal", "Contract", "", "", ""]),
        row([]),
        row(["5", "Organisational Controls"]),
    ];

    for c in records {
        let drivers = match c.is_applicable {
            Applicability::NotApplicable => Drivers::default(),
            Applicability::Applicable => c.drivers,
        };
        rows.push(row([
            c.control_number.as_str(),
            c.title.as_str(),
            c.objective.as_str(),
            yes_no(drivers.business),
            yes_no(drivers.risk),
            yes_no(drivers.legal),
            yes_no(drivers.contract),
            c.is_applicable.as_str(),
            c.date_last_assessed.as_str(),
            c.not_applicable_reason.as_str(),
        ]));
    }

    rows
}

/// Write rows as CSV. Rows may differ in length.
pub fn write_sheet(path: &Path, rows: &[Vec<String>]) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for r in rows {
        writer.write_record(r)?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    info!(path = %path.display(), rows = rows.len(), "wrote SoA sheet");
    Ok(())
}

/// `<company>_Statement_of_Applicability_ISO_27001_<YYYY-MM-DD>.csv`, with
/// every non-alphanumeric character of the company name replaced by `_`.
pub fn export_file_name(company: &str, date: NaiveDate) -> String {
    let company: String = company
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{company}_Statement_of_Applicability_ISO_27001_{}.csv",
        date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use soa_core::parse_control_sheet;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn records() -> Vec<ControlRecord> {
        vec![
            ControlRecord {
                control_number: "5.1".into(),
                title: "Policies for information security".into(),
                objective: "Information security policy and topic-specific policies shall be defined, approved by management, published".into(),
                drivers: Drivers {
                    business: true,
                    risk: true,
                    legal: false,
                    contract: true,
                },
                is_required: true,
                is_applicable: Applicability::Applicable,
                date_last_assessed: "03/14/2026".into(),
                not_applicable_reason: String::new(),
            },
            ControlRecord {
                control_number: "5.6".into(),
                title: "Contact with special interest groups".into(),
                objective: "Maintain contact with \"special interest\" groups".into(),
                drivers: Drivers {
                    business: true,
                    ..Drivers::default()
                },
                is_required: false,
                is_applicable: Applicability::NotApplicable,
                date_last_assessed: "03/14/2026".into(),
                not_applicable_reason: "Small team,\nno forums".into(),
            },
        ]
    }

    #[test]
    fn preamble_and_header_layout() {
        let mut meta = ExportMeta::new("Acme", date());
        meta.prepared_by = Some("Jane Doe, Engagement Lead".into());
        let rows = sheet_rows(&records(), &meta);

        assert_eq!(
            rows[0][1],
            "Acme : Statement of Applicability | ISO 27001:2022 Annex A"
        );
        assert_eq!(rows[4][5], "Jane Doe, Engagement Lead");
        assert_eq!(rows[4][6], "Name, title");
        assert_eq!(rows[4][7], "March 14, 2026");
        assert_eq!(rows[14][1], "ISO 27001 Annex A Control");
        assert_eq!(rows[17][1..3], ["5", "Organisational Controls"]);
        assert_eq!(rows.len(), 18 + 2);
    }

    #[test]
    fn not_applicable_exports_all_drivers_no() {
        let rows = sheet_rows(&records(), &ExportMeta::new("Acme", date()));
        assert_eq!(rows[18][4..8], ["Yes", "Yes", "No", "Yes"]);
        assert_eq!(rows[19][4..8], ["No", "No", "No", "No"]);
        assert_eq!(rows[19][8], "Not Applicable");
        assert_eq!(rows[19][10], "Small team,\nno forums");
    }

    #[test]
    fn exported_sheet_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(export_file_name("Acme", date()));
        write_sheet(&path, &sheet_rows(&records(), &ExportMeta::new("Acme", date()))).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed = parse_control_sheet(&text);
        let numbers: Vec<_> = parsed.iter().map(|c| c.control_number.as_str()).collect();
        assert_eq!(numbers, ["5.1", "5.6"]);
        assert_eq!(parsed[0], records()[0]);
        assert_eq!(parsed[1].objective, "Maintain contact with \"special interest\" groups");
        assert_eq!(parsed[1].not_applicable_reason, "Small team,\nno forums");
        assert_eq!(parsed[1].is_applicable, Applicability::NotApplicable);
    }

    #[test]
    fn file_name_sanitizes_company() {
        assert_eq!(
            export_file_name("Acme Corp, Inc.", date()),
            "Acme_Corp__Inc__Statement_of_Applicability_ISO_27001_2026-03-14.csv"
        );
    }
}
