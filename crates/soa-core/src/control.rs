//! Statement of Applicability control records.
//!
//! A [`ControlRecord`] is one row of the compliance register. Records are
//! built by the sheet parser, then updated by assessment runs
//! ([`ControlRecord::apply_assessment`]) and user edits
//! ([`ControlRecord::apply_edit`]). All three paths keep the same invariant:
//! a control that is not required is never `Applicable`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a control is in scope for the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Applicability {
    #[serde(rename = "Applicable")]
    Applicable,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl Applicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applicable => "Applicable",
            Self::NotApplicable => "Not Applicable",
        }
    }

    /// `Applicable` when required, `NotApplicable` otherwise.
    pub fn from_required(is_required: bool) -> Self {
        if is_required {
            Self::Applicable
        } else {
            Self::NotApplicable
        }
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four reasons a control might be required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drivers {
    pub business: bool,
    pub risk: bool,
    pub legal: bool,
    pub contract: bool,
}

/// Control numbers treated as legally driven when a stored record predates drivers.
const LEGACY_LEGAL_PREFIXES: &[&str] = &["5.31", "5.32", "5.34"];

impl Drivers {
    /// True if any driver is set.
    pub fn any(&self) -> bool {
        self.business || self.risk || self.legal || self.contract
    }

    /// Drivers assumed for stored records written before drivers were tracked.
    pub fn legacy_default(control_number: &str) -> Self {
        Self {
            business: true,
            risk: true,
            legal: LEGACY_LEGAL_PREFIXES
                .iter()
                .any(|p| control_number.starts_with(p)),
            contract: false,
        }
    }
}

/// One ISO 27001 Annex A control in the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredControl")]
pub struct ControlRecord {
    pub control_number: String,
    pub title: String,
    pub objective: String,
    pub drivers: Drivers,
    pub is_required: bool,
    pub is_applicable: Applicability,
    /// Free-form date string, empty when never assessed.
    pub date_last_assessed: String,
    pub not_applicable_reason: String,
}

/// Serialized shape accepted when loading records, including legacy
/// records that have no `drivers` object.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredControl {
    control_number: String,
    title: String,
    objective: String,
    drivers: Option<Drivers>,
    is_required: bool,
    is_applicable: Applicability,
    #[serde(default)]
    date_last_assessed: String,
    #[serde(default)]
    not_applicable_reason: String,
}

impl From<StoredControl> for ControlRecord {
    fn from(s: StoredControl) -> Self {
        let drivers = s
            .drivers
            .unwrap_or_else(|| Drivers::legacy_default(&s.control_number));
        Self {
            control_number: s.control_number,
            title: s.title,
            objective: s.objective,
            drivers,
            is_required: s.is_required,
            is_applicable: s.is_applicable,
            date_last_assessed: s.date_last_assessed,
            not_applicable_reason: s.not_applicable_reason,
        }
    }
}

/// The identifying subset of a control sent to the model for assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRef {
    pub control_number: String,
    pub title: String,
    pub objective: String,
}

impl From<&ControlRecord> for ControlRef {
    fn from(c: &ControlRecord) -> Self {
        Self {
            control_number: c.control_number.clone(),
            title: c.title.clone(),
            objective: c.objective.clone(),
        }
    }
}

/// One model verdict for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub control_number: String,
    pub is_required: bool,
    /// Only present when `is_required` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AssessmentResult {
    /// The fail-open verdict: required, no reason.
    pub fn required(control_number: impl Into<String>) -> Self {
        Self {
            control_number: control_number.into(),
            is_required: true,
            reason: None,
        }
    }
}

/// A user edit of the applicability fields of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEdit {
    pub is_applicable: Applicability,
    pub not_applicable_reason: String,
    pub is_required: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("control {0} is marked Not Applicable but has no reason")]
    MissingReason(String),
    #[error("no control numbered {0}")]
    UnknownControl(String),
}

impl ControlRecord {
    /// Apply a model verdict. Only applicability fields change; title,
    /// objective and drivers are left as parsed.
    pub fn apply_assessment(&mut self, result: &AssessmentResult, date: &str) {
        self.is_required = result.is_required;
        self.is_applicable = Applicability::from_required(result.is_required);
        self.not_applicable_reason = if result.is_required {
            String::new()
        } else {
            result
                .reason
                .clone()
                .unwrap_or_else(|| self.not_applicable_reason.clone())
        };
        self.date_last_assessed = date.to_string();
    }

    /// Apply a user edit.
    ///
    /// A `NotApplicable` control must carry a non-blank reason. An edit that
    /// clears `is_required` forces `NotApplicable`.
    pub fn apply_edit(&mut self, edit: &ControlEdit, date: &str) -> Result<(), ControlError> {
        let is_applicable = if edit.is_required {
            edit.is_applicable
        } else {
            Applicability::NotApplicable
        };
        if is_applicable == Applicability::NotApplicable
            && edit.not_applicable_reason.trim().is_empty()
        {
            return Err(ControlError::MissingReason(self.control_number.clone()));
        }

        self.is_required = edit.is_required;
        self.is_applicable = is_applicable;
        self.not_applicable_reason = edit.not_applicable_reason.clone();
        self.date_last_assessed = date.to_string();
        Ok(())
    }
}

/// Apply each result to the record with the same control number.
///
/// Returns the number of records updated. Results for unknown controls are ignored.
pub fn apply_assessments(
    records: &mut [ControlRecord],
    results: &[AssessmentResult],
    date: &str,
) -> usize {
    let mut applied = 0;
    for record in records.iter_mut() {
        if let Some(result) = results
            .iter()
            .find(|r| r.control_number == record.control_number)
        {
            record.apply_assessment(result, date);
            applied += 1;
        }
    }
    applied
}

/// Format a date the way assessment stamps are written into the register (`MM/DD/YYYY`).
pub fn assessment_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Applicability counts over a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ControlStats {
    pub total: usize,
    pub applicable: usize,
    pub not_applicable: usize,
    pub applicable_percentage: u32,
    pub not_applicable_percentage: u32,
}

impl ControlStats {
    pub fn from_records(records: &[ControlRecord]) -> Self {
        let total = records.len();
        let applicable = records
            .iter()
            .filter(|c| c.is_applicable == Applicability::Applicable)
            .count();
        let not_applicable = total - applicable;

        Self {
            total,
            applicable,
            not_applicable,
            applicable_percentage: percentage(applicable, total),
            not_applicable_percentage: percentage(not_applicable, total),
        }
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}
