//! Core types for the Statement of Applicability: control records, sheet parsing, API DTOs.

pub mod api;
pub mod control;
pub mod control_number;
pub mod sheet;

pub use api::ContextEntry;
pub use control::{
    Applicability, AssessmentResult, ControlEdit, ControlError, ControlRecord, ControlRef,
    ControlStats, Drivers, apply_assessments, assessment_date,
};
pub use control_number::{sort_controls, sort_key};
pub use sheet::{
    SheetError, SheetReport, SkipReason, load_control_sheet, parse_control_sheet,
    parse_control_sheet_report,
};
