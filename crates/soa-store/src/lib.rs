//! Storage layer: local JSON persistence of the register and SoA sheet export.

mod error;
pub use error::StoreError;

pub mod export;
pub mod local;

pub use export::{ExportMeta, export_file_name, sheet_rows, write_sheet};
pub use local::{LocalStore, StoredApiConfig};
