//! File-backed key/value store for the control register and API credentials.
//!
//! Each key is one pretty-printed JSON document `<dir>/<key>.json`. Writes go
//! to a temporary file in the same directory and are renamed into place, so a
//! crash never leaves a half-written register behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use soa_core::{ControlEdit, ControlError, ControlRecord};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

pub const CONTROLS_KEY: &str = "iso27001Controls";
pub const API_CONFIG_KEY: &str = "customApiConfig";

/// Compliance API credentials saved by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredApiConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        debug!(dir = %dir.display(), "opened local store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Json {
                key: key.to_string(),
                source,
            })
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        let path = self.path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(&json)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Saved register, or `None` if nothing has been saved yet.
    pub fn load_controls(&self) -> Result<Option<Vec<ControlRecord>>, StoreError> {
        self.read(CONTROLS_KEY)
    }

    pub fn save_controls(&self, records: &[ControlRecord]) -> Result<(), StoreError> {
        self.write(CONTROLS_KEY, records)?;
        info!(count = records.len(), "saved controls");
        Ok(())
    }

    pub fn clear_controls(&self) -> Result<(), StoreError> {
        self.remove(CONTROLS_KEY)?;
        info!("cleared saved controls");
        Ok(())
    }

    /// Apply `edit` to the record numbered `number` and persist the whole register.
    ///
    /// Nothing is written when the edit is rejected.
    pub fn save_control_edit(
        &self,
        records: &mut [ControlRecord],
        number: &str,
        edit: &ControlEdit,
        date: &str,
    ) -> Result<(), StoreError> {
        let record = records
            .iter_mut()
            .find(|r| r.control_number == number)
            .ok_or_else(|| ControlError::UnknownControl(number.to_string()))?;
        record.apply_edit(edit, date)?;
        self.save_controls(records)
    }

    pub fn load_api_config(&self) -> Result<Option<StoredApiConfig>, StoreError> {
        self.read(API_CONFIG_KEY)
    }

    pub fn save_api_config(&self, config: &StoredApiConfig) -> Result<(), StoreError> {
        self.write(API_CONFIG_KEY, config)
    }

    pub fn clear_api_config(&self) -> Result<(), StoreError> {
        self.remove(API_CONFIG_KEY)
    }
}
