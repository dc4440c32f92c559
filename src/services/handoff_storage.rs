//! Per-session JSON blobs that survive the round trip through the hosted
//! payment page, keyed the same way the browser's local storage was.
//!
//! Blobs are written inside a `{ schemaVersion, savedAt, data }` wrapper. Reads
//! are defensive: unreadable files, unknown schema versions and shapes that do
//! not decode read as absent, and unwrapped legacy blobs are still accepted.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use chrono::{DateTime, Utc};
use log::warn;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    envelope::{as_list, unwrap_envelopes},
    traveler::Traveler,
};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    PendingPayment,
    PendingTravelers,
    TravelersData,
    ReservationData,
    User,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::PendingPayment => "pendingPayment",
            StorageKey::PendingTravelers => "pendingTravelers",
            StorageKey::TravelersData => "travelersData",
            StorageKey::ReservationData => "reservationData",
            StorageKey::User => "user",
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    InvalidSession(String),
    IoError(String),
    SerializeError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::InvalidSession(id) => write!(f, "Invalid session id `{}`", id),
            StorageError::IoError(err) => write!(f, "Storage IO error: {}", err),
            StorageError::SerializeError(err) => write!(f, "Storage serialize error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredBlob<'a, T> {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlob {
    schema_version: u32,
    data: Value,
}

/// Session ids come from the browser and end up in file paths.
pub fn valid_session_id(session_id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid session id pattern"))
        .is_match(session_id)
}

pub struct HandoffStorage {
    root: PathBuf,
}

impl HandoffStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        if !valid_session_id(session_id) {
            return Err(StorageError::InvalidSession(session_id.to_string()));
        }
        Ok(self.root.join(session_id))
    }

    fn path(&self, session_id: &str, key: StorageKey) -> Result<PathBuf, StorageError> {
        Ok(self
            .session_dir(session_id)?
            .join(format!("{}.json", key.as_str())))
    }

    pub fn write<T: Serialize>(
        &self,
        session_id: &str,
        key: StorageKey,
        value: &T,
    ) -> Result<(), StorageError> {
        let path = self.path(session_id, key)?;
        let blob = StoredBlob {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            data: value,
        };
        let json =
            serde_json::to_vec(&blob).map_err(|e| StorageError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }
        // One temp file per write
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, json).map_err(|e| StorageError::IoError(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::IoError(e.to_string()))
    }

    /// Stores a raw value without the version wrapper, the way older clients did.
    pub fn write_legacy(
        &self,
        session_id: &str,
        key: StorageKey,
        value: &Value,
    ) -> Result<(), StorageError> {
        let path = self.path(session_id, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }
        fs::write(&path, value.to_string()).map_err(|e| StorageError::IoError(e.to_string()))
    }

    fn read_value(&self, session_id: &str, key: StorageKey) -> Option<Value> {
        let path = match self.path(session_id, key) {
            Ok(path) => path,
            Err(err) => {
                warn!("{}", err);
                return None;
            }
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Could not read {} for session {}: {}", key.as_str(), session_id, err);
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("Discarding malformed {} for session {}: {}", key.as_str(), session_id, err);
                return None;
            }
        };

        let is_wrapped = value.get("schemaVersion").is_some() && value.get("data").is_some();
        if !is_wrapped {
            return Some(unwrap_envelopes(value));
        }

        match serde_json::from_value::<RawBlob>(value) {
            Ok(blob) if blob.schema_version <= SCHEMA_VERSION => Some(unwrap_envelopes(blob.data)),
            Ok(blob) => {
                warn!(
                    "Ignoring {} for session {} with unknown schema version {}",
                    key.as_str(),
                    session_id,
                    blob.schema_version
                );
                None
            }
            Err(err) => {
                warn!("Discarding malformed {} for session {}: {}", key.as_str(), session_id, err);
                None
            }
        }
    }

    pub fn read<T: DeserializeOwned>(&self, session_id: &str, key: StorageKey) -> Option<T> {
        let value = self.read_value(session_id, key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!("Unexpected {} shape for session {}: {}", key.as_str(), session_id, err);
                None
            }
        }
    }

    /// Traveler lists have been stored bare, `$values`-wrapped and as `{ travelers: [...] }`.
    pub fn read_travelers(&self, session_id: &str, key: StorageKey) -> Option<Vec<Traveler>> {
        let items = match as_list(self.read_value(session_id, key)?) {
            Some(items) => items,
            None => {
                warn!("Unexpected {} shape for session {}", key.as_str(), session_id);
                return None;
            }
        };

        items
            .into_iter()
            .map(serde_json::from_value::<Traveler>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                warn!("Unreadable traveler in {} for session {}: {}", key.as_str(), session_id, err)
            })
            .ok()
    }

    pub fn remove(&self, session_id: &str, key: StorageKey) {
        let path = match self.path(session_id, key) {
            Ok(path) => path,
            Err(_) => return,
        };
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != ErrorKind::NotFound {
                warn!("Could not remove {} for session {}: {}", key.as_str(), session_id, err);
            }
        }
    }

    pub fn clear(&self, session_id: &str, keys: &[StorageKey]) {
        for key in keys {
            self.remove(session_id, *key);
        }
    }
}
