//! Durable key-value storage for the cart.
//!
//! The cart is persisted as one JSON blob under a single key, wrapped in a
//! versioned envelope:
//!
//! ```json
//! {"state":{"items":[{"id":1,"name":"Hammer","price":10,"quantity":2}]},"version":0}
//! ```
//!
//! Two backends are provided:
//! - [`MemoryStorage`] - process-local map; clones share the same map
//! - [`FileStorage`] - one `<key>.json` file per key in a directory

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::line_item::CartState;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "cart-storage";

/// Envelope version written by this crate.
pub const STORAGE_VERSION: u32 = 0;

/// Errors from reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported cart version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string key-value store scoped to one user agent or origin.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a CartState,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: CartState,
    #[serde(default)]
    version: u32,
}

/// Serialize cart state into the persisted envelope.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the state cannot be encoded.
pub fn encode_state(state: &CartState) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&EnvelopeRef {
        state,
        version: STORAGE_VERSION,
    })?)
}

/// Parse a persisted envelope back into cart state.
///
/// The result is normalized, so a hand-edited blob cannot smuggle in a
/// zero quantity or a duplicate id.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::UnsupportedVersion` for envelopes from a newer release.
pub fn decode_state(blob: &str) -> Result<CartState, StorageError> {
    let envelope: Envelope = serde_json::from_str(blob)?;
    if envelope.version > STORAGE_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: envelope.version,
            supported: STORAGE_VERSION,
        });
    }
    Ok(envelope.state.normalized())
}

// =============================================================================
// In-memory backend
// =============================================================================

/// In-memory storage.
///
/// Cloning yields another handle onto the same map, which is how tests model
/// two browser tabs sharing one origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// File-backed storage: each key is a `<key>.json` file in `dir`.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the stored files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
