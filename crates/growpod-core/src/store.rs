//! Persistent settings store.
//!
//! The settings record lives as one opaque blob under a constant key in a
//! constant namespace of a platform key-value store:
//! - ESP32: NVS flash (`NvsBlobStore` in `growpod-esp32`)
//! - Linux: a file per key (`FileBlobStore` in the host simulator)
//! - Tests: [`MemoryBlobStore`]
//!
//! [`SettingsStore`] layers the version gate and the default-value policy on
//! top of any [`BlobStore`].

use crate::model::{CameraSettings, SettingsError};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Namespace holding the camera settings.
pub const SETTINGS_NAMESPACE: &str = "camera";

/// Key of the settings blob inside [`SETTINGS_NAMESPACE`].
pub const SETTINGS_KEY: &str = "settings";

/// Errors that can occur during settings storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record is stored under the settings key.
    #[error("no settings stored")]
    NotFound,

    /// A record exists but was written by another schema version.
    #[error("stored settings version {stored} does not match expected {expected}")]
    VersionMismatch { stored: u8, expected: u8 },

    /// The stored blob could not be decoded.
    #[error("stored settings are corrupt: {0}")]
    Corrupt(String),

    /// The backing storage uses a layout this build cannot open.
    #[error("incompatible storage format: {0}")]
    IncompatibleFormat(String),

    /// The backing storage failed.
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<SettingsError> for StoreError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::VersionMismatch { stored, expected } => {
                StoreError::VersionMismatch { stored, expected }
            }
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

/// Raw key-value blob storage.
///
/// All methods are synchronous to support embedded platforms.
pub trait BlobStore: Send {
    /// Prepare the storage for use.
    ///
    /// Returns [`StoreError::IncompatibleFormat`] when the storage must be
    /// erased before it can be opened.
    fn open(&mut self) -> Result<(), StoreError>;

    /// Erase every stored key.
    fn erase(&mut self) -> Result<(), StoreError>;

    /// Read a blob, `Ok(None)` when the key does not exist.
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite a blob and commit it.
    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

// ============================================================================
// Settings Store
// ============================================================================

/// Why defaults were used instead of a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOrigin {
    /// The stored record was valid.
    Stored,
    /// The stored record was unusable; defaults were applied.
    Defaulted(StoreError),
}

/// Versioned settings persistence over a [`BlobStore`].
pub struct SettingsStore<B: BlobStore> {
    backend: B,
    opened: bool,
}

impl<B: BlobStore> SettingsStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            opened: false,
        }
    }

    /// Prepare the underlying storage.
    ///
    /// An incompatible storage format is erased and opened exactly once more;
    /// a failure of that second attempt is returned. Calling `init` again
    /// after success is a no-op.
    pub fn init(&mut self) -> Result<(), StoreError> {
        if self.opened {
            return Ok(());
        }

        match self.backend.open() {
            Ok(()) => {}
            Err(StoreError::IncompatibleFormat(reason)) => {
                warn!("Settings storage needs erase ({}), reinitializing", reason);
                self.backend.erase()?;
                self.backend.open()?;
            }
            Err(e) => return Err(e),
        }

        self.opened = true;
        debug!("Settings storage ready");
        Ok(())
    }

    /// Load the stored record.
    pub fn load(&self) -> Result<CameraSettings, StoreError> {
        let bytes = self
            .backend
            .read(SETTINGS_NAMESPACE, SETTINGS_KEY)?
            .ok_or(StoreError::NotFound)?;
        Ok(CameraSettings::decode(&bytes)?)
    }

    /// Overwrite the stored record.
    pub fn save(&mut self, settings: &CameraSettings) -> Result<(), StoreError> {
        settings
            .validate()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.backend
            .write(SETTINGS_NAMESPACE, SETTINGS_KEY, &settings.encode())?;
        info!("Camera settings saved");
        Ok(())
    }

    /// Factory configuration.
    pub fn defaults(&self) -> CameraSettings {
        CameraSettings::defaults()
    }

    /// Start-up policy: the stored record, or defaults written back once.
    ///
    /// A missing record and a version mismatch are handled the same way; the
    /// reason is only kept for diagnostics. A failed save is logged and not
    /// retried.
    pub fn load_or_default(&mut self) -> (CameraSettings, SettingsOrigin) {
        match self.load() {
            Ok(settings) => {
                info!("Loaded camera settings from storage");
                (settings, SettingsOrigin::Stored)
            }
            Err(reason) => {
                info!("Using default camera settings ({})", reason);
                let settings = self.defaults();
                if let Err(e) = self.save(&settings) {
                    warn!("Failed to save default camera settings: {}", e);
                }
                (settings, SettingsOrigin::Defaulted(reason))
            }
        }
    }

    /// Access the storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory blob storage for tests and ephemeral setups.
///
/// Failure injection flags let tests drive the erase-and-reinit path.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(String, String), Vec<u8>>>,
    /// Number of upcoming `open` calls that report an incompatible format.
    pub incompatible_opens: usize,
    /// When set, every write fails.
    pub fail_writes: bool,
    /// Calls to `erase` so far.
    pub erase_count: usize,
    /// Successful writes so far.
    pub write_count: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes directly, bypassing the settings codec.
    pub fn insert_raw(&self, namespace: &str, key: &str, bytes: &[u8]) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert((namespace.to_string(), key.to_string()), bytes.to_vec());
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn open(&mut self) -> Result<(), StoreError> {
        if self.incompatible_opens > 0 {
            self.incompatible_opens -= 1;
            return Err(StoreError::IncompatibleFormat("no free pages".to_string()));
        }
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.erase_count += 1;
        self.blobs
            .lock()
            .map_err(|_| StoreError::Backend("store is locked".to_string()))?
            .clear();
        Ok(())
    }

    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Backend("store is locked".to_string()))?;
        Ok(blobs
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.blobs
            .lock()
            .map_err(|_| StoreError::Backend("store is locked".to_string()))?
            .insert((namespace.to_string(), key.to_string()), bytes.to_vec());
        self.write_count += 1;
        Ok(())
    }
}
