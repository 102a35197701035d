//! Directory-backed blob storage.
//!
//! Layout: `<root>/FORMAT` holds the layout marker, each blob lives at
//! `<root>/<namespace>/<key>.bin`.

use growpod_core::{BlobStore, StoreError};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

const FORMAT_FILE: &str = "FORMAT";
const FORMAT_MARKER: &str = "growpod-blobs-1";

pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{}.bin", key))
    }
}

fn backend(e: io::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl BlobStore for FileBlobStore {
    fn open(&mut self) -> Result<(), StoreError> {
        let marker_path = self.root.join(FORMAT_FILE);
        match fs::read_to_string(&marker_path) {
            Ok(marker) if marker.trim() == FORMAT_MARKER => Ok(()),
            Ok(marker) => Err(StoreError::IncompatibleFormat(format!(
                "{} contains '{}'",
                marker_path.display(),
                marker.trim()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).map_err(backend)?;
                fs::write(&marker_path, FORMAT_MARKER).map_err(backend)?;
                debug!("Initialized blob store at {}", self.root.display());
                Ok(())
            }
            Err(e) => Err(backend(e)),
        }
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }

    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.blob_path(namespace, key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend(e)),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(namespace, key);
        fs::create_dir_all(self.root.join(namespace)).map_err(backend)?;

        // Write then rename so a crash never leaves a torn record.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(backend)?;
        fs::rename(&tmp, &path).map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use growpod_core::{CameraSettings, FrameSize, SettingsOrigin, SettingsStore};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("growpod-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_settings_persist_across_restarts() {
        let dir = scratch_dir();

        let mut store = SettingsStore::new(FileBlobStore::new(&dir));
        store.init().unwrap();
        let (_, origin) = store.load_or_default();
        assert!(matches!(origin, SettingsOrigin::Defaulted(_)));

        let settings = CameraSettings {
            frame_size: FrameSize::Uxga,
            quality: 10,
            ..CameraSettings::defaults()
        };
        store.save(&settings).unwrap();

        let mut reopened = SettingsStore::new(FileBlobStore::new(&dir));
        reopened.init().unwrap();
        assert_eq!(reopened.load_or_default(), (settings, SettingsOrigin::Stored));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_incompatible_marker_is_erased() {
        let dir = scratch_dir();
        fs::create_dir_all(dir.join("camera")).unwrap();
        fs::write(dir.join(FORMAT_FILE), "something-else").unwrap();
        fs::write(dir.join("camera").join("settings.bin"), [9u8; 16]).unwrap();

        let mut store = SettingsStore::new(FileBlobStore::new(&dir));
        store.init().unwrap();
        assert_eq!(store.load(), Err(StoreError::NotFound));
        assert_eq!(
            fs::read_to_string(dir.join(FORMAT_FILE)).unwrap(),
            FORMAT_MARKER
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_missing_key() {
        let dir = scratch_dir();
        let mut store = FileBlobStore::new(&dir);
        store.open().unwrap();
        assert_eq!(store.read("camera", "settings"), Ok(None));
        fs::remove_dir_all(&dir).unwrap();
    }
}
