//! NVS (Non-Volatile Storage) backend for the settings record.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::{
    esp, esp_err_t, nvs_flash_erase, nvs_flash_init, EspError, ESP_ERR_NVS_NEW_VERSION_FOUND,
    ESP_ERR_NVS_NO_FREE_PAGES,
};
use growpod_core::{BlobStore, StoreError};
use log::debug;

/// Settings blobs in the default NVS partition.
///
/// The partition handle is taken on [`BlobStore::open`] and shared with the
/// WiFi driver afterwards.
#[derive(Default)]
pub struct NvsBlobStore {
    partition: Option<EspDefaultNvsPartition>,
}

impl NvsBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The opened default partition, for other NVS users.
    pub fn partition(&self) -> Option<EspDefaultNvsPartition> {
        self.partition.clone()
    }

    fn handle(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, StoreError> {
        let partition = self
            .partition
            .clone()
            .ok_or_else(|| StoreError::Backend("NVS not initialized".to_string()))?;
        EspNvs::new(partition, namespace, true).map_err(backend)
    }
}

fn backend(e: EspError) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl BlobStore for NvsBlobStore {
    fn open(&mut self) -> Result<(), StoreError> {
        if let Err(e) = esp!(unsafe { nvs_flash_init() }) {
            let code = e.code();
            if code == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || code == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                return Err(StoreError::IncompatibleFormat(e.to_string()));
            }
            return Err(backend(e));
        }

        self.partition = Some(EspDefaultNvsPartition::take().map_err(backend)?);
        debug!("NVS partition opened");
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.partition = None;
        esp!(unsafe { nvs_flash_erase() }).map_err(backend)
    }

    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let nvs = self.handle(namespace)?;
        let Some(len) = nvs.blob_len(key).map_err(backend)? else {
            return Ok(None);
        };

        let mut buf = vec![0u8; len];
        let blob = nvs.get_blob(key, &mut buf).map_err(backend)?;
        Ok(blob.map(<[u8]>::to_vec))
    }

    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut nvs = self.handle(namespace)?;
        nvs.set_blob(key, bytes).map_err(backend)
    }
}
