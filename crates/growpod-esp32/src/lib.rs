//! ESP32-S3 components for the GrowPod camera.
//!
//! This crate binds the platform-agnostic camera logic to ESP-IDF:
//! - `camera`: the esp32-camera driver behind the `Camera`/`Sensor` traits
//! - `nvs`: NVS flash as a `BlobStore` for the settings record
//! - `wifi`: station connection and the channel congestion survey
//! - `mdns`: `growpod-camera.local` announcement
//! - `http`: the route table on `EspHttpServer`
//!
//! # Example
//!
//! ```ignore
//! use growpod_esp32::camera::EspCamera;
//! use growpod_esp32::nvs::NvsBlobStore;
//!
//! let mut store = SettingsStore::new(NvsBlobStore::new());
//! store.init()?;
//! let camera = EspCamera::init(&CameraConfig::default())?;
//! ```

pub mod camera;
pub mod config;
pub mod http;
pub mod mdns;
pub mod nvs;
pub mod wifi;
