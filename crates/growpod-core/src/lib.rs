//! # growpod-core
//!
//! Camera logic for the GrowPod camera.
//!
//! This crate provides:
//! - The persistent settings record and its fixed storage layout
//! - The settings store policy (version gate, defaults, erase-and-reinit)
//! - The sensor control façade (apply and read back a record)
//! - The capture façade (discard-then-capture, guaranteed frame release)
//! - [`CameraHub`], the single lock around all sensor and frame access
//! - WiFi channel congestion analysis
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets. The
//! hardware is reached only through the [`Camera`], [`Sensor`] and
//! [`BlobStore`] traits.

pub mod camera;
pub mod hub;
pub mod model;
pub mod sensor;
pub mod store;
pub mod survey;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use camera::{capture_fresh, Camera, CameraError, FrameBuffer, FrameData};
pub use hub::{CameraHub, StreamSession};
pub use model::*;
pub use sensor::{apply_to_sensor, read_from_sensor, ApplyReport, Control, Sensor, SensorStatus, SetOutcome, SetterError};
pub use store::{BlobStore, MemoryBlobStore, SettingsOrigin, SettingsStore, StoreError};
