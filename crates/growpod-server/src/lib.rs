//! # growpod-server
//!
//! Request handling for the GrowPod camera.
//!
//! [`CameraApp`] owns the [`CameraHub`](growpod_core::CameraHub) and turns
//! each route into either a complete [`Response`] or, for `/stream`, an
//! [`MjpegStream`] that writes parts into a [`PartSink`]. Nothing here knows
//! about a particular HTTP server: the ESP32 firmware adapts it to
//! `EspHttpServer`, the host simulator to axum.

pub mod app;
pub mod response;
pub mod stream;

pub use app::{CameraApp, DeviceInfo, Jpeg, CAPTURE_FAILED, CAPTURE_HEADERS};
pub use response::{status_reason, Response};
pub use stream::{write_part, MjpegStream, PartSink, StreamEnd, StreamSummary, FRAME_INTERVAL};
