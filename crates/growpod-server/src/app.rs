//! Request handlers shared by the ESP32 firmware and the host simulator.

use crate::response::Response;
use crate::stream::{MjpegStream, FRAME_INTERVAL};
use growpod_core::{Camera, CameraHub, FrameSize};
use growpod_protocol::messages::{ControlRequest, StatusReport, StreamRequest};
use growpod_protocol::pages::{HOME_PAGE, PREVIEW_PAGE, SETTINGS_PAGE};
use growpod_protocol::routes::{Route, CONTENT_TYPE_JPEG};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Body of a failed `/capture`.
pub const CAPTURE_FAILED: &str = "Failed to capture image";

/// Headers of a successful `/capture`, besides `Content-Type`.
pub const CAPTURE_HEADERS: [(&str, &str); 1] = [("Content-Disposition", "inline; filename=capture.jpg")];

/// Fixed facts about the device, reported by `/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Still-capture resolution the camera was configured with.
    pub frame_size: FrameSize,
    /// External PSRAM present.
    pub psram: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::MAX_SUPPORTED,
            psram: true,
        }
    }
}

/// A captured JPEG, borrowed from the frame pool.
#[derive(Debug, Clone, Copy)]
pub struct Jpeg<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
}

/// The camera application: shared hub plus the route handlers.
pub struct CameraApp<C: Camera> {
    hub: CameraHub<C>,
    device: DeviceInfo,
    frame_interval: Duration,
}

impl<C: Camera> CameraApp<C> {
    pub fn new(hub: CameraHub<C>, device: DeviceInfo) -> Self {
        Self {
            hub,
            device,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Override the pause between stream frames.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn hub(&self) -> &CameraHub<C> {
        &self.hub
    }

    pub fn device(&self) -> DeviceInfo {
        self.device
    }

    /// Handle any route that produces a complete response.
    ///
    /// Returns `None` for [`Route::Stream`], which must be opened with
    /// [`CameraApp::open_stream`] and run against the response body.
    pub fn handle(&self, route: Route, query: &str) -> Option<Response> {
        let response = match route {
            Route::Home => Response::html(HOME_PAGE),
            Route::Preview => Response::html(PREVIEW_PAGE),
            Route::Settings => Response::html(SETTINGS_PAGE),
            Route::Status => self.status(),
            Route::Control => self.control(query),
            Route::Capture => self.capture(),
            Route::Favicon => Response::no_content(),
            Route::Stream => return None,
        };
        Some(response)
    }

    // ========================================================================
    // /status
    // ========================================================================

    /// The status document. Live exposure values are included when the
    /// sensor can be read.
    pub fn status_report(&self) -> StatusReport {
        let model = self.hub.sensor_model().unwrap_or("unknown");
        let report = StatusReport::new(model, self.device.frame_size, self.device.psram);
        match self.hub.read_settings() {
            Ok(settings) => report.with_exposure(&settings),
            Err(e) => {
                debug!("Sensor not readable for status: {}", e);
                report
            }
        }
    }

    pub fn status(&self) -> Response {
        match self.status_report().to_json() {
            Ok(json) => Response::json(json),
            Err(e) => {
                error!("Failed to serialize status: {}", e);
                Response::internal_error("Failed to build status")
            }
        }
    }

    // ========================================================================
    // /control
    // ========================================================================

    /// Set one exposure or gain control from `var` / `val` query parameters.
    pub fn control(&self, query: &str) -> Response {
        let request = match ControlRequest::from_query(query) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected control request '{}': {}", query, e);
                return Response::text(e.status_code(), e.to_string());
            }
        };

        let control = request.var.control();
        match self.hub.set_control(control, request.value) {
            Ok(()) => {
                info!("Set {} = {}", request.var.as_str(), request.value);
                Response::ok()
            }
            Err(e) => {
                warn!("Failed to set {} = {}: {}", request.var.as_str(), request.value, e);
                Response::internal_error(e.to_string())
            }
        }
    }

    // ========================================================================
    // /capture
    // ========================================================================

    /// Take a fresh full-resolution frame and hand it to `deliver`.
    ///
    /// `deliver` receives either the JPEG, borrowed from the frame pool for
    /// the duration of the call, or the error response to send instead.
    pub fn capture_with<R>(&self, deliver: impl FnOnce(Result<Jpeg<'_>, Response>) -> R) -> R {
        info!("Image capture requested");
        let started = Instant::now();

        self.hub.capture(|frame| match frame {
            Ok(frame) => {
                info!(
                    "Image captured: {} bytes, {}x{} ({} ms)",
                    frame.len(),
                    frame.width(),
                    frame.height(),
                    started.elapsed().as_millis()
                );
                deliver(Ok(Jpeg {
                    data: frame.data(),
                    width: frame.width(),
                    height: frame.height(),
                }))
            }
            Err(e) => {
                error!("Capture failed: {}", e);
                deliver(Err(Response::internal_error(CAPTURE_FAILED)))
            }
        })
    }

    /// Capture into an owned response.
    pub fn capture(&self) -> Response {
        self.capture_with(|jpeg| match jpeg {
            Ok(jpeg) => {
                let mut response = Response::new(200, Some(CONTENT_TYPE_JPEG), jpeg.data.to_vec());
                for (name, value) in CAPTURE_HEADERS {
                    response = response.with_header(name, value);
                }
                response
            }
            Err(response) => response,
        })
    }

    // ========================================================================
    // /stream
    // ========================================================================

    /// Switch the sensor to streaming parameters.
    ///
    /// On success the caller sends the stream headers and then runs the
    /// returned stream against the response body. On failure the returned
    /// response is sent instead and nothing was changed.
    pub fn open_stream(&self, query: &str) -> Result<MjpegStream<'_, C>, Response> {
        let request = StreamRequest::from_query(query);
        match self.hub.begin_stream(request.quality) {
            Ok(session) => Ok(MjpegStream::new(session, request.quality, self.frame_interval)),
            Err(e) => {
                error!("Failed to start stream: {}", e);
                Err(Response::internal_error(e.to_string()))
            }
        }
    }
}
