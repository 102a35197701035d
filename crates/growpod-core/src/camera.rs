//! Capture façade.
//!
//! Frames come from a fixed-size pool owned by the camera driver. A
//! [`FrameBuffer`] hands the frame back to the pool when it is dropped, so a
//! frame is released exactly once on every exit path.

use crate::sensor::{Control, Sensor, SetterError};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by camera and sensor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The camera subsystem has no active sensor handle.
    #[error("camera sensor unavailable")]
    SensorUnavailable,

    /// The frame pool yielded no buffer.
    #[error("frame capture failed")]
    CaptureFailed,

    /// The sensor model has no setter for this control.
    #[error("sensor has no {0} setter")]
    Unsupported(Control),

    /// A setter returned a non-zero driver code.
    #[error("{control} setter returned {code}")]
    SetterFailed { control: Control, code: i32 },

    /// The sensor reported a frame size code this build does not know.
    #[error("sensor reported unknown frame size code {0}")]
    UnknownFrameSize(u8),
}

impl From<SetterError> for CameraError {
    fn from(err: SetterError) -> Self {
        match err {
            SetterError::Unsupported(control) => CameraError::Unsupported(control),
            SetterError::Rejected { control, code } => CameraError::SetterFailed { control, code },
        }
    }
}

/// Read access to an acquired frame.
pub trait FrameData {
    /// Encoded image bytes.
    fn data(&self) -> &[u8];
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// The camera subsystem: a sensor handle plus a frame pool.
pub trait Camera {
    type Sensor: Sensor;
    type Frame: FrameData;

    /// The active sensor, `None` when the camera is not initialized.
    fn sensor(&mut self) -> Option<&mut Self::Sensor>;

    /// Acquire the next frame from the pool.
    fn frame_get(&mut self) -> Option<Self::Frame>;

    /// Return a frame to the pool.
    fn frame_return(&mut self, frame: Self::Frame);
}

/// Exclusively-owned frame that returns itself to the pool on drop.
pub struct FrameBuffer<'a, C: Camera> {
    camera: &'a mut C,
    frame: Option<C::Frame>,
}

impl<'a, C: Camera> FrameBuffer<'a, C> {
    /// Acquire one frame.
    pub fn acquire(camera: &'a mut C) -> Result<Self, CameraError> {
        let frame = camera.frame_get().ok_or(CameraError::CaptureFailed)?;
        Ok(Self {
            camera,
            frame: Some(frame),
        })
    }

    /// The frame, present until drop.
    pub fn frame(&self) -> &C::Frame {
        match &self.frame {
            Some(frame) => frame,
            None => unreachable!("frame is only taken in drop"),
        }
    }

    pub fn data(&self) -> &[u8] {
        self.frame().data()
    }

    pub fn len(&self) -> usize {
        self.frame().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame().is_empty()
    }

    pub fn width(&self) -> usize {
        self.frame().width()
    }

    pub fn height(&self) -> usize {
        self.frame().height()
    }
}

impl<C: Camera> Drop for FrameBuffer<'_, C> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.camera.frame_return(frame);
        }
    }
}

/// Acquire and drop one frame, then acquire the frame that is returned.
///
/// The driver queue may still hold a frame captured before the latest
/// settings change; throwing it away bounds staleness to one frame interval.
pub fn capture_fresh<C: Camera>(camera: &mut C) -> Result<FrameBuffer<'_, C>, CameraError> {
    match camera.frame_get() {
        Some(stale) => camera.frame_return(stale),
        None => {
            debug!("Camera returned no frame to discard");
            return Err(CameraError::CaptureFailed);
        }
    }
    FrameBuffer::acquire(camera)
}
