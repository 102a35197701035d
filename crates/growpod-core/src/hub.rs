//! Shared access to the camera.
//!
//! HTTP handlers run on several server workers at once, but the sensor has a
//! single global configuration. [`CameraHub`] owns the camera behind one
//! mutex: every sensor read-modify-write and every frame acquisition happens
//! while holding it.
//!
//! Streams switch the sensor to [`FrameSize::STREAM`] at a per-request
//! quality. The configuration in force before the first stream (the
//! *baseline*) is remembered and restored when the last [`StreamSession`] is
//! dropped, whichever way the stream ended.
//!
//! Every change to the sensor bumps a configuration generation. The driver
//! keeps one frame exposed under the old configuration, so a stream that
//! sees a new generation discards a frame before delivering the next one.

use crate::camera::{capture_fresh, Camera, CameraError, FrameBuffer};
use crate::model::{CameraSettings, FrameSize};
use crate::sensor::{apply_to_sensor, read_from_sensor, ApplyReport, Control, Sensor};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamOverride {
    baseline_frame_size: u8,
    baseline_quality: u8,
    quality: u8,
    sessions: usize,
}

struct HubState<C> {
    camera: C,
    stream: Option<StreamOverride>,
    generation: u64,
}

impl<C: Camera> HubState<C> {
    /// Set frame size then quality, skipping setters the sensor lacks.
    fn configure(&mut self, frame_size: u8, quality: u8) -> Result<(), CameraError> {
        self.generation += 1;
        let sensor = self.camera.sensor().ok_or(CameraError::SensorUnavailable)?;
        if sensor.supports(Control::FrameSize) {
            sensor.set(Control::FrameSize, frame_size.into())?;
        }
        if sensor.supports(Control::Quality) {
            sensor.set(Control::Quality, quality.into())?;
        }
        Ok(())
    }
}

/// Driver code reported for a deferred value outside its range.
const INVALID_VALUE: i32 = -1;

/// Range check for frame size and quality values that are stored rather
/// than handed to the sensor.
fn deferred_value(control: Control, value: i32) -> Result<u8, CameraError> {
    let checked = u8::try_from(value).ok().filter(|&v| match control {
        Control::FrameSize => FrameSize::from_code(v).is_some(),
        _ => v <= CameraSettings::MAX_QUALITY,
    });
    checked.ok_or(CameraError::SetterFailed {
        control,
        code: INVALID_VALUE,
    })
}

/// Mutex-guarded camera shared by all request handlers.
pub struct CameraHub<C: Camera> {
    state: Mutex<HubState<C>>,
}

impl<C: Camera> CameraHub<C> {
    pub fn new(camera: C) -> Self {
        Self {
            state: Mutex::new(HubState {
                camera,
                stream: None,
                generation: 0,
            }),
        }
    }

    /// Lock the camera, recovering from a panicked holder so buffers are
    /// still returned and settings restored afterwards.
    fn lock(&self) -> MutexGuard<'_, HubState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the camera.
    pub fn with_camera<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.lock().camera)
    }

    /// Model name of the active sensor.
    pub fn sensor_model(&self) -> Option<&'static str> {
        self.lock().camera.sensor().map(|s| s.model())
    }

    /// Number of streams currently running.
    pub fn active_streams(&self) -> usize {
        self.lock().stream.map(|s| s.sessions).unwrap_or(0)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Apply a full record to the sensor.
    ///
    /// When a stream is running, the record's frame size and quality become
    /// the new baseline and the stream keeps its own parameters.
    pub fn apply_settings(&self, settings: &CameraSettings) -> Result<ApplyReport, CameraError> {
        let mut state = self.lock();
        let sensor = state.camera.sensor().ok_or(CameraError::SensorUnavailable)?;
        let report = apply_to_sensor(sensor, settings);
        state.generation += 1;

        if let Some(active) = state.stream.as_mut() {
            active.baseline_frame_size = settings.frame_size.code();
            active.baseline_quality = settings.quality;
            let quality = active.quality;
            if let Err(e) = state.configure(FrameSize::STREAM.code(), quality) {
                warn!("Failed to re-apply stream parameters: {}", e);
            }
        }

        Ok(report)
    }

    /// Read the sensor state into a record.
    ///
    /// During a stream the baseline frame size and quality are reported, not
    /// the temporary streaming values.
    pub fn read_settings(&self) -> Result<CameraSettings, CameraError> {
        let mut state = self.lock();
        let HubState { camera, stream, .. } = &mut *state;

        let sensor = camera.sensor().ok_or(CameraError::SensorUnavailable)?;
        let mut settings = read_from_sensor(sensor)?;
        if let Some(active) = stream {
            settings.frame_size = FrameSize::from_code(active.baseline_frame_size)
                .ok_or(CameraError::UnknownFrameSize(active.baseline_frame_size))?;
            settings.quality = active.baseline_quality;
        }
        Ok(settings)
    }

    /// Set one sensor control.
    ///
    /// Frame size and quality changes made during a stream update the
    /// baseline and take effect when the last stream ends.
    pub fn set_control(&self, control: Control, value: i32) -> Result<(), CameraError> {
        let mut state = self.lock();
        let HubState {
            camera,
            stream,
            generation,
        } = &mut *state;

        let sensor = camera.sensor().ok_or(CameraError::SensorUnavailable)?;
        if !sensor.supports(control) {
            return Err(CameraError::Unsupported(control));
        }

        match (stream.as_mut(), control) {
            (Some(active), Control::FrameSize) => {
                active.baseline_frame_size = deferred_value(control, value)?;
                debug!("Deferred framesize={} until streams end", value);
            }
            (Some(active), Control::Quality) => {
                active.baseline_quality = deferred_value(control, value)?;
                debug!("Deferred quality={} until streams end", value);
            }
            _ => {
                *generation += 1;
                sensor.set(control, value)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Take a fresh frame and hand it to `f`.
    ///
    /// `f` is called exactly once, with either the frame or the reason no
    /// frame could be taken. The frame is returned to the pool when `f`
    /// returns. A capture during a stream is taken at the baseline
    /// configuration; the stream parameters are re-applied afterwards.
    pub fn capture<R>(&self, f: impl FnOnce(Result<&FrameBuffer<'_, C>, CameraError>) -> R) -> R {
        let mut state = self.lock();
        let active = state.stream;

        if let Some(active) = active {
            if let Err(e) = state.configure(active.baseline_frame_size, active.baseline_quality) {
                return f(Err(e));
            }
        }

        let result = match capture_fresh(&mut state.camera) {
            Ok(frame) => f(Ok(&frame)),
            Err(e) => {
                warn!("Camera capture failed");
                f(Err(e))
            }
        };

        if let Some(active) = active {
            if let Err(e) = state.configure(FrameSize::STREAM.code(), active.quality) {
                warn!("Failed to resume stream parameters: {}", e);
            }
        }

        result
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Switch the sensor to streaming parameters for the returned session.
    ///
    /// The first concurrent stream records the baseline; later streams share
    /// the override and the most recent quality wins.
    pub fn begin_stream(&self, quality: u8) -> Result<StreamSession<'_, C>, CameraError> {
        let mut state = self.lock();
        let HubState { camera, stream, .. } = &mut *state;

        let sensor = camera.sensor().ok_or(CameraError::SensorUnavailable)?;
        match stream.as_mut() {
            Some(active) => {
                active.sessions += 1;
                active.quality = quality;
            }
            None => {
                let status = sensor.status();
                *stream = Some(StreamOverride {
                    baseline_frame_size: status.frame_size,
                    baseline_quality: status.quality,
                    quality,
                    sessions: 1,
                });
            }
        }

        if let Err(e) = state.configure(FrameSize::STREAM.code(), quality) {
            warn!("Failed to apply stream parameters: {}", e);
        }
        info!("Stream started at {} quality {}", FrameSize::STREAM, quality);

        Ok(StreamSession {
            hub: self,
            seen: None,
        })
    }

    fn end_stream(&self) {
        let mut state = self.lock();

        let Some(active) = state.stream.as_mut() else {
            return;
        };
        active.sessions = active.sessions.saturating_sub(1);
        if active.sessions > 0 {
            debug!("Stream ended, {} still running", active.sessions);
            return;
        }

        let baseline = *active;
        state.stream = None;
        match state.configure(baseline.baseline_frame_size, baseline.baseline_quality) {
            Ok(()) => info!(
                "Stream ended, restored framesize={} quality={}",
                baseline.baseline_frame_size, baseline.baseline_quality
            ),
            Err(e) => warn!("Failed to restore settings after stream: {}", e),
        }
    }
}

/// An active stream. Dropping it ends the stream and, if it was the last
/// one, restores the baseline configuration.
pub struct StreamSession<'a, C: Camera> {
    hub: &'a CameraHub<C>,
    /// Configuration generation the last frame was taken under.
    seen: Option<u64>,
}

impl<C: Camera> StreamSession<'_, C> {
    /// Acquire the next stream frame and hand it to `f`.
    ///
    /// The first frame after any configuration change is taken with a
    /// discard so it reflects the current configuration. The hub is locked
    /// for the duration of `f`, so `f` should copy what it needs and return
    /// rather than write to a client.
    pub fn next_frame<R>(&mut self, f: impl FnOnce(Result<&FrameBuffer<'_, C>, CameraError>) -> R) -> R {
        let mut state = self.hub.lock();
        let generation = state.generation;
        let camera = &mut state.camera;

        let acquired = if self.seen.replace(generation) != Some(generation) {
            capture_fresh(camera)
        } else {
            FrameBuffer::acquire(camera)
        };

        let result = match acquired {
            Ok(frame) => f(Ok(&frame)),
            Err(e) => f(Err(e)),
        };
        result
    }
}

impl<C: Camera> Drop for StreamSession<'_, C> {
    fn drop(&mut self) {
        self.hub.end_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FrameData;
    use crate::testing::{FakeCamera, FakeSensor};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn hub_with_defaults() -> CameraHub<FakeCamera> {
        let hub = CameraHub::new(FakeCamera::new());
        hub.apply_settings(&CameraSettings::defaults()).unwrap();
        hub
    }

    fn live_status(hub: &CameraHub<FakeCamera>) -> (u8, u8) {
        hub.with_camera(|c| {
            let s = c.sensor.as_ref().unwrap().status;
            (s.frame_size, s.quality)
        })
    }

    #[test]
    fn test_sensor_unavailable() {
        let hub = CameraHub::new(FakeCamera::without_sensor());
        assert_eq!(
            hub.apply_settings(&CameraSettings::defaults()).err(),
            Some(CameraError::SensorUnavailable)
        );
        assert_eq!(hub.read_settings().err(), Some(CameraError::SensorUnavailable));
        assert_eq!(
            hub.set_control(Control::ExposureCtrl, 0).err(),
            Some(CameraError::SensorUnavailable)
        );
        assert!(hub.begin_stream(8).is_err());
        assert_eq!(hub.active_streams(), 0);
    }

    #[test]
    fn test_set_control_unsupported() {
        let mut camera = FakeCamera::new();
        camera.sensor = Some(FakeSensor::new().without(Control::Sharpness));
        let hub = CameraHub::new(camera);
        assert_eq!(
            hub.set_control(Control::Sharpness, 1),
            Err(CameraError::Unsupported(Control::Sharpness))
        );
    }

    #[test]
    fn test_set_control_rejected() {
        let mut camera = FakeCamera::new();
        camera.sensor = Some(FakeSensor::new().rejecting(Control::AgcGain, 0x103));
        let hub = CameraHub::new(camera);
        assert_eq!(
            hub.set_control(Control::AgcGain, 5),
            Err(CameraError::SetterFailed {
                control: Control::AgcGain,
                code: 0x103
            })
        );
    }

    #[test]
    fn test_stream_restores_baseline() {
        let hub = hub_with_defaults();
        let before = live_status(&hub);

        {
            let mut session = hub.begin_stream(12).unwrap();
            assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 12));
            for _ in 0..3 {
                session.next_frame(|frame| assert!(frame.is_ok()));
            }
        }

        assert_eq!(live_status(&hub), before);
        assert_eq!(hub.active_streams(), 0);
        hub.with_camera(|c| assert_eq!(c.acquired, c.released));
    }

    #[test]
    fn test_stream_restores_after_acquisition_failure() {
        let mut camera = FakeCamera::with_frames(&[b"a", b"b", b"c"]);
        camera.sensor.as_mut().unwrap().status.quality = 4;
        let hub = CameraHub::new(camera);
        let before = live_status(&hub);

        {
            let mut session = hub.begin_stream(8).unwrap();
            let mut delivered = 0;
            while session.next_frame(|frame| frame.is_ok()) {
                delivered += 1;
            }
            // Three queued frames: one discard, two delivered.
            assert_eq!(delivered, 2);
        }

        assert_eq!(live_status(&hub), before);
        hub.with_camera(|c| {
            assert_eq!(c.acquired, 3);
            assert_eq!(c.released, 3);
        });
    }

    #[test]
    fn test_first_stream_frame_is_fresh() {
        let hub = hub_with_defaults();
        let mut session = hub.begin_stream(8).unwrap();
        let id = session.next_frame(|frame| frame.unwrap().frame().id);
        assert_eq!(id, 2);
        let id = session.next_frame(|frame| frame.unwrap().frame().id);
        assert_eq!(id, 3);
    }

    #[test]
    fn test_concurrent_streams_restore_once() {
        let hub = hub_with_defaults();
        let before = live_status(&hub);

        let first = hub.begin_stream(8).unwrap();
        let second = hub.begin_stream(20).unwrap();
        assert_eq!(hub.active_streams(), 2);
        assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 20));

        drop(first);
        assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 20));
        drop(second);
        assert_eq!(live_status(&hub), before);
    }

    #[test]
    fn test_capture_during_stream_uses_baseline() {
        let hub = hub_with_defaults();
        let session = hub.begin_stream(10).unwrap();

        let (width, height) = hub.capture(|frame| {
            let frame = frame.unwrap();
            (frame.width(), frame.height())
        });
        assert_eq!((width, height), (2048, 1536));

        // Stream parameters are back in force.
        assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 10));
        drop(session);
        assert_eq!(live_status(&hub), (FrameSize::Qxga.code(), 4));
    }

    #[test]
    fn test_control_during_stream_updates_baseline() {
        let hub = hub_with_defaults();
        let session = hub.begin_stream(10).unwrap();

        hub.set_control(Control::Quality, 6).unwrap();
        hub.set_control(Control::ExposureCtrl, 0).unwrap();
        assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 10));

        let read = hub.read_settings().unwrap();
        assert_eq!(read.quality, 6);
        assert_eq!(read.frame_size, FrameSize::Qxga);
        assert!(!read.aec);

        drop(session);
        assert_eq!(live_status(&hub), (FrameSize::Qxga.code(), 6));
    }

    fn stream_width(session: &mut StreamSession<'_, FakeCamera>) -> usize {
        session.next_frame(|frame| frame.unwrap().width())
    }

    #[test]
    fn test_stream_discards_after_capture_reconfigures() {
        let hub = CameraHub::new(FakeCamera::latched());
        hub.apply_settings(&CameraSettings::defaults()).unwrap();

        let mut session = hub.begin_stream(10).unwrap();
        assert_eq!(stream_width(&mut session), 640);
        assert_eq!(stream_width(&mut session), 640);

        let width = hub.capture(|frame| frame.unwrap().width());
        assert_eq!(width, 2048);

        // The driver still holds a full-resolution frame.
        assert_eq!(stream_width(&mut session), 640);
        assert_eq!(stream_width(&mut session), 640);
    }

    #[test]
    fn test_stream_discards_after_settings_change() {
        let hub = hub_with_defaults();
        let mut session = hub.begin_stream(10).unwrap();
        assert_eq!(stream_width(&mut session), 640);
        let acquired = || hub.with_camera(|c| c.acquired);

        let before = acquired();
        hub.apply_settings(&CameraSettings::defaults()).unwrap();
        assert_eq!(stream_width(&mut session), 640);
        assert_eq!(acquired() - before, 2);

        let before = acquired();
        hub.set_control(Control::Brightness, 1).unwrap();
        assert_eq!(stream_width(&mut session), 640);
        assert_eq!(acquired() - before, 2);

        // Deferred baseline changes leave the sensor alone.
        let before = acquired();
        hub.set_control(Control::Quality, 6).unwrap();
        assert_eq!(stream_width(&mut session), 640);
        assert_eq!(acquired() - before, 1);
    }

    #[test]
    fn test_steady_stream_does_not_discard() {
        let hub = hub_with_defaults();
        let mut session = hub.begin_stream(8).unwrap();
        for _ in 0..3 {
            session.next_frame(|frame| assert!(frame.is_ok()));
        }
        // One discard for the switch, then one frame per call.
        hub.with_camera(|c| assert_eq!(c.acquired, 4));
    }

    #[test]
    fn test_apply_settings_during_stream_sets_baseline() {
        let hub = hub_with_defaults();
        let session = hub.begin_stream(10).unwrap();

        let settings = CameraSettings {
            frame_size: FrameSize::Uxga,
            quality: 9,
            aec: false,
            ..CameraSettings::defaults()
        };
        let report = hub.apply_settings(&settings).unwrap();
        assert!(report.is_clean());

        // Stream parameters stay live, the record becomes the baseline.
        assert_eq!(live_status(&hub), (FrameSize::Vga.code(), 10));
        let read = hub.read_settings().unwrap();
        assert_eq!(read.frame_size, FrameSize::Uxga);
        assert_eq!(read.quality, 9);
        assert!(!read.aec);

        drop(session);
        assert_eq!(live_status(&hub), (FrameSize::Uxga.code(), 9));
    }

    #[test]
    fn test_deferred_control_out_of_range() {
        let hub = hub_with_defaults();
        let session = hub.begin_stream(10).unwrap();

        for (control, value) in [
            (Control::Quality, 300),
            (Control::Quality, 64),
            (Control::Quality, -1),
            (Control::FrameSize, 300),
            (Control::FrameSize, 200),
        ] {
            assert_eq!(
                hub.set_control(control, value),
                Err(CameraError::SetterFailed {
                    control,
                    code: INVALID_VALUE
                })
            );
        }
        hub.set_control(Control::FrameSize, FrameSize::Svga.code().into())
            .unwrap();

        drop(session);
        assert_eq!(live_status(&hub), (FrameSize::Svga.code(), 4));
    }

    #[test]
    fn test_capture_failure_reported_to_callback() {
        let hub = CameraHub::new(FakeCamera::with_frames(&[b"stale"]));
        let failed = hub.capture(|frame| frame.err());
        assert_eq!(failed, Some(CameraError::CaptureFailed));
        hub.with_camera(|c| assert_eq!(c.acquired, c.released));
    }

    #[test]
    fn test_threads_share_hub() {
        let hub = Arc::new(hub_with_defaults());
        let before = live_status(&hub);

        let mut handles = Vec::new();
        for i in 0..4 {
            let hub = Arc::clone(&hub);
            handles.push(std::thread::spawn(move || {
                if i % 2 == 0 {
                    let mut session = hub.begin_stream(8 + i).unwrap();
                    for _ in 0..20 {
                        session.next_frame(|frame| assert!(frame.is_ok()));
                    }
                } else {
                    for _ in 0..20 {
                        hub.capture(|frame| {
                            assert_eq!(frame.unwrap().width(), 2048);
                        });
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(live_status(&hub), before);
        hub.with_camera(|c| assert_eq!(c.acquired, c.released));
    }
}
