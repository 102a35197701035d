//! Recording fakes for the [`Camera`] and [`Sensor`] traits.
//!
//! Enabled for this crate's unit tests and, through the `testing` feature,
//! for downstream integration tests.

use crate::camera::{Camera, FrameData};
use crate::model::FrameSize;
use crate::sensor::{Control, Sensor, SensorStatus, SetterError};
use std::collections::{HashMap, HashSet, VecDeque};

/// Sensor that records every setter call and mirrors values into its status.
#[derive(Debug, Clone)]
pub struct FakeSensor {
    pub supported: HashSet<Control>,
    pub rejected: HashMap<Control, i32>,
    pub calls: Vec<(Control, i32)>,
    pub status: SensorStatus,
}

impl FakeSensor {
    /// A sensor supporting every control, powered up at QXGA quality 12.
    pub fn new() -> Self {
        Self {
            supported: Control::APPLY_ORDER.into_iter().collect(),
            rejected: HashMap::new(),
            calls: Vec::new(),
            status: SensorStatus {
                frame_size: FrameSize::Qxga.code(),
                quality: 12,
                ..SensorStatus::default()
            },
        }
    }

    /// Remove the setter for `control`.
    pub fn without(mut self, control: Control) -> Self {
        self.supported.remove(&control);
        self
    }

    /// Make the setter for `control` return `code`.
    pub fn rejecting(mut self, control: Control, code: i32) -> Self {
        self.rejected.insert(control, code);
        self
    }

    /// Calls made for one control.
    pub fn calls_for(&self, control: Control) -> Vec<i32> {
        self.calls
            .iter()
            .filter(|(c, _)| *c == control)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl Default for FakeSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for FakeSensor {
    fn model(&self) -> &'static str {
        "OV3660"
    }

    fn supports(&self, control: Control) -> bool {
        self.supported.contains(&control)
    }

    fn set(&mut self, control: Control, value: i32) -> Result<(), SetterError> {
        if !self.supports(control) {
            return Err(SetterError::Unsupported(control));
        }
        self.calls.push((control, value));
        if let Some(&code) = self.rejected.get(&control) {
            return Err(SetterError::Rejected { control, code });
        }

        let s = &mut self.status;
        match control {
            Control::FrameSize => s.frame_size = value as u8,
            Control::Quality => s.quality = value as u8,
            Control::ExposureCtrl => s.aec = value != 0,
            Control::AecValue => s.aec_value = value as u16,
            Control::AeLevel => s.ae_level = value as i8,
            Control::GainCtrl => s.agc = value != 0,
            Control::AgcGain => s.agc_gain = value as u8,
            Control::Brightness => s.brightness = value as i8,
            Control::Contrast => s.contrast = value as i8,
            Control::Saturation => s.saturation = value as i8,
            Control::Sharpness => s.sharpness = value as i8,
            Control::WhiteBal => s.awb = value != 0,
            Control::HMirror => s.hmirror = value != 0,
            Control::VFlip => s.vflip = value != 0,
        }
        Ok(())
    }

    fn status(&self) -> SensorStatus {
        self.status
    }
}

/// Frame handed out by [`FakeCamera`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFrame {
    /// Sequence number, starting at 1.
    pub id: usize,
    pub data: Vec<u8>,
    /// Frame size the sensor was set to when the frame was taken.
    pub frame_size: u8,
}

impl FrameData for FakeFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn width(&self) -> usize {
        FrameSize::from_code(self.frame_size)
            .map(|f| f.dimensions().0 as usize)
            .unwrap_or(0)
    }

    fn height(&self) -> usize {
        FrameSize::from_code(self.frame_size)
            .map(|f| f.dimensions().1 as usize)
            .unwrap_or(0)
    }
}

/// Camera with a scripted frame queue and a bounded buffer pool.
///
/// Queued frames are handed out first. Once the queue is empty, frames are
/// generated while `endless` is set; otherwise acquisition fails. Acquisition
/// also fails while `pool_size` frames are outstanding, like the driver's
/// fixed pool.
///
/// With `latched` set, each frame carries the frame size in force at the
/// previous acquisition, like a driver that already exposed the next frame
/// before the sensor was reconfigured.
#[derive(Debug)]
pub struct FakeCamera {
    pub sensor: Option<FakeSensor>,
    pub frames: VecDeque<Vec<u8>>,
    pub endless: bool,
    pub pool_size: usize,
    pub acquired: usize,
    pub released: usize,
    pub returned_ids: Vec<usize>,
    /// Frame size in effect at every successful acquisition.
    pub acquired_sizes: Vec<u8>,
    pub latched: bool,
    exposed: Option<u8>,
}

impl FakeCamera {
    /// Camera with an endless frame supply and a one-frame pool.
    pub fn new() -> Self {
        Self {
            sensor: Some(FakeSensor::new()),
            frames: VecDeque::new(),
            endless: true,
            pool_size: 1,
            acquired: 0,
            released: 0,
            returned_ids: Vec::new(),
            acquired_sizes: Vec::new(),
            latched: false,
            exposed: None,
        }
    }

    /// Endless camera whose frames lag one acquisition behind the sensor.
    pub fn latched() -> Self {
        Self {
            latched: true,
            ..Self::new()
        }
    }

    /// Camera that yields exactly `frames`, then fails.
    pub fn with_frames<F: AsRef<[u8]>>(frames: &[F]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.as_ref().to_vec()).collect(),
            endless: false,
            ..Self::new()
        }
    }

    /// Camera whose sensor handle is missing.
    pub fn without_sensor() -> Self {
        Self {
            sensor: None,
            ..Self::new()
        }
    }

    pub fn outstanding(&self) -> usize {
        self.acquired - self.released
    }

    fn current_frame_size(&self) -> u8 {
        self.sensor
            .as_ref()
            .map(|s| s.status.frame_size)
            .unwrap_or_default()
    }
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for FakeCamera {
    type Sensor = FakeSensor;
    type Frame = FakeFrame;

    fn sensor(&mut self) -> Option<&mut FakeSensor> {
        self.sensor.as_mut()
    }

    fn frame_get(&mut self) -> Option<FakeFrame> {
        if self.outstanding() >= self.pool_size {
            return None;
        }

        let current = self.current_frame_size();
        let frame_size = match self.exposed.replace(current) {
            Some(exposed) if self.latched => exposed,
            _ => current,
        };
        let data = match self.frames.pop_front() {
            Some(data) => data,
            None if self.endless => {
                let label = FrameSize::from_code(frame_size)
                    .map(|f| f.label())
                    .unwrap_or("?");
                format!("frame-{}-{}", self.acquired + 1, label).into_bytes()
            }
            None => return None,
        };

        self.acquired += 1;
        self.acquired_sizes.push(frame_size);
        Some(FakeFrame {
            id: self.acquired,
            data,
            frame_size,
        })
    }

    fn frame_return(&mut self, frame: FakeFrame) {
        self.released += 1;
        self.returned_ids.push(frame.id);
    }
}
