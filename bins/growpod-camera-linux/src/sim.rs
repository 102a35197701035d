//! Simulated camera for running the web interface without hardware.
//!
//! Frames are synthetic JPEGs rendered at the sensor's current frame size
//! and quality. The pool holds a single buffer like the firmware's
//! configuration, and the sensor has no sharpness setter.

use growpod_core::{Camera, Control, FrameData, FrameSize, Sensor, SensorStatus, SetterError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{flip_horizontal_in_place, flip_vertical_in_place};
use image::{ImageResult, Rgb, RgbImage};
use tracing::warn;

/// Driver return code for a rejected value.
const EINVAL: i32 = -1;

pub struct SimSensor {
    status: SensorStatus,
}

impl SimSensor {
    pub fn new(frame_size: FrameSize) -> Self {
        Self {
            status: SensorStatus {
                frame_size: frame_size.code(),
                quality: 12,
                aec: true,
                agc: true,
                awb: true,
                ..SensorStatus::default()
            },
        }
    }
}

impl Sensor for SimSensor {
    fn model(&self) -> &'static str {
        "OV3660"
    }

    fn supports(&self, control: Control) -> bool {
        control != Control::Sharpness
    }

    fn set(&mut self, control: Control, value: i32) -> Result<(), SetterError> {
        if !self.supports(control) {
            return Err(SetterError::Unsupported(control));
        }
        let rejected = SetterError::Rejected {
            control,
            code: EINVAL,
        };

        let s = &mut self.status;
        match control {
            Control::FrameSize => {
                let size = u8::try_from(value)
                    .ok()
                    .and_then(FrameSize::from_code)
                    .ok_or(rejected)?;
                s.frame_size = size.code();
            }
            Control::Quality => s.quality = u8::try_from(value).ok().filter(|q| *q <= 63).ok_or(rejected)?,
            Control::ExposureCtrl => s.aec = value != 0,
            Control::AecValue => s.aec_value = u16::try_from(value).ok().filter(|v| *v <= 1200).ok_or(rejected)?,
            Control::AeLevel => s.ae_level = value.clamp(-2, 2) as i8,
            Control::GainCtrl => s.agc = value != 0,
            Control::AgcGain => s.agc_gain = value.clamp(0, 30) as u8,
            Control::Brightness => s.brightness = value.clamp(-2, 2) as i8,
            Control::Contrast => s.contrast = value.clamp(-2, 2) as i8,
            Control::Saturation => s.saturation = value.clamp(-2, 2) as i8,
            Control::Sharpness => return Err(SetterError::Unsupported(control)),
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

pub struct SimFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl FrameData for SimFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}

pub struct SimCamera {
    sensor: Option<SimSensor>,
    checked_out: bool,
    frames: u64,
}

impl SimCamera {
    /// Camera powered up at the largest supported frame size.
    pub fn new() -> Self {
        Self::with_frame_size(FrameSize::MAX_SUPPORTED)
    }

    pub fn with_frame_size(frame_size: FrameSize) -> Self {
        Self {
            sensor: Some(SimSensor::new(frame_size)),
            checked_out: false,
            frames: 0,
        }
    }
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for SimCamera {
    type Sensor = SimSensor;
    type Frame = SimFrame;

    fn sensor(&mut self) -> Option<&mut SimSensor> {
        self.sensor.as_mut()
    }

    fn frame_get(&mut self) -> Option<SimFrame> {
        if self.checked_out {
            return None;
        }
        let status = self.sensor.as_ref()?.status;
        let frame_size = FrameSize::from_code(status.frame_size)?;

        self.frames += 1;
        match render(&status, frame_size, self.frames) {
            Ok(data) => {
                self.checked_out = true;
                let (width, height) = frame_size.dimensions();
                Some(SimFrame {
                    data,
                    width: width.into(),
                    height: height.into(),
                })
            }
            Err(e) => {
                warn!("Failed to render simulated frame: {}", e);
                None
            }
        }
    }

    fn frame_return(&mut self, _frame: SimFrame) {
        self.checked_out = false;
    }
}

/// Map the sensor's 0-63 scale (lower is better) onto the encoder's 10-100.
fn jpeg_quality(sensor_quality: u8) -> u8 {
    100 - (u32::from(sensor_quality.min(63)) * 90 / 63) as u8
}

fn render(status: &SensorStatus, frame_size: FrameSize, frame: u64) -> ImageResult<Vec<u8>> {
    let (width, height) = frame_size.dimensions();
    let (width, height) = (u32::from(width), u32::from(height));
    let shift = (frame % 256) as u32 * 8;
    let lift = i32::from(status.brightness) * 24;
    let level = |v: u32| (v as i32 + lift).clamp(0, 255) as u8;

    let mut image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            level((x * 255 / width + shift) % 256),
            level(y * 255 / height),
            level(128),
        ])
    });
    if status.vflip {
        flip_vertical_in_place(&mut image);
    }
    if status.hmirror {
        flip_horizontal_in_place(&mut image);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, jpeg_quality(status.quality)).encode_image(&image)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use growpod_core::{capture_fresh, CameraHub, CameraSettings};

    #[test]
    fn test_capture_renders_jpeg_at_frame_size() {
        let mut camera = SimCamera::with_frame_size(FrameSize::Qvga);
        let frame = capture_fresh(&mut camera).unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 240));
        assert_eq!(&frame.data()[..2], &[0xffu8, 0xd8]);
    }

    #[test]
    fn test_single_buffer_pool() {
        let mut camera = SimCamera::with_frame_size(FrameSize::Qqvga);
        let first = camera.frame_get().unwrap();
        assert!(camera.frame_get().is_none());
        camera.frame_return(first);
        assert!(camera.frame_get().is_some());
    }

    #[test]
    fn test_defaults_skip_sharpness() {
        let hub = CameraHub::new(SimCamera::with_frame_size(FrameSize::Qvga));
        let report = hub.apply_settings(&CameraSettings::defaults()).unwrap();
        assert_eq!(report.skipped().collect::<Vec<_>>(), vec![Control::Sharpness]);
        assert!(report.is_clean());
        assert_eq!(hub.read_settings().unwrap(), CameraSettings::defaults());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut sensor = SimSensor::new(FrameSize::Qvga);
        assert_eq!(
            sensor.set(Control::FrameSize, 99),
            Err(SetterError::Rejected {
                control: Control::FrameSize,
                code: EINVAL
            })
        );
        assert!(sensor.set(Control::Quality, 64).is_err());
        assert_eq!(sensor.status().frame_size, FrameSize::Qvga.code());
    }

    #[test]
    fn test_jpeg_quality_scale() {
        assert_eq!(jpeg_quality(0), 100);
        assert_eq!(jpeg_quality(63), 10);
        assert!(jpeg_quality(4) > jpeg_quality(12));
    }
}
