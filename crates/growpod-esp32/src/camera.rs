//! esp32-camera driver bindings.
//!
//! [`EspCamera`] owns the initialized driver and exposes it through the
//! `Camera` trait; [`EspSensor`] wraps the driver's `sensor_t` function
//! table so a missing setter shows up as an unsupported control.

use anyhow::{bail, Result};
use esp_idf_svc::sys::camera::{
    camera_config_t, camera_fb_location_t_CAMERA_FB_IN_PSRAM, camera_fb_t,
    camera_grab_mode_t_CAMERA_GRAB_LATEST, esp_camera_fb_get, esp_camera_fb_return,
    esp_camera_init, esp_camera_sensor_get, framesize_t, ledc_channel_t_LEDC_CHANNEL_0,
    ledc_timer_t_LEDC_TIMER_0, pixformat_t_PIXFORMAT_JPEG, sensor_t,
};
use esp_idf_svc::sys::{esp, heap_caps_get_total_size, MALLOC_CAP_SPIRAM};
use growpod_core::{Camera, Control, FrameData, FrameSize, Sensor, SensorStatus, SetterError};
use log::{info, warn};
use std::ffi::c_int;

// XIAO ESP32S3 Sense pinout
mod pinout {
    pub const PWDN: i32 = -1;
    pub const RESET: i32 = -1;
    pub const XCLK: i32 = 10;
    pub const SIOD: i32 = 40;
    pub const SIOC: i32 = 39;
    pub const D7: i32 = 48;
    pub const D6: i32 = 11;
    pub const D5: i32 = 12;
    pub const D4: i32 = 14;
    pub const D3: i32 = 16;
    pub const D2: i32 = 18;
    pub const D1: i32 = 17;
    pub const D0: i32 = 15;
    pub const VSYNC: i32 = 38;
    pub const HREF: i32 = 47;
    pub const PCLK: i32 = 13;
}

/// Driver start-up parameters.
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    pub xclk_freq_hz: i32,
    /// Frame size the frame buffer is sized for; the largest the camera
    /// will ever be switched to.
    pub frame_size: FrameSize,
    /// JPEG quality, 0-63, lower is better.
    pub jpeg_quality: u8,
    pub fb_count: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            xclk_freq_hz: 20_000_000,
            frame_size: FrameSize::MAX_SUPPORTED,
            jpeg_quality: 4,
            fb_count: 1,
        }
    }
}

/// Total external PSRAM in bytes, 0 when none was detected.
pub fn psram_size() -> usize {
    unsafe { heap_caps_get_total_size(MALLOC_CAP_SPIRAM) }
}

/// The initialized camera driver.
pub struct EspCamera {
    sensor: Option<EspSensor>,
}

// The driver is only touched through `CameraHub`, which serializes access.
unsafe impl Send for EspCamera {}

impl EspCamera {
    /// Initialize the driver with the XIAO pin map.
    pub fn init(config: &CameraConfig) -> Result<Self> {
        let mut camera_config = camera_config_t::default();

        camera_config.pin_pwdn = pinout::PWDN;
        camera_config.pin_reset = pinout::RESET;
        camera_config.pin_xclk = pinout::XCLK;
        camera_config.pin_d7 = pinout::D7;
        camera_config.pin_d6 = pinout::D6;
        camera_config.pin_d5 = pinout::D5;
        camera_config.pin_d4 = pinout::D4;
        camera_config.pin_d3 = pinout::D3;
        camera_config.pin_d2 = pinout::D2;
        camera_config.pin_d1 = pinout::D1;
        camera_config.pin_d0 = pinout::D0;
        camera_config.pin_vsync = pinout::VSYNC;
        camera_config.pin_href = pinout::HREF;
        camera_config.pin_pclk = pinout::PCLK;

        camera_config.xclk_freq_hz = config.xclk_freq_hz;
        camera_config.ledc_timer = ledc_timer_t_LEDC_TIMER_0;
        camera_config.ledc_channel = ledc_channel_t_LEDC_CHANNEL_0;

        camera_config.pixel_format = pixformat_t_PIXFORMAT_JPEG;
        camera_config.frame_size = config.frame_size.code() as framesize_t;
        camera_config.jpeg_quality = config.jpeg_quality.into();
        camera_config.fb_count = config.fb_count;
        camera_config.fb_location = camera_fb_location_t_CAMERA_FB_IN_PSRAM;
        camera_config.grab_mode = camera_grab_mode_t_CAMERA_GRAB_LATEST;

        unsafe {
            // SCCB pins live in anonymous unions
            camera_config.__bindgen_anon_1.pin_sccb_sda = pinout::SIOD;
            camera_config.__bindgen_anon_2.pin_sccb_scl = pinout::SIOC;

            if let Err(e) = esp!(esp_camera_init(&camera_config)) {
                bail!("Camera init failed: {}", e);
            }
        }

        let raw = unsafe { esp_camera_sensor_get() };
        if raw.is_null() {
            bail!("Failed to get camera sensor");
        }
        let sensor = EspSensor::new(raw);

        info!(
            "Camera initialized: {} at {} quality {}",
            sensor.model(),
            config.frame_size,
            config.jpeg_quality
        );
        Ok(Self {
            sensor: Some(sensor),
        })
    }
}

impl Camera for EspCamera {
    type Sensor = EspSensor;
    type Frame = EspFrame;

    fn sensor(&mut self) -> Option<&mut EspSensor> {
        self.sensor.as_mut()
    }

    fn frame_get(&mut self) -> Option<EspFrame> {
        let fb = unsafe { esp_camera_fb_get() };
        if fb.is_null() {
            return None;
        }

        // camera_fb_t contains a packed timeval; read fields unaligned
        unsafe {
            Some(EspFrame {
                fb,
                buf: std::ptr::addr_of!((*fb).buf).read_unaligned(),
                len: std::ptr::addr_of!((*fb).len).read_unaligned(),
                width: std::ptr::addr_of!((*fb).width).read_unaligned(),
                height: std::ptr::addr_of!((*fb).height).read_unaligned(),
            })
        }
    }

    fn frame_return(&mut self, frame: EspFrame) {
        unsafe { esp_camera_fb_return(frame.fb) }
    }
}

/// A frame buffer checked out of the driver's pool.
pub struct EspFrame {
    fb: *mut camera_fb_t,
    buf: *mut u8,
    len: usize,
    width: usize,
    height: usize,
}

impl FrameData for EspFrame {
    fn data(&self) -> &[u8] {
        if self.buf.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.buf, self.len) }
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}

type IntSetter = unsafe extern "C" fn(*mut sensor_t, c_int) -> c_int;

/// Handle to the driver's `sensor_t`.
pub struct EspSensor {
    raw: *mut sensor_t,
    model: &'static str,
}

impl EspSensor {
    fn new(raw: *mut sensor_t) -> Self {
        let pid = unsafe { (*raw).id.PID };
        let model = match pid {
            0x3660 => "OV3660",
            0x2642 => "OV2640",
            0x5640 => "OV5640",
            other => {
                warn!("Unrecognized sensor PID 0x{:04x}", other);
                "unknown"
            }
        };
        Self { raw, model }
    }

    /// Setter taking a plain integer; frame size has its own signature.
    fn int_setter(&self, control: Control) -> Option<IntSetter> {
        let s = unsafe { &*self.raw };
        match control {
            Control::FrameSize => None,
            Control::Quality => s.set_quality,
            Control::ExposureCtrl => s.set_exposure_ctrl,
            Control::AecValue => s.set_aec_value,
            Control::AeLevel => s.set_ae_level,
            Control::GainCtrl => s.set_gain_ctrl,
            Control::AgcGain => s.set_agc_gain,
            Control::Brightness => s.set_brightness,
            Control::Contrast => s.set_contrast,
            Control::Saturation => s.set_saturation,
            Control::Sharpness => s.set_sharpness,
            Control::WhiteBal => s.set_whitebal,
            Control::HMirror => s.set_hmirror,
            Control::VFlip => s.set_vflip,
        }
    }
}

impl Sensor for EspSensor {
    fn model(&self) -> &'static str {
        self.model
    }

    fn supports(&self, control: Control) -> bool {
        match control {
            Control::FrameSize => unsafe { (*self.raw).set_framesize.is_some() },
            other => self.int_setter(other).is_some(),
        }
    }

    fn set(&mut self, control: Control, value: i32) -> Result<(), SetterError> {
        let code = match control {
            Control::FrameSize => {
                let setter = unsafe { (*self.raw).set_framesize }.ok_or(SetterError::Unsupported(control))?;
                unsafe { setter(self.raw, value as framesize_t) }
            }
            other => {
                let setter = self.int_setter(other).ok_or(SetterError::Unsupported(control))?;
                unsafe { setter(self.raw, value) }
            }
        };

        match code {
            0 => Ok(()),
            code => Err(SetterError::Rejected { control, code }),
        }
    }

    fn status(&self) -> SensorStatus {
        let s = unsafe { &(*self.raw).status };
        SensorStatus {
            frame_size: s.framesize as u8,
            quality: s.quality as u8,
            aec: s.aec != 0,
            aec_value: s.aec_value as u16,
            ae_level: s.ae_level as i8,
            agc: s.agc != 0,
            agc_gain: s.agc_gain as u8,
            brightness: s.brightness as i8,
            contrast: s.contrast as i8,
            saturation: s.saturation as i8,
            sharpness: s.sharpness as i8,
            awb: s.awb != 0,
            hmirror: s.hmirror != 0,
            vflip: s.vflip != 0,
        }
    }
}
