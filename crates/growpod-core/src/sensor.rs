//! Sensor control façade.
//!
//! Translates a [`CameraSettings`] record into individual capability setter
//! calls on a [`Sensor`] and reads the live sensor state back into a record.
//! Which setters exist depends on the sensor model, so every call is guarded
//! by [`Sensor::supports`].

use crate::camera::CameraError;
use crate::model::{CameraSettings, FrameSize};
use thiserror::Error;
use tracing::{debug, warn};

/// A settable sensor capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    FrameSize,
    Quality,
    /// Automatic exposure on/off.
    ExposureCtrl,
    /// Manual exposure value.
    AecValue,
    /// Exposure compensation.
    AeLevel,
    /// Automatic gain on/off.
    GainCtrl,
    /// Manual gain value.
    AgcGain,
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    /// Automatic white balance on/off.
    WhiteBal,
    HMirror,
    VFlip,
}

impl Control {
    /// Order in which a full record is applied.
    pub const APPLY_ORDER: [Control; 14] = [
        Control::FrameSize,
        Control::Quality,
        Control::ExposureCtrl,
        Control::AecValue,
        Control::AeLevel,
        Control::GainCtrl,
        Control::AgcGain,
        Control::Brightness,
        Control::Contrast,
        Control::Saturation,
        Control::Sharpness,
        Control::WhiteBal,
        Control::HMirror,
        Control::VFlip,
    ];

    /// Driver name of the setter.
    pub fn name(self) -> &'static str {
        match self {
            Control::FrameSize => "framesize",
            Control::Quality => "quality",
            Control::ExposureCtrl => "exposure_ctrl",
            Control::AecValue => "aec_value",
            Control::AeLevel => "ae_level",
            Control::GainCtrl => "gain_ctrl",
            Control::AgcGain => "agc_gain",
            Control::Brightness => "brightness",
            Control::Contrast => "contrast",
            Control::Saturation => "saturation",
            Control::Sharpness => "sharpness",
            Control::WhiteBal => "whitebal",
            Control::HMirror => "hmirror",
            Control::VFlip => "vflip",
        }
    }

    /// The value a settings record assigns to this control.
    pub fn value_in(self, settings: &CameraSettings) -> i32 {
        match self {
            Control::FrameSize => settings.frame_size.code().into(),
            Control::Quality => settings.quality.into(),
            Control::ExposureCtrl => settings.aec.into(),
            Control::AecValue => settings.aec_value.into(),
            Control::AeLevel => settings.ae_level.into(),
            Control::GainCtrl => settings.agc.into(),
            Control::AgcGain => settings.agc_gain.into(),
            Control::Brightness => settings.brightness.into(),
            Control::Contrast => settings.contrast.into(),
            Control::Saturation => settings.saturation.into(),
            Control::Sharpness => settings.sharpness.into(),
            Control::WhiteBal => settings.awb.into(),
            Control::HMirror => settings.hmirror.into(),
            Control::VFlip => settings.vflip.into(),
        }
    }
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a single setter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetterError {
    /// The sensor model has no setter for this control.
    #[error("sensor has no {0} setter")]
    Unsupported(Control),

    /// The setter returned a non-zero driver code.
    #[error("{control} setter returned {code}")]
    Rejected { control: Control, code: i32 },
}

/// Live sensor status registers.
///
/// Values are kept raw so an unexpected frame size code can be reported
/// instead of silently mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStatus {
    pub frame_size: u8,
    pub quality: u8,
    pub aec: bool,
    pub aec_value: u16,
    pub ae_level: i8,
    pub agc: bool,
    pub agc_gain: u8,
    pub brightness: i8,
    pub contrast: i8,
    pub saturation: i8,
    pub sharpness: i8,
    pub awb: bool,
    pub hmirror: bool,
    pub vflip: bool,
}

/// Capability-set handle of a physical camera sensor.
pub trait Sensor {
    /// Human-readable model name ("OV3660").
    fn model(&self) -> &'static str;

    /// Whether this sensor has a setter for `control`.
    fn supports(&self, control: Control) -> bool;

    /// Invoke the setter for `control`.
    fn set(&mut self, control: Control, value: i32) -> Result<(), SetterError>;

    /// Snapshot of the live status registers.
    fn status(&self) -> SensorStatus;
}

// ============================================================================
// Apply / Read
// ============================================================================

/// Result of one setter during a bulk apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Applied,
    /// No setter on this sensor; skipped.
    Unsupported,
    Failed(i32),
}

/// Per-field outcomes of [`apply_to_sensor`], in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    outcomes: Vec<(Control, SetOutcome)>,
}

impl ApplyReport {
    /// Outcome for one control, if it was part of the apply.
    pub fn outcome(&self, control: Control) -> Option<SetOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == control)
            .map(|(_, outcome)| *outcome)
    }

    /// All outcomes in apply order.
    pub fn outcomes(&self) -> &[(Control, SetOutcome)] {
        &self.outcomes
    }

    /// Controls whose setter returned an error code.
    pub fn failures(&self) -> impl Iterator<Item = (Control, i32)> + '_ {
        self.outcomes.iter().filter_map(|(c, outcome)| match outcome {
            SetOutcome::Failed(code) => Some((*c, *code)),
            _ => None,
        })
    }

    /// Controls skipped because the sensor lacks the setter.
    pub fn skipped(&self) -> impl Iterator<Item = Control> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == SetOutcome::Unsupported)
            .map(|(c, _)| *c)
    }

    /// True when every supported setter succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Apply every field of `settings` to the sensor in [`Control::APPLY_ORDER`].
///
/// Missing setters are skipped and setter failures are logged; neither stops
/// the remaining fields from being applied.
pub fn apply_to_sensor<S: Sensor + ?Sized>(sensor: &mut S, settings: &CameraSettings) -> ApplyReport {
    let mut report = ApplyReport::default();

    for control in Control::APPLY_ORDER {
        let outcome = if !sensor.supports(control) {
            debug!("Sensor {} has no {} setter, skipping", sensor.model(), control);
            SetOutcome::Unsupported
        } else {
            match sensor.set(control, control.value_in(settings)) {
                Ok(()) => SetOutcome::Applied,
                Err(SetterError::Unsupported(_)) => SetOutcome::Unsupported,
                Err(SetterError::Rejected { code, .. }) => {
                    warn!("Failed to set {} (error {})", control, code);
                    SetOutcome::Failed(code)
                }
            }
        };
        report.outcomes.push((control, outcome));
    }

    report
}

/// Read the live sensor state into a record tagged with the current version.
pub fn read_from_sensor<S: Sensor + ?Sized>(sensor: &S) -> Result<CameraSettings, CameraError> {
    let status = sensor.status();
    let frame_size = FrameSize::from_code(status.frame_size)
        .ok_or(CameraError::UnknownFrameSize(status.frame_size))?;

    Ok(CameraSettings {
        version: CameraSettings::CURRENT_VERSION,
        aec: status.aec,
        aec_value: status.aec_value,
        ae_level: status.ae_level,
        agc: status.agc,
        agc_gain: status.agc_gain,
        quality: status.quality,
        frame_size,
        brightness: status.brightness,
        contrast: status.contrast,
        saturation: status.saturation,
        sharpness: status.sharpness,
        awb: status.awb,
        hmirror: status.hmirror,
        vflip: status.vflip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSensor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_order() {
        let mut sensor = FakeSensor::new();
        apply_to_sensor(&mut sensor, &CameraSettings::defaults());

        let called: Vec<Control> = sensor.calls.iter().map(|(c, _)| *c).collect();
        assert_eq!(called, Control::APPLY_ORDER.to_vec());
    }

    #[test]
    fn test_defaults_round_trip() {
        let mut sensor = FakeSensor::new();
        let defaults = CameraSettings::defaults();

        let report = apply_to_sensor(&mut sensor, &defaults);
        assert!(report.is_clean());
        assert_eq!(read_from_sensor(&sensor).unwrap(), defaults);
    }

    #[test]
    fn test_missing_setter_is_skipped() {
        let mut sensor = FakeSensor::new().without(Control::Sharpness);
        sensor.status.sharpness = 0;
        let settings = CameraSettings {
            sharpness: 2,
            contrast: 1,
            ..CameraSettings::defaults()
        };

        let report = apply_to_sensor(&mut sensor, &settings);
        assert_eq!(report.outcome(Control::Sharpness), Some(SetOutcome::Unsupported));
        assert_eq!(report.skipped().collect::<Vec<_>>(), vec![Control::Sharpness]);
        assert!(report.is_clean());
        assert!(!sensor.calls.iter().any(|(c, _)| *c == Control::Sharpness));

        // Every supported field still round-trips.
        let read = read_from_sensor(&sensor).unwrap();
        assert_eq!(read.contrast, 1);
        assert_eq!(read.sharpness, 0);
    }

    #[test]
    fn test_failed_setter_does_not_stop_apply() {
        let mut sensor = FakeSensor::new().rejecting(Control::AecValue, -1);
        let report = apply_to_sensor(&mut sensor, &CameraSettings::defaults());

        assert_eq!(report.outcome(Control::AecValue), Some(SetOutcome::Failed(-1)));
        assert_eq!(report.failures().collect::<Vec<_>>(), vec![(Control::AecValue, -1)]);
        assert!(!report.is_clean());
        assert_eq!(report.outcome(Control::VFlip), Some(SetOutcome::Applied));
        assert_eq!(sensor.calls.len(), 14);
    }

    #[test]
    fn test_read_tags_current_version() {
        let mut sensor = FakeSensor::new();
        sensor.status.frame_size = FrameSize::Svga.code();
        let read = read_from_sensor(&sensor).unwrap();
        assert_eq!(read.version, CameraSettings::CURRENT_VERSION);
        assert_eq!(read.frame_size, FrameSize::Svga);
    }

    #[test]
    fn test_read_unknown_frame_size() {
        let mut sensor = FakeSensor::new();
        sensor.status.frame_size = 200;
        assert_eq!(
            read_from_sensor(&sensor),
            Err(CameraError::UnknownFrameSize(200))
        );
    }

    #[test]
    fn test_value_in() {
        let settings = CameraSettings {
            ae_level: -2,
            aec: false,
            ..CameraSettings::defaults()
        };
        assert_eq!(Control::AeLevel.value_in(&settings), -2);
        assert_eq!(Control::ExposureCtrl.value_in(&settings), 0);
        assert_eq!(Control::FrameSize.value_in(&settings), 19);
        assert_eq!(Control::VFlip.value_in(&settings), 1);
    }
}
