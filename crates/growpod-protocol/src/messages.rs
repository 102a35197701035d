//! Request and response documents.

use crate::codec::query_param;
use growpod_core::{CameraSettings, Control, FrameSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// /status
// ============================================================================

/// Live exposure and gain values, used by the settings page to pre-fill its
/// form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureStatus {
    pub aec: bool,
    pub aec_value: u16,
    pub ae_level: i8,
    pub gain_ctrl: bool,
    pub agc_gain: u8,
}

impl From<&CameraSettings> for ExposureStatus {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            aec: settings.aec,
            aec_value: settings.aec_value,
            ae_level: settings.ae_level,
            gain_ctrl: settings.agc,
            agc_gain: settings.agc_gain,
        }
    }
}

/// The `/status` JSON document.
///
/// ```json
/// {"status":"ready","camera":"OV3660","resolution":"QXGA","width":2048,
///  "height":1536,"format":"JPEG","psram":true,"aec":true,...}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub camera: String,
    pub resolution: String,
    pub width: u16,
    pub height: u16,
    pub format: String,
    pub psram: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<ExposureStatus>,
}

impl StatusReport {
    /// Fixed part of the document for a camera capturing at `frame_size`.
    pub fn new(camera: &str, frame_size: FrameSize, psram: bool) -> Self {
        let (width, height) = frame_size.dimensions();
        Self {
            status: "ready".to_string(),
            camera: camera.to_string(),
            resolution: frame_size.label().to_string(),
            width,
            height,
            format: "JPEG".to_string(),
            psram,
            exposure: None,
        }
    }

    /// Add the live exposure fields.
    pub fn with_exposure(mut self, settings: &CameraSettings) -> Self {
        self.exposure = Some(ExposureStatus::from(settings));
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// /control
// ============================================================================

/// Control variables accepted by `/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVar {
    Aec,
    AecValue,
    AeLevel,
    GainCtrl,
    AgcGain,
}

impl ControlVar {
    pub const ALL: [ControlVar; 5] = [
        ControlVar::Aec,
        ControlVar::AecValue,
        ControlVar::AeLevel,
        ControlVar::GainCtrl,
        ControlVar::AgcGain,
    ];

    /// Query-string name.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlVar::Aec => "aec",
            ControlVar::AecValue => "aec_value",
            ControlVar::AeLevel => "ae_level",
            ControlVar::GainCtrl => "gain_ctrl",
            ControlVar::AgcGain => "agc_gain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|var| var.as_str() == name)
    }

    /// The sensor setter this variable drives.
    pub fn control(self) -> Control {
        match self {
            ControlVar::Aec => Control::ExposureCtrl,
            ControlVar::AecValue => Control::AecValue,
            ControlVar::AeLevel => Control::AeLevel,
            ControlVar::GainCtrl => Control::GainCtrl,
            ControlVar::AgcGain => Control::AgcGain,
        }
    }
}

/// Rejected `/control` query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("missing query parameter '{0}'")]
    MissingParam(&'static str),

    #[error("unknown control variable '{0}'")]
    UnknownVar(String),

    #[error("invalid value '{0}'")]
    InvalidValue(String),
}

impl ControlError {
    /// HTTP status for this rejection: 404 for an unknown variable,
    /// 500 for malformed parameters.
    pub fn status_code(&self) -> u16 {
        match self {
            ControlError::UnknownVar(_) => 404,
            ControlError::MissingParam(_) | ControlError::InvalidValue(_) => 500,
        }
    }
}

/// A parsed `/control?var=X&val=N` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub var: ControlVar,
    pub value: i32,
}

impl ControlRequest {
    pub fn from_query(query: &str) -> Result<Self, ControlError> {
        let var = query_param(query, "var").ok_or(ControlError::MissingParam("var"))?;
        let val = query_param(query, "val").ok_or(ControlError::MissingParam("val"))?;

        let var = ControlVar::from_name(&var).ok_or(ControlError::UnknownVar(var))?;
        let value = val
            .trim()
            .parse::<i32>()
            .map_err(|_| ControlError::InvalidValue(val.clone()))?;

        Ok(Self { var, value })
    }
}

// ============================================================================
// /stream
// ============================================================================

/// A parsed `/stream?quality=N` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// JPEG quality, 0-63.
    pub quality: u8,
}

impl StreamRequest {
    pub const DEFAULT_QUALITY: u8 = 8;
    pub const MAX_QUALITY: u8 = CameraSettings::MAX_QUALITY;

    /// Parse the query. A missing or unparsable quality falls back to
    /// [`Self::DEFAULT_QUALITY`]; out-of-range values are clamped.
    pub fn from_query(query: &str) -> Self {
        let quality = query_param(query, "quality")
            .and_then(|q| q.trim().parse::<i64>().ok())
            .map(|q| q.clamp(0, Self::MAX_QUALITY.into()) as u8)
            .unwrap_or(Self::DEFAULT_QUALITY);
        Self { quality }
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            quality: Self::DEFAULT_QUALITY,
        }
    }
}
