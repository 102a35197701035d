//! Camera settings data model.
//!
//! The [`CameraSettings`] record is the only persistent entity of the camera.
//! It is stored as one fixed-size blob (see [`CameraSettings::encode`]) whose
//! first byte is the schema version, so the version gate runs before any
//! other byte is interpreted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Frame Size
// ============================================================================

/// Sensor resolution, numbered like the esp32-camera `framesize_t` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum FrameSize {
    R96x96 = 0,
    Qqvga = 1,
    R128x128 = 2,
    Qcif = 3,
    Hqvga = 4,
    R240x240 = 5,
    Qvga = 6,
    R320x320 = 7,
    Cif = 8,
    Hvga = 9,
    Vga = 10,
    Svga = 11,
    Xga = 12,
    Hd = 13,
    Sxga = 14,
    Uxga = 15,
    Fhd = 16,
    PHd = 17,
    P3mp = 18,
    Qxga = 19,
    Qhd = 20,
    Wqxga = 21,
    PFhd = 22,
    Qsxga = 23,
    R5mp = 24,
}

impl FrameSize {
    /// Every frame size, ordered by code.
    pub const ALL: [FrameSize; 25] = [
        FrameSize::R96x96,
        FrameSize::Qqvga,
        FrameSize::R128x128,
        FrameSize::Qcif,
        FrameSize::Hqvga,
        FrameSize::R240x240,
        FrameSize::Qvga,
        FrameSize::R320x320,
        FrameSize::Cif,
        FrameSize::Hvga,
        FrameSize::Vga,
        FrameSize::Svga,
        FrameSize::Xga,
        FrameSize::Hd,
        FrameSize::Sxga,
        FrameSize::Uxga,
        FrameSize::Fhd,
        FrameSize::PHd,
        FrameSize::P3mp,
        FrameSize::Qxga,
        FrameSize::Qhd,
        FrameSize::Wqxga,
        FrameSize::PFhd,
        FrameSize::Qsxga,
        FrameSize::R5mp,
    ];

    /// Largest resolution the OV3660 delivers.
    pub const MAX_SUPPORTED: FrameSize = FrameSize::Qxga;

    /// Resolution used while an MJPEG stream is active.
    pub const STREAM: FrameSize = FrameSize::Vga;

    /// Look up a frame size by its driver code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Driver code of this frame size.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Short name as used by the camera driver ("VGA", "QXGA", ...).
    pub fn label(self) -> &'static str {
        match self {
            FrameSize::R96x96 => "96X96",
            FrameSize::Qqvga => "QQVGA",
            FrameSize::R128x128 => "128X128",
            FrameSize::Qcif => "QCIF",
            FrameSize::Hqvga => "HQVGA",
            FrameSize::R240x240 => "240X240",
            FrameSize::Qvga => "QVGA",
            FrameSize::R320x320 => "320X320",
            FrameSize::Cif => "CIF",
            FrameSize::Hvga => "HVGA",
            FrameSize::Vga => "VGA",
            FrameSize::Svga => "SVGA",
            FrameSize::Xga => "XGA",
            FrameSize::Hd => "HD",
            FrameSize::Sxga => "SXGA",
            FrameSize::Uxga => "UXGA",
            FrameSize::Fhd => "FHD",
            FrameSize::PHd => "P_HD",
            FrameSize::P3mp => "P_3MP",
            FrameSize::Qxga => "QXGA",
            FrameSize::Qhd => "QHD",
            FrameSize::Wqxga => "WQXGA",
            FrameSize::PFhd => "P_FHD",
            FrameSize::Qsxga => "QSXGA",
            FrameSize::R5mp => "5MP",
        }
    }

    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(self) -> (u16, u16) {
        match self {
            FrameSize::R96x96 => (96, 96),
            FrameSize::Qqvga => (160, 120),
            FrameSize::R128x128 => (128, 128),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::R240x240 => (240, 240),
            FrameSize::Qvga => (320, 240),
            FrameSize::R320x320 => (320, 320),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
            FrameSize::Fhd => (1920, 1080),
            FrameSize::PHd => (720, 1280),
            FrameSize::P3mp => (864, 1536),
            FrameSize::Qxga => (2048, 1536),
            FrameSize::Qhd => (2560, 1440),
            FrameSize::Wqxga => (2560, 1600),
            FrameSize::PFhd => (1080, 1920),
            FrameSize::Qsxga => (2560, 1920),
            FrameSize::R5mp => (2592, 1944),
        }
    }
}

impl From<FrameSize> for u8 {
    fn from(size: FrameSize) -> Self {
        size.code()
    }
}

impl TryFrom<u8> for FrameSize {
    type Error = SettingsError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FrameSize::from_code(code).ok_or(SettingsError::UnknownFrameSize(code))
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Camera Settings
// ============================================================================

/// Errors raised while validating or decoding a settings record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The stored schema version is not the one this build understands.
    #[error("settings version {stored} does not match expected {expected}")]
    VersionMismatch { stored: u8, expected: u8 },

    /// The blob does not have the fixed record size.
    #[error("settings blob is {actual} bytes, expected {expected}")]
    WrongLength { actual: usize, expected: usize },

    /// The frame size code is not a known resolution.
    #[error("unknown frame size code {0}")]
    UnknownFrameSize(u8),

    /// A field lies outside its documented domain.
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: i32 },
}

/// Persistent camera configuration.
///
/// Exactly one record exists at a time. A record whose `version` differs
/// from [`CameraSettings::CURRENT_VERSION`] is never partially trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Schema tag.
    pub version: u8,
    /// Automatic exposure enabled.
    pub aec: bool,
    /// Manual exposure value, 0-1200.
    pub aec_value: u16,
    /// Exposure compensation, -2..=2.
    pub ae_level: i8,
    /// Automatic gain enabled.
    pub agc: bool,
    /// Manual gain, 0-30.
    pub agc_gain: u8,
    /// JPEG quality, 0-63 (lower is better).
    pub quality: u8,
    pub frame_size: FrameSize,
    pub brightness: i8,
    pub contrast: i8,
    pub saturation: i8,
    pub sharpness: i8,
    /// Automatic white balance enabled.
    pub awb: bool,
    pub hmirror: bool,
    pub vflip: bool,
}

impl CameraSettings {
    /// Schema version compiled into this build.
    pub const CURRENT_VERSION: u8 = 1;

    /// Size of the encoded record in bytes.
    pub const ENCODED_LEN: usize = 16;

    /// Highest JPEG quality value (lowest image quality).
    pub const MAX_QUALITY: u8 = 63;

    /// Factory configuration.
    pub fn defaults() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            aec: true,
            aec_value: 300,
            ae_level: 0,
            agc: true,
            agc_gain: 0,
            quality: 4,
            frame_size: FrameSize::MAX_SUPPORTED,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            sharpness: 0,
            awb: true,
            hmirror: false,
            vflip: true,
        }
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn check(field: &'static str, value: i32, min: i32, max: i32) -> Result<(), SettingsError> {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(SettingsError::OutOfRange { field, value })
            }
        }

        check("aec_value", self.aec_value.into(), 0, 1200)?;
        check("ae_level", self.ae_level.into(), -2, 2)?;
        check("agc_gain", self.agc_gain.into(), 0, 30)?;
        check("quality", self.quality.into(), 0, Self::MAX_QUALITY.into())?;
        check("brightness", self.brightness.into(), -2, 2)?;
        check("contrast", self.contrast.into(), -2, 2)?;
        check("saturation", self.saturation.into(), -2, 2)?;
        check("sharpness", self.sharpness.into(), -2, 2)?;
        Ok(())
    }

    /// Encode into the fixed 16-byte storage layout.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let aec_value = self.aec_value.to_le_bytes();
        [
            self.version,
            self.aec as u8,
            aec_value[0],
            aec_value[1],
            self.ae_level as u8,
            self.agc as u8,
            self.agc_gain,
            self.quality,
            self.frame_size.code(),
            self.brightness as u8,
            self.contrast as u8,
            self.saturation as u8,
            self.sharpness as u8,
            self.awb as u8,
            self.hmirror as u8,
            self.vflip as u8,
        ]
    }

    /// Decode a stored blob.
    ///
    /// The version byte is checked before the length so that a record written
    /// by a different schema is reported as a version mismatch, not corruption.
    pub fn decode(bytes: &[u8]) -> Result<Self, SettingsError> {
        if let Some(&stored) = bytes.first() {
            if stored != Self::CURRENT_VERSION {
                return Err(SettingsError::VersionMismatch {
                    stored,
                    expected: Self::CURRENT_VERSION,
                });
            }
        }
        if bytes.len() != Self::ENCODED_LEN {
            return Err(SettingsError::WrongLength {
                actual: bytes.len(),
                expected: Self::ENCODED_LEN,
            });
        }

        let flag = |field: &'static str, byte: u8| match byte {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SettingsError::OutOfRange {
                field,
                value: other.into(),
            }),
        };

        let settings = Self {
            version: bytes[0],
            aec: flag("aec", bytes[1])?,
            aec_value: u16::from_le_bytes([bytes[2], bytes[3]]),
            ae_level: bytes[4] as i8,
            agc: flag("agc", bytes[5])?,
            agc_gain: bytes[6],
            quality: bytes[7],
            frame_size: FrameSize::try_from(bytes[8])?,
            brightness: bytes[9] as i8,
            contrast: bytes[10] as i8,
            saturation: bytes[11] as i8,
            sharpness: bytes[12] as i8,
            awb: flag("awb", bytes[13])?,
            hmirror: flag("hmirror", bytes[14])?,
            vflip: flag("vflip", bytes[15])?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = CameraSettings::defaults();
        assert_eq!(settings.version, CameraSettings::CURRENT_VERSION);
        assert!(settings.aec);
        assert!(settings.agc);
        assert!(settings.awb);
        assert!(settings.vflip);
        assert!(!settings.hmirror);
        assert_eq!(settings.quality, 4);
        assert_eq!(settings.aec_value, 300);
        assert_eq!(settings.frame_size, FrameSize::Qxga);
        assert_eq!(settings.brightness, 0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_frame_size_table() {
        for (code, size) in FrameSize::ALL.iter().enumerate() {
            assert_eq!(size.code() as usize, code);
            assert_eq!(FrameSize::from_code(code as u8), Some(*size));
        }
        assert_eq!(FrameSize::from_code(25), None);
        assert_eq!(FrameSize::Qxga.code(), 19);
        assert_eq!(FrameSize::Qxga.dimensions(), (2048, 1536));
        assert_eq!(FrameSize::Vga.label(), "VGA");
    }

    #[test]
    fn test_encode_layout() {
        let bytes = CameraSettings::defaults().encode();
        assert_eq!(
            bytes,
            [1, 1, 0x2c, 0x01, 0, 1, 0, 4, 19, 0, 0, 0, 0, 1, 0, 1]
        );
    }

    #[test]
    fn test_decode_negative_adjustments() {
        let settings = CameraSettings {
            ae_level: -2,
            brightness: -1,
            contrast: 2,
            saturation: -2,
            sharpness: 1,
            aec: false,
            aec_value: 1200,
            ..CameraSettings::defaults()
        };
        assert_eq!(CameraSettings::decode(&settings.encode()), Ok(settings));
    }

    #[test]
    fn test_decode_version_mismatch() {
        let mut bytes = CameraSettings::defaults().encode();
        bytes[0] = 7;
        assert_eq!(
            CameraSettings::decode(&bytes),
            Err(SettingsError::VersionMismatch {
                stored: 7,
                expected: 1
            })
        );

        // Older schema with a different size is still a version mismatch.
        assert!(matches!(
            CameraSettings::decode(&[0, 1, 2]),
            Err(SettingsError::VersionMismatch { stored: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let bytes = CameraSettings::defaults().encode();
        assert!(matches!(
            CameraSettings::decode(&bytes[..10]),
            Err(SettingsError::WrongLength { actual: 10, .. })
        ));

        let mut bad_size = bytes;
        bad_size[8] = 99;
        assert_eq!(
            CameraSettings::decode(&bad_size),
            Err(SettingsError::UnknownFrameSize(99))
        );

        let mut bad_flag = bytes;
        bad_flag[13] = 2;
        assert!(matches!(
            CameraSettings::decode(&bad_flag),
            Err(SettingsError::OutOfRange { field: "awb", .. })
        ));

        let mut bad_quality = bytes;
        bad_quality[7] = 64;
        assert!(matches!(
            CameraSettings::decode(&bad_quality),
            Err(SettingsError::OutOfRange { field: "quality", .. })
        ));
    }

    #[test]
    fn test_validate() {
        let settings = CameraSettings {
            agc_gain: 31,
            ..CameraSettings::defaults()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::OutOfRange {
                field: "agc_gain",
                value: 31
            })
        );
    }
}
