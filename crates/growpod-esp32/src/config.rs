//! Device configuration.
//!
//! Everything here is fixed at build time: the pin map and identity are
//! constants, WiFi credentials come from the build environment.

use serde::{Deserialize, Serialize};

/// mDNS hostname (the camera answers at `growpod-camera.local`).
pub const HOSTNAME: &str = "growpod-camera";

/// mDNS instance name.
pub const INSTANCE_NAME: &str = "GrowPod ESP32-S3 Camera";

/// Network identity and HTTP server sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub hostname: String,
    pub instance_name: String,
    pub http_port: u16,
    /// Stack of the HTTP server task, in bytes.
    pub http_stack_size: usize,
    pub max_uri_handlers: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: HOSTNAME.to_string(),
            instance_name: INSTANCE_NAME.to_string(),
            http_port: 80,
            http_stack_size: 8192,
            max_uri_handlers: 16,
        }
    }
}

/// Station credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    /// WiFi network SSID.
    pub ssid: String,

    /// WiFi network password (empty for open networks).
    pub password: String,

    /// Connection attempts before giving up.
    pub max_attempts: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            max_attempts: 5,
        }
    }
}

impl WifiConfig {
    /// Credentials baked in from `WIFI_SSID` / `WIFI_PASSWORD` at build time.
    pub fn from_build_env() -> Self {
        Self {
            ssid: option_env!("WIFI_SSID").unwrap_or_default().to_string(),
            password: option_env!("WIFI_PASSWORD").unwrap_or_default().to_string(),
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}
