//! GrowPod camera firmware for the XIAO ESP32S3 Sense.
//!
//! Start-up order: settings storage, PSRAM check, camera, stored settings,
//! WiFi, mDNS, HTTP server. Any failure stops the sequence and the firmware
//! idles with whatever came up.

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::http::server::EspHttpServer;
use esp_idf_svc::mdns::EspMdns;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use growpod_core::{CameraHub, SettingsStore};
use growpod_esp32::camera::{psram_size, CameraConfig, EspCamera};
use growpod_esp32::config::{DeviceConfig, WifiConfig};
use growpod_esp32::http::{start_server, EspCameraApp};
use growpod_esp32::mdns::start_mdns;
use growpod_esp32::nvs::NvsBlobStore;
use growpod_esp32::wifi::{connect_wifi, survey_channels};
use growpod_server::DeviceInfo;
use log::{error, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Handles that must outlive `main` for the camera to stay reachable.
struct Services {
    _wifi: BlockingWifi<EspWifi<'static>>,
    _mdns: EspMdns,
    _server: EspHttpServer<'static>,
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("GrowPod ESP32-S3 Camera starting...");

    let _services = match start() {
        Ok(services) => {
            info!("==============================================");
            info!("GrowPod Camera ready!");
            info!("Access via: http://{}.local/", DeviceConfig::default().hostname);
            info!("==============================================");
            Some(services)
        }
        Err(e) => {
            error!("Start-up failed: {:#}", e);
            None
        }
    };

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

fn start() -> Result<Services> {
    let device = DeviceConfig::default();

    let mut store = SettingsStore::new(NvsBlobStore::new());
    store.init()?;
    info!("NVS initialized");

    let psram = psram_size();
    if psram > 0 {
        info!("PSRAM size: {} bytes", psram);
    } else {
        error!("PSRAM not initialized!");
    }

    info!("Initializing camera...");
    let camera_config = CameraConfig::default();
    let camera = EspCamera::init(&camera_config)?;
    let hub = CameraHub::new(camera);

    let (settings, _origin) = store.load_or_default();
    let report = hub.apply_settings(&settings)?;
    for control in report.skipped() {
        warn!("Sensor has no {} setter, skipped", control);
    }
    info!(
        "Camera settings applied: framesize={} quality={}",
        settings.frame_size, settings.quality
    );

    let app = Arc::new(
        EspCameraApp::new(
            hub,
            DeviceInfo {
                frame_size: camera_config.frame_size,
                psram: psram > 0,
            },
        ),
    );

    info!("Initializing WiFi...");
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let wifi_config = WifiConfig::from_build_env();
    let mut wifi = connect_wifi(
        &wifi_config,
        peripherals.modem,
        sysloop,
        store.backend().partition(),
    )?;
    if let Err(e) = survey_channels(&mut wifi, &wifi_config.ssid) {
        warn!("Channel survey failed: {}", e);
    }

    info!("Initializing mDNS...");
    let mdns = start_mdns(&device)?;

    info!("Starting web server...");
    let server = start_server(app, &device)?;

    Ok(Services {
        _wifi: wifi,
        _mdns: mdns,
        _server: server,
    })
}
