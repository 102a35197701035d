//! WiFi station connection for the camera.

use crate::config::WifiConfig;
use anyhow::{anyhow, bail, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    sys::{esp, esp_wifi_set_ps, wifi_ps_type_t_WIFI_PS_NONE},
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
use growpod_core::survey::{ApSighting, ChannelSurvey};
use log::{error, info, warn};

/// Connect to the configured network.
///
/// Power saving is disabled before the first attempt for lower streaming
/// latency. Up to `config.max_attempts` connections are tried before giving
/// up. The returned driver must be kept alive for the connection to stay up.
pub fn connect_wifi(
    config: &WifiConfig,
    modem: impl Peripheral<P = Modem> + 'static,
    sysloop: EspSystemEventLoop,
    nvs: Option<EspDefaultNvsPartition>,
) -> Result<BlockingWifi<EspWifi<'static>>> {
    if config.ssid.is_empty() {
        bail!("WiFi SSID cannot be empty (set WIFI_SSID at build time)");
    }

    let auth_method = if config.is_open() {
        info!("WiFi password is empty, using open network");
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: config
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID too long (max 32 chars)"))?,
        password: config
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("Password too long (max 64 chars)"))?,
        auth_method,
        ..Default::default()
    }))?;

    esp!(unsafe { esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE) })?;
    info!("WiFi power saving disabled");

    wifi.start()?;

    info!("Connecting to WiFi SSID: {}", config.ssid);
    let mut attempt = 1;
    while let Err(e) = wifi.connect() {
        if attempt >= config.max_attempts {
            error!("Failed to connect to WiFi after {} attempts", attempt);
            return Err(e.into());
        }
        warn!("Retry connecting to WiFi... ({}/{}): {}", attempt, config.max_attempts, e);
        attempt += 1;
    }

    info!("Waiting for DHCP lease...");
    wifi.wait_netif_up()?;

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected!");
    info!("  IP address: {}", ip_info.ip);
    info!("  Gateway:    {}", ip_info.subnet.gateway);

    Ok(wifi)
}

/// Scan the air and log channel congestion around the joined network.
pub fn survey_channels(wifi: &mut BlockingWifi<EspWifi<'static>>, ssid: &str) -> Result<ChannelSurvey> {
    info!("Scanning WiFi channels for congestion analysis...");
    let sightings = wifi.scan()?.into_iter().map(|ap| ApSighting {
        ssid: ap.ssid.to_string(),
        channel: ap.channel,
        rssi: ap.signal_strength,
    });
    let survey = ChannelSurvey::from_sightings(sightings);
    log_survey(&survey, ssid);
    Ok(survey)
}

fn log_survey(survey: &ChannelSurvey, ssid: &str) {
    let mut occupied = survey.occupied().peekable();
    if occupied.peek().is_none() {
        info!("No APs found");
        return;
    }

    info!("WiFi channel congestion:");
    info!("  Channel | APs | Congestion");
    for (channel, count, congestion) in occupied {
        info!("  {:>7} | {:>3} | {}", channel, count, congestion.as_str());
    }

    let Some(report) = survey.report_for(ssid) else {
        info!("'{}' not seen in scan", ssid);
        return;
    };

    info!(
        "'{}' is on channel {} with {} other APs ({} dBm)",
        ssid,
        report.channel,
        report.aps_on_channel.saturating_sub(1),
        report.rssi
    );
    if !report.congested {
        info!("  Channel {} looks good", report.channel);
        return;
    }
    warn!("  Channel {} is congested", report.channel);
    if let Some(better) = report.recommendation {
        info!(
            "  Consider moving the router to channel {} ({} APs)",
            better,
            survey.count(better)
        );
    }
}
