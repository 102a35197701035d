//! mDNS announcement.

use crate::config::DeviceConfig;
use anyhow::Result;
use esp_idf_svc::mdns::EspMdns;
use log::info;
use std::thread;
use std::time::Duration;

/// Time given to the responder to announce before clients are expected.
pub const ANNOUNCE_SETTLE: Duration = Duration::from_secs(2);

/// Start the responder and advertise the HTTP service.
///
/// The returned handle must be kept alive to keep answering queries.
pub fn start_mdns(config: &DeviceConfig) -> Result<EspMdns> {
    let mut mdns = EspMdns::take()?;
    mdns.set_hostname(&config.hostname)?;
    mdns.set_instance_name(&config.instance_name)?;
    mdns.add_service(None, "_http", "_tcp", config.http_port, &[])?;

    info!("mDNS hostname: {}.local", config.hostname);
    thread::sleep(ANNOUNCE_SETTLE);
    Ok(mdns)
}
