//! GrowPod camera web interface on Linux, backed by a simulated sensor.
//!
//! Configuration by environment:
//! - `GROWPOD_BIND`: listen address (default `0.0.0.0:8080`)
//! - `GROWPOD_DATA_DIR`: settings directory (default `./growpod-data`)
//! - `RUST_LOG`: log filter

mod file_store;
mod http;
mod sim;

use file_store::FileBlobStore;
use growpod_core::{CameraHub, FrameSize, SettingsStore};
use growpod_server::{CameraApp, DeviceInfo};
use sim::SimCamera;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,growpod=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("GrowPod camera simulator starting...");

    // Configuration
    let addr: SocketAddr = std::env::var("GROWPOD_BIND")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;
    let data_dir = PathBuf::from(std::env::var("GROWPOD_DATA_DIR").unwrap_or_else(|_| "./growpod-data".into()));

    let mut store = SettingsStore::new(FileBlobStore::new(&data_dir));
    store.init()?;
    tracing::info!("Settings stored in {}", store.backend().root().display());

    let hub = CameraHub::new(SimCamera::new());
    let (settings, _origin) = store.load_or_default();
    let report = hub.apply_settings(&settings)?;
    for control in report.skipped() {
        tracing::warn!("Sensor has no {} setter, skipped", control);
    }

    let device = DeviceInfo {
        frame_size: FrameSize::MAX_SUPPORTED,
        psram: false,
    };
    let app = Arc::new(CameraApp::new(hub, device));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("GrowPod camera ready!");
    tracing::info!("   Home:    http://{}/", addr);
    tracing::info!("   Preview: http://{}/preview", addr);
    tracing::info!("   Status:  http://{}/status", addr);

    axum::serve(listener, http::router(app))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down...");
            }
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
