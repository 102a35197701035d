//! Build script for the GrowPod camera firmware
//!
//! This script sets up the ESP-IDF environment variables needed for compilation.

fn main() {
    // Required for the esp-idf-svc crate to find the IDF toolchain
    embuild::espidf::sysenv::output();

    // WiFi credentials are baked in with option_env!
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");
}
