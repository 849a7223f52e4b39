//! Best-effort host information for device registration
//!
//! Absence of IP or MAC is a valid, expected outcome on a freshly imaged
//! device, not an error; the backend tolerates partial records.

use serde::Serialize;
use std::net::UdpSocket;

/// Interfaces checked for a MAC address, most likely first
const MAC_INTERFACES: [&str; 3] = ["wlan0", "eth0", "end0"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    pub firmware_version: String,
}

pub fn collect() -> SystemInfo {
    SystemInfo {
        ip_address: local_ip(),
        mac_address: mac_address(),
        firmware_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Local IP as seen on the default route. Connecting a UDP socket never
/// sends a packet; it just resolves the source address.
fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

fn mac_address() -> Option<String> {
    for iface in MAC_INTERFACES {
        let path = format!("/sys/class/net/{iface}/address");
        if let Ok(mac) = std::fs::read_to_string(&path) {
            let mac = mac.trim();
            if !mac.is_empty() && mac != "00:00:00:00:00:00" {
                return Some(mac.to_string());
            }
        }
    }
    None
}
