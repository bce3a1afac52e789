//! Network interface enumeration and opening

use crate::capture::{CaptureConfig, PcapLink};
use leasejack_core::{Error, Interface, MacAddr, Result};
use pnet_datalink::{self, NetworkInterface};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::info;

/// Information about a network interface
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// OS interface index
    pub index: u32,
    /// MAC address if available
    pub mac: Option<MacAddr>,
    /// List of IP addresses assigned to this interface
    pub ips: Vec<IpAddr>,
    /// Whether the interface is up
    pub is_up: bool,
    /// Whether the interface is a loopback
    pub is_loopback: bool,
}

fn mac_of(iface: &NetworkInterface) -> Option<MacAddr> {
    iface
        .mac
        .map(|m| MacAddr([m.0, m.1, m.2, m.3, m.4, m.5]))
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        InterfaceInfo {
            name: iface.name.clone(),
            description: iface.description.clone(),
            index: iface.index,
            mac: mac_of(iface),
            ips: iface.ips.iter().map(|network| network.ip()).collect(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// Up, not loopback, and with a hardware address to forge from
    pub fn is_capture_capable(&self) -> bool {
        self.is_up && !self.is_loopback && self.mac.is_some()
    }

    /// Get the primary IPv4 address if available
    pub fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        self.ips.iter().find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
    }
}

fn find(name: &str) -> Result<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

/// List all available network interfaces
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::Capture(
            "No network interfaces found. Are you running with sufficient privileges?".to_string(),
        ));
    }

    Ok(interfaces.iter().map(InterfaceInfo::from).collect())
}

/// Get information about a specific interface by name
pub fn get_interface(name: &str) -> Result<InterfaceInfo> {
    find(name).map(|iface| InterfaceInfo::from(&iface))
}

/// Open `name` for raw send and capture
pub fn open_interface(name: &str, config: &CaptureConfig) -> Result<Interface> {
    let iface = find(name)?;
    let mac = mac_of(&iface)
        .ok_or_else(|| Error::Interface(format!("Interface {} has no hardware address", name)))?;

    let link = PcapLink::open(&iface, config)?;
    info!(interface = %name, mac = %mac, index = iface.index, "opened interface");

    Ok(Interface::new(name, iface.index, mac, Arc::new(link)))
}
