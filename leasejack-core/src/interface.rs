//! Network interface types

use crate::link::LinkLayer;
use crate::{MacAddr, ProtocolId, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-protocol outbound packet counters
#[derive(Debug, Default)]
pub struct PacketCounters {
    sent: [AtomicU64; ProtocolId::COUNT],
}

impl PacketCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one transmitted frame for `protocol`
    pub fn increment_sent(&self, protocol: ProtocolId) {
        if let Some(counter) = self.sent.get(protocol.index()) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Frames sent so far for `protocol`
    pub fn sent(&self, protocol: ProtocolId) -> u64 {
        self.sent
            .get(protocol.index())
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// One live network attachment.
///
/// Cloning is cheap and shares the link handle and the counters, so several
/// attacks can transmit through the same interface.
#[derive(Clone)]
pub struct Interface {
    /// Interface name (e.g., "eth0", "en0")
    pub name: String,
    /// Interface index
    pub index: u32,
    /// This host's MAC address on the link
    pub mac_address: MacAddr,
    /// MTU (Maximum Transmission Unit)
    pub mtu: u32,
    /// Link-layer send/receive handle
    link: Arc<dyn LinkLayer>,
    /// Outbound counters, one slot per protocol
    counters: Arc<PacketCounters>,
}

impl Interface {
    /// Create a new interface on top of a link handle
    pub fn new(
        name: impl Into<String>,
        index: u32,
        mac_address: MacAddr,
        link: Arc<dyn LinkLayer>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            mac_address,
            mtu: 1500,
            link,
            counters: Arc::new(PacketCounters::new()),
        }
    }

    /// Link-layer handle
    pub fn link(&self) -> &Arc<dyn LinkLayer> {
        &self.link
    }

    /// Write one complete Ethernet frame
    pub fn send_raw(&self, frame: &[u8]) -> Result<()> {
        self.link.send(frame)
    }

    /// Outbound counters for this interface
    pub fn counters(&self) -> &PacketCounters {
        &self.counters
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("mac_address", &self.mac_address)
            .field("mtu", &self.mtu)
            .field("counters", &self.counters)
            .finish()
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}), MTU: {}", self.name, self.mac_address, self.mtu)
    }
}
