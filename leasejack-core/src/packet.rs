//! Packet types

use std::time::SystemTime;

/// A captured or constructed frame
#[derive(Debug, Clone)]
pub struct Packet {
    /// When the packet was captured/created
    pub timestamp: SystemTime,
    /// Interface the packet was received on
    pub interface: String,
    /// Captured bytes (including all headers)
    pub data: Vec<u8>,
    /// Length on the wire (may exceed `data.len()` if the capture was truncated)
    pub len: usize,
}

impl Packet {
    /// Create a new packet
    pub fn new(interface: impl Into<String>, data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            timestamp: SystemTime::now(),
            interface: interface.into(),
            data,
            len,
        }
    }

    /// Get packet data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes actually captured
    pub fn caplen(&self) -> usize {
        self.data.len()
    }

    /// Get packet length on the wire
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if packet is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
