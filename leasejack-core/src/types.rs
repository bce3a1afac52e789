//! Common types used throughout leasejack

use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff; 6])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00; 6])
    }

    /// Random unicast, locally administered address
    pub fn random_local() -> Self {
        let mut mac = [0u8; 6];
        rand::thread_rng().fill(&mut mac);
        mac[0] &= 0xFE;
        mac[0] |= 0x02;
        Self(mac)
    }

    /// Build from the first six bytes of a slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.get(..6)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| crate::Error::protocol(format!("Invalid MAC address '{}'", s)))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::protocol(format!("Invalid MAC address hex '{}'", s)))?;
        }
        if parts.next().is_some() {
            return Err(crate::Error::protocol(format!("Invalid MAC address '{}'", s)));
        }
        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// Protocol identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(pub u8);

impl ProtocolId {
    pub const DHCP: Self = Self(0);
    pub const ARP: Self = Self(1);

    /// Number of protocol slots tracked by per-protocol counters
    pub const COUNT: usize = 2;

    /// Index into per-protocol counter tables
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolId::DHCP => write!(f, "DHCP"),
            ProtocolId::ARP => write!(f, "ARP"),
            ProtocolId(other) => write!(f, "proto#{}", other),
        }
    }
}

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

/// Protocol-specific constants
pub mod protocol_constants {
    /// DHCP ports
    pub const DHCP_SERVER_PORT: u16 = 67;
    pub const DHCP_CLIENT_PORT: u16 = 68;

    /// IP protocol number for UDP
    pub const IPPROTO_UDP: u8 = 17;
}
