//! Ethernet II frame construction and parsing

use bytes::{BufMut, BytesMut};
use leasejack_core::{ethertypes, Error, MacAddr, Result};
use std::fmt;

/// EtherType values used by leasejack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// Any other EtherType
    Custom(u16),
}

impl EtherType {
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => ethertypes::IPV4,
            EtherType::ARP => ethertypes::ARP,
            EtherType::Custom(val) => val,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            ethertypes::IPV4 => EtherType::IPv4,
            ethertypes::ARP => EtherType::ARP,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Ethernet II frame
#[derive(Debug, Clone)]
pub struct EthernetFrame {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// EtherType
    pub ethertype: EtherType,
    /// Payload data
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Minimum Ethernet frame size (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Ethernet header size (dst + src + type)
    pub const HEADER_SIZE: usize = 14;

    pub fn new(destination: MacAddr, source: MacAddr, ethertype: EtherType, payload: Vec<u8>) -> Self {
        EthernetFrame {
            destination,
            source,
            ethertype,
            payload,
        }
    }

    /// Serialize, zero-padding short frames to the 60-byte minimum
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = (Self::HEADER_SIZE + self.payload.len()).max(Self::MIN_FRAME_SIZE);
        let mut buffer = BytesMut::with_capacity(len);

        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_u16(self.ethertype.to_u16());
        buffer.put_slice(&self.payload);

        if buffer.len() < Self::MIN_FRAME_SIZE {
            buffer.resize(Self::MIN_FRAME_SIZE, 0);
        }
        buffer.to_vec()
    }

    /// Parse an Ethernet II frame; the payload keeps any link padding
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::TruncatedPacket {
                needed: Self::HEADER_SIZE,
                available: data.len(),
            });
        }

        Ok(EthernetFrame {
            destination: MacAddr::from_slice(&data[0..6]).unwrap_or_default(),
            source: MacAddr::from_slice(&data[6..12]).unwrap_or_default(),
            ethertype: EtherType::from_u16(u16::from_be_bytes([data[12], data[13]])),
            payload: data[Self::HEADER_SIZE..].to_vec(),
        })
    }
}
