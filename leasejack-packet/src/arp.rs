//! ARP (RFC 826) for Ethernet/IPv4

use bytes::{BufMut, BytesMut};
use leasejack_core::{ethertypes, Error, MacAddr, Result};
use std::net::Ipv4Addr;

/// ARP operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

impl ArpOperation {
    pub fn to_u16(self) -> u16 {
        match self {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::Other(op) => op,
        }
    }

    pub fn from_u16(op: u16) -> Self {
        match op {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Other(other),
        }
    }
}

/// ARP packet body as carried after the Ethernet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: ArpOperation,
    pub sender_hw: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Size of an Ethernet/IPv4 ARP body
    pub const SIZE: usize = 28;

    /// Offset of the sender protocol address inside the body
    pub const SENDER_IP_OFFSET: usize = 14;

    const HTYPE_ETHERNET: u16 = 1;

    /// Who-has `target_ip`, with an all-zero target hardware address
    pub fn request(sender_hw: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        ArpPacket {
            operation: ArpOperation::Request,
            sender_hw,
            sender_ip,
            target_hw: MacAddr::zero(),
            target_ip,
        }
    }

    /// `sender_ip` is-at `sender_hw`, addressed to the requester
    pub fn reply(sender_hw: MacAddr, sender_ip: Ipv4Addr, target_hw: MacAddr, target_ip: Ipv4Addr) -> Self {
        ArpPacket {
            operation: ArpOperation::Reply,
            sender_hw,
            sender_ip,
            target_hw,
            target_ip,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::SIZE);
        buffer.put_u16(Self::HTYPE_ETHERNET);
        buffer.put_u16(ethertypes::IPV4);
        buffer.put_u8(6);
        buffer.put_u8(4);
        buffer.put_u16(self.operation.to_u16());
        buffer.put_slice(self.sender_hw.as_bytes());
        buffer.put_slice(&self.sender_ip.octets());
        buffer.put_slice(self.target_hw.as_bytes());
        buffer.put_slice(&self.target_ip.octets());
        buffer.to_vec()
    }

    /// Parse an Ethernet/IPv4 ARP body
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedPacket {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        if data[4] != 6 || data[5] != 4 {
            return Err(Error::PacketParsing(format!(
                "unsupported ARP address sizes {}/{}",
                data[4], data[5]
            )));
        }

        let ip_at = |at: usize| Ipv4Addr::new(data[at], data[at + 1], data[at + 2], data[at + 3]);
        Ok(ArpPacket {
            operation: ArpOperation::from_u16(u16::from_be_bytes([data[6], data[7]])),
            sender_hw: MacAddr::from_slice(&data[8..14]).unwrap_or_default(),
            sender_ip: ip_at(14),
            target_hw: MacAddr::from_slice(&data[18..24]).unwrap_or_default(),
            target_ip: ip_at(24),
        })
    }
}
