//! IPv4 packet construction and parsing

use crate::checksum::internet_checksum;
use bytes::{BufMut, BytesMut};
use leasejack_core::{protocol_constants, Error, Result};
use std::net::Ipv4Addr;

/// IP protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// UDP (17)
    UDP,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::UDP => protocol_constants::IPPROTO_UDP,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            protocol_constants::IPPROTO_UDP => IpProtocol::UDP,
            val => IpProtocol::Custom(val),
        }
    }
}

/// IPv4 packet without header options
#[derive(Debug, Clone)]
pub struct Ipv4Packet {
    /// Type of Service
    pub tos: u8,
    /// Identification
    pub identification: u16,
    /// Don't Fragment flag
    pub dont_fragment: bool,
    /// Time to Live
    pub ttl: u8,
    /// Protocol
    pub protocol: IpProtocol,
    /// Header checksum as found on the wire (zero before serialization)
    pub checksum: u16,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
    /// Payload data
    pub payload: Vec<u8>,
}

impl Ipv4Packet {
    /// IPv4 header size without options
    pub const HEADER_SIZE: usize = 20;

    /// Maximum IPv4 packet size
    pub const MAX_PACKET_SIZE: usize = 65535;

    const DONT_FRAGMENT: u16 = 0x4000;

    /// TTL 64, DF set, TOS 0, identification 0
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: IpProtocol, payload: Vec<u8>) -> Self {
        Ipv4Packet {
            tos: 0,
            identification: 0,
            dont_fragment: true,
            ttl: 64,
            protocol,
            checksum: 0,
            source,
            destination,
            payload,
        }
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tos(mut self, tos: u8) -> Self {
        self.tos = tos;
        self
    }

    pub fn with_identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn with_dont_fragment(mut self, df: bool) -> Self {
        self.dont_fragment = df;
        self
    }

    /// Header plus payload length, rejected above 65535
    pub fn total_length(&self) -> Result<u16> {
        let total = Self::HEADER_SIZE + self.payload.len();
        u16::try_from(total).map_err(|_| {
            Error::PacketConstruction(format!(
                "IPv4 total length {} exceeds {}",
                total,
                Self::MAX_PACKET_SIZE
            ))
        })
    }

    fn header(&self, total_length: u16, checksum: u16) -> [u8; Self::HEADER_SIZE] {
        let mut header = [0u8; Self::HEADER_SIZE];
        header[0] = 0x45;
        header[1] = self.tos;
        header[2..4].copy_from_slice(&total_length.to_be_bytes());
        header[4..6].copy_from_slice(&self.identification.to_be_bytes());
        let flags = if self.dont_fragment { Self::DONT_FRAGMENT } else { 0 };
        header[6..8].copy_from_slice(&flags.to_be_bytes());
        header[8] = self.ttl;
        header[9] = self.protocol.to_u8();
        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        header[12..16].copy_from_slice(&self.source.octets());
        header[16..20].copy_from_slice(&self.destination.octets());
        header
    }

    /// Serialize with a freshly computed header checksum
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total_length = self.total_length()?;
        let checksum = internet_checksum(&self.header(total_length, 0));

        let mut buffer = BytesMut::with_capacity(total_length as usize);
        buffer.put_slice(&self.header(total_length, checksum));
        buffer.put_slice(&self.payload);
        Ok(buffer.to_vec())
    }

    /// Parse an IPv4 packet.
    ///
    /// Header options are skipped. The payload is cut at the total length
    /// field when the capture holds more (link padding), and keeps whatever
    /// was captured when it holds less.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::TruncatedPacket {
                needed: Self::HEADER_SIZE,
                available: data.len(),
            });
        }
        if data[0] >> 4 != 4 {
            return Err(Error::PacketParsing(format!("IP version {}", data[0] >> 4)));
        }

        let header_len = usize::from(data[0] & 0x0F) * 4;
        if header_len < Self::HEADER_SIZE {
            return Err(Error::PacketParsing(format!("IHL {} too small", header_len)));
        }
        if data.len() < header_len {
            return Err(Error::TruncatedPacket {
                needed: header_len,
                available: data.len(),
            });
        }

        let total_length = usize::from(u16::from_be_bytes([data[2], data[3]]));
        let end = total_length.clamp(header_len, data.len());

        Ok(Ipv4Packet {
            tos: data[1],
            identification: u16::from_be_bytes([data[4], data[5]]),
            dont_fragment: u16::from_be_bytes([data[6], data[7]]) & Self::DONT_FRAGMENT != 0,
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            checksum: u16::from_be_bytes([data[10], data[11]]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload: data[header_len..end].to_vec(),
        })
    }
}
