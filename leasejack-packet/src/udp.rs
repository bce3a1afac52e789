//! UDP datagram construction and parsing

use crate::checksum::transport_checksum;
use bytes::{BufMut, BytesMut};
use leasejack_core::{protocol_constants, Error, Result};
use std::net::Ipv4Addr;

/// UDP datagram
#[derive(Debug, Clone)]
pub struct UdpDatagram {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Checksum as found on the wire (zero before serialization)
    pub checksum: u16,
    /// Payload data
    pub payload: Vec<u8>,
}

impl UdpDatagram {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    pub fn new(source_port: u16, destination_port: u16, payload: Vec<u8>) -> Self {
        UdpDatagram {
            source_port,
            destination_port,
            checksum: 0,
            payload,
        }
    }

    /// Header plus payload length, rejected above 65535
    pub fn length(&self) -> Result<u16> {
        let len = Self::HEADER_SIZE + self.payload.len();
        u16::try_from(len)
            .map_err(|_| Error::PacketConstruction(format!("UDP length {} exceeds 65535", len)))
    }

    fn serialize(&self, length: u16, checksum: u16) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(length as usize);
        buffer.put_u16(self.source_port);
        buffer.put_u16(self.destination_port);
        buffer.put_u16(length);
        buffer.put_u16(checksum);
        buffer.put_slice(&self.payload);
        buffer.to_vec()
    }

    /// Serialize with the pseudo-header checksum for `src_ip` → `dst_ip`
    pub fn to_bytes_with_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<Vec<u8>> {
        let length = self.length()?;
        let mut bytes = self.serialize(length, 0);
        let checksum = transport_checksum(src_ip, dst_ip, protocol_constants::IPPROTO_UDP, &bytes);
        // zero means "no checksum" on the wire
        let checksum = if checksum == 0 { 0xFFFF } else { checksum };
        bytes[6..8].copy_from_slice(&checksum.to_be_bytes());
        Ok(bytes)
    }

    /// Parse a UDP datagram.
    ///
    /// The payload is cut at the length field when the capture holds more.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::TruncatedPacket {
                needed: Self::HEADER_SIZE,
                available: data.len(),
            });
        }

        let length = usize::from(u16::from_be_bytes([data[4], data[5]]));
        let end = length.clamp(Self::HEADER_SIZE, data.len());

        Ok(UdpDatagram {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            checksum: u16::from_be_bytes([data[6], data[7]]),
            payload: data[Self::HEADER_SIZE..end].to_vec(),
        })
    }

    /// Check the received checksum; zero means the sender omitted it
    pub fn validate_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> bool {
        if self.checksum == 0 {
            return true;
        }
        let Ok(length) = self.length() else {
            return false;
        };
        let bytes = self.serialize(length, self.checksum);
        transport_checksum(src_ip, dst_ip, protocol_constants::IPPROTO_UDP, &bytes) == 0
    }
}
