//! Packet builder for constructing frames with a fluent API
//!
//! Covers the two stacks leasejack transmits: Ethernet → ARP, and
//! Ethernet → IPv4 → UDP → payload. The builder is consumed by `build()`, so
//! a rejected layer never leaves half-built state behind.

use crate::arp::ArpPacket;
use crate::ethernet::{EtherType, EthernetFrame};
use crate::ip::{IpProtocol, Ipv4Packet};
use crate::udp::UdpDatagram;
use leasejack_core::{Error, MacAddr, Result};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy)]
struct EthernetLayer {
    src: MacAddr,
    dst: MacAddr,
    ethertype: EtherType,
}

#[derive(Debug, Clone, Copy)]
struct Ipv4Layer {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    identification: u16,
    dont_fragment: bool,
    tos: u8,
}

#[derive(Debug, Clone, Copy)]
struct UdpLayer {
    src_port: u16,
    dst_port: u16,
}

/// Packet builder with fluent API
///
/// Frames shorter than the Ethernet minimum are zero-padded to
/// [`EthernetFrame::MIN_FRAME_SIZE`] bytes.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use leasejack_core::MacAddr;
/// use leasejack_packet::{EtherType, EthernetFrame, PacketBuilder};
///
/// let frame = PacketBuilder::new()
///     .ethernet(MacAddr([0x02, 0, 0, 0, 0, 1]), MacAddr::broadcast(), EtherType::IPv4)
///     .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
///     .identification(0x5ab6)
///     .udp(68, 67)
///     .payload(vec![0x01, 0x01, 0x06, 0x00])
///     .build()
///     .unwrap();
/// // 46 bytes of headers and payload, padded
/// assert_eq!(frame.len(), EthernetFrame::MIN_FRAME_SIZE);
///
/// let bootp = PacketBuilder::new()
///     .ethernet(MacAddr([0x02, 0, 0, 0, 0, 1]), MacAddr::broadcast(), EtherType::IPv4)
///     .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
///     .udp(68, 67)
///     .payload(vec![0; 240])
///     .build()
///     .unwrap();
/// assert_eq!(bootp.len(), 14 + 20 + 8 + 240);
/// ```
#[derive(Debug, Default)]
pub struct PacketBuilder {
    ethernet: Option<EthernetLayer>,
    arp: Option<ArpPacket>,
    ipv4: Option<Ipv4Layer>,
    udp: Option<UdpLayer>,
    payload: Vec<u8>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an Ethernet layer
    pub fn ethernet(mut self, src: MacAddr, dst: MacAddr, ethertype: EtherType) -> Self {
        self.ethernet = Some(EthernetLayer { src, dst, ethertype });
        self
    }

    /// Add an ARP body
    pub fn arp(mut self, packet: ArpPacket) -> Self {
        self.arp = Some(packet);
        self
    }

    /// Add an IPv4 layer (TTL 64, DF set, TOS 0, identification 0)
    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.ipv4 = Some(Ipv4Layer {
            src,
            dst,
            ttl: 64,
            identification: 0,
            dont_fragment: true,
            tos: 0,
        });
        self
    }

    /// Set the TTL. Must be called after `ipv4()`.
    pub fn ttl(mut self, ttl: u8) -> Self {
        if let Some(ip) = self.ipv4.as_mut() {
            ip.ttl = ttl;
        }
        self
    }

    /// Set the identification. Must be called after `ipv4()`.
    pub fn identification(mut self, id: u16) -> Self {
        if let Some(ip) = self.ipv4.as_mut() {
            ip.identification = id;
        }
        self
    }

    /// Must be called after `ipv4()`.
    pub fn dont_fragment(mut self, df: bool) -> Self {
        if let Some(ip) = self.ipv4.as_mut() {
            ip.dont_fragment = df;
        }
        self
    }

    /// Must be called after `ipv4()`.
    pub fn tos(mut self, tos: u8) -> Self {
        if let Some(ip) = self.ipv4.as_mut() {
            ip.tos = tos;
        }
        self
    }

    /// Add a UDP layer
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.udp = Some(UdpLayer { src_port, dst_port });
        self
    }

    /// Set the payload data
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the complete frame
    ///
    /// # Errors
    ///
    /// `PacketConstruction` when the layer stack is invalid (no Ethernet,
    /// UDP without IPv4, ARP mixed with IPv4/UDP) or a length field would
    /// overflow.
    pub fn build(self) -> Result<Vec<u8>> {
        let ethernet = self
            .ethernet
            .ok_or_else(|| Error::PacketConstruction("Ethernet layer is required".into()))?;

        if self.arp.is_some() && (self.ipv4.is_some() || self.udp.is_some()) {
            return Err(Error::PacketConstruction(
                "ARP cannot be combined with IPv4 or UDP".into(),
            ));
        }

        let mut data = self.payload;

        if let Some(arp) = self.arp {
            let mut body = arp.to_bytes();
            body.extend_from_slice(&data);
            data = body;
        }

        if let Some(udp) = self.udp {
            let ip = self
                .ipv4
                .ok_or_else(|| Error::PacketConstruction("UDP requires IPv4".into()))?;
            data = UdpDatagram::new(udp.src_port, udp.dst_port, data)
                .to_bytes_with_checksum(ip.src, ip.dst)?;
        }

        if let Some(ip) = self.ipv4 {
            let protocol = match self.udp {
                Some(_) => IpProtocol::UDP,
                None => IpProtocol::Custom(0),
            };
            data = Ipv4Packet::new(ip.src, ip.dst, protocol, data)
                .with_ttl(ip.ttl)
                .with_tos(ip.tos)
                .with_identification(ip.identification)
                .with_dont_fragment(ip.dont_fragment)
                .to_bytes()?;
        }

        Ok(EthernetFrame::new(ethernet.dst, ethernet.src, ethernet.ethertype, data).to_bytes())
    }

    /// Build and hand the frame to `tx`
    pub fn send<F>(self, mut tx: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let frame = self.build()?;
        tx(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;

    const SRC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    #[test]
    fn test_builder_ethernet_ip_udp() {
        let frame = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
            .identification(0x5ab6)
            .udp(68, 67)
            .payload(vec![0xAA; 300])
            .build()
            .unwrap();

        let eth = EthernetFrame::from_bytes(&frame).unwrap();
        assert_eq!(eth.ethertype, EtherType::IPv4);
        let ip = Ipv4Packet::from_bytes(&eth.payload).unwrap();
        assert_eq!(ip.identification, 0x5ab6);
        assert!(ip.dont_fragment);
        assert!(validate_checksum(&eth.payload[..20]));
        let udp = UdpDatagram::from_bytes(&ip.payload).unwrap();
        assert_eq!((udp.source_port, udp.destination_port), (68, 67));
        assert_eq!(udp.payload.len(), 300);
        assert!(udp.validate_checksum(ip.source, ip.destination));
    }

    #[test]
    fn test_builder_pads_short_udp() {
        let frame = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
            .udp(68, 67)
            .payload(vec![0x01, 0x01, 0x06, 0x00])
            .build()
            .unwrap();

        assert_eq!(frame.len(), EthernetFrame::MIN_FRAME_SIZE);
        assert!(frame[14 + 20 + 8 + 4..].iter().all(|b| *b == 0));
        assert_eq!(&frame[14 + 20 + 8..14 + 20 + 8 + 4], &[0x01, 0x01, 0x06, 0x00]);
    }

    #[test]
    fn test_builder_arp() {
        let request = ArpPacket::request(SRC, Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 1));
        let frame = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::ARP)
            .arp(request)
            .build()
            .unwrap();

        assert_eq!(frame.len(), EthernetFrame::MIN_FRAME_SIZE);
        assert_eq!(ArpPacket::parse(&frame[14..]).unwrap(), request);
        assert_eq!(&frame[28..32], &[10, 0, 0, 9]);
    }

    #[test]
    fn test_builder_knobs() {
        let frame = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .ipv4(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2))
            .ttl(128)
            .tos(0x10)
            .dont_fragment(false)
            .udp(1, 2)
            .build()
            .unwrap();

        let ip = Ipv4Packet::from_bytes(&frame[14..]).unwrap();
        assert_eq!(ip.ttl, 128);
        assert_eq!(ip.tos, 0x10);
        assert!(!ip.dont_fragment);
    }

    #[test]
    fn test_builder_rejects_bad_stacks() {
        assert!(PacketBuilder::new().payload(vec![1]).build().is_err());

        let udp_only = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .udp(68, 67)
            .build();
        assert!(matches!(udp_only, Err(Error::PacketConstruction(_))));

        let mixed = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::ARP)
            .arp(ArpPacket::request(SRC, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED))
            .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
            .build();
        assert!(matches!(mixed, Err(Error::PacketConstruction(_))));
    }

    #[test]
    fn test_builder_rejects_oversized_payload() {
        let result = PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .ipv4(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST)
            .udp(68, 67)
            .payload(vec![0; 65_520])
            .build();
        assert!(matches!(result, Err(Error::PacketConstruction(_))));
    }

    #[test]
    fn test_builder_send() {
        let mut sent = Vec::new();
        PacketBuilder::new()
            .ethernet(SRC, MacAddr::broadcast(), EtherType::IPv4)
            .payload(vec![1, 2, 3])
            .send(|frame| {
                sent = frame.to_vec();
                Ok(())
            })
            .unwrap();
        assert_eq!(sent.len(), EthernetFrame::MIN_FRAME_SIZE);
    }
}
