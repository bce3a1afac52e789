//! Frame construction and parsing for leasejack
//!
//! Builds the two frame shapes the DHCP attacks transmit:
//!
//! - **Ethernet → ARP** for hardware-address learning
//! - **Ethernet → IPv4 → UDP → payload** for DHCP messages
//!
//! The [`builder`] module is the high-level entry point. The per-layer
//! modules ([`ethernet`], [`arp`], [`ip`], [`udp`]) also parse captured
//! bytes back into typed headers, returning `TruncatedPacket` instead of
//! reading past the capture.
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use leasejack_core::MacAddr;
//! use leasejack_packet::{ArpPacket, EtherType, PacketBuilder};
//!
//! let me = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
//! let who_has = ArpPacket::request(me, Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 1));
//!
//! let frame = PacketBuilder::new()
//!     .ethernet(me, MacAddr::broadcast(), EtherType::ARP)
//!     .arp(who_has)
//!     .build()
//!     .unwrap();
//! assert_eq!(&frame[28..32], &[10, 0, 0, 9]);
//! ```

pub mod arp;
pub mod builder;
pub mod checksum;
pub mod ethernet;
pub mod ip;
pub mod udp;

// Re-export commonly used types for convenience
pub use arp::{ArpOperation, ArpPacket};
pub use builder::PacketBuilder;
pub use checksum::{internet_checksum, transport_checksum};
pub use ethernet::{EtherType, EthernetFrame};
pub use ip::{IpProtocol, Ipv4Packet};
pub use udp::UdpDatagram;
