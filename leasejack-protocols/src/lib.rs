//! Protocol implementations for leasejack
//!
//! ## Available Protocols
//!
//! ### DHCP (Dynamic Host Configuration Protocol)
//! Message model, option codec and the four DHCP attacks.
//! See [`dhcp`] module for details.
//!
//! ### ARP
//! Not an attack target. Hardware-address learning used by the DHCP
//! RELEASE DoS. See [`arp`].

pub mod arp;
pub mod dhcp;

pub use dhcp::DhcpProtocol;
