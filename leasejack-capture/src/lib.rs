//! Packet capture and transmission for leasejack
//!
//! Implements the core [`LinkLayer`](leasejack_core::LinkLayer) trait on top of
//! real interfaces: `pcap` receives (with a BPF program per
//! [`ProtocolFilter`](leasejack_core::ProtocolFilter)) and `pnet_datalink`
//! writes raw Ethernet frames.
//!
//! ## Example
//!
//! ```no_run
//! use leasejack_capture::{open_interface, CaptureConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let eth0 = open_interface("eth0", &CaptureConfig::default())?;
//! println!("opened {}", eth0);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod filters;
pub mod interface;

// Re-export main types
pub use capture::{CaptureConfig, PcapLink};
pub use interface::{get_interface, list_interfaces, open_interface, InterfaceInfo};
