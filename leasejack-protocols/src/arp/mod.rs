//! ARP support for the DHCP attacks
//!
//! leasejack does not attack ARP itself. It only uses who-has requests and
//! captured replies to learn the hardware addresses a forged RELEASE must
//! carry.
//!
//! ```text
//! Ethernet header (14) | HTYPE PTYPE HLEN PLEN OPER | SHA (6) | SPA (4) | THA (6) | TPA (4)
//!                                                              ^ frame offset 28
//! ```

pub mod learn;

pub use learn::{learn_mac, send_arp_request, LearnBudget};
