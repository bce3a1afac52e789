//! DHCP frame assembly and transmission
//!
//! A [`DhcpMessage`] is wrapped DHCP → UDP → IPv4 → Ethernet and written
//! once per output interface, in interface order. Sends carry no
//! cross-interface atomicity: frames already written stay written when a
//! later interface fails.

use super::packet::{DhcpMessage, IP_IDENTIFICATION};
use leasejack_core::{AttackContext, MacAddr, ProtocolId, Result};
use leasejack_packet::{EtherType, PacketBuilder};
use tracing::{debug, error};

/// What to do when one interface fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing interface
    Abort,
    /// Try every interface, then report the first failure
    Continue,
}

/// Build the complete Ethernet frame for `msg` with Ethernet source `src_mac`
pub fn build_frame(msg: &DhcpMessage, src_mac: MacAddr) -> Result<Vec<u8>> {
    PacketBuilder::new()
        .ethernet(src_mac, msg.mac_dest, EtherType::IPv4)
        .ipv4(msg.sip, msg.dip)
        .ttl(64)
        .identification(IP_IDENTIFICATION)
        .dont_fragment(true)
        .tos(0)
        .udp(msg.sport, msg.dport)
        .payload(msg.encode())
        .build()
}

/// Send `msg` on every interface of the attack.
///
/// With `spoof` the Ethernet source is the message's forged source MAC,
/// otherwise each interface's own address. Every success bumps the
/// interface's and the registry's DHCP counters.
pub fn send_message(
    ctx: &AttackContext,
    msg: &DhcpMessage,
    spoof: bool,
    policy: FailurePolicy,
) -> Result<()> {
    let mut first_error = None;

    for iface in &ctx.interfaces {
        let src_mac = if spoof { msg.mac_source } else { iface.mac_address };

        let sent = build_frame(msg, src_mac).and_then(|frame| {
            iface.send_raw(&frame)?;
            Ok(frame.len())
        });

        match sent {
            Ok(bytes) => {
                ctx.record_sent(ProtocolId::DHCP, iface, bytes);
                debug!(interface = %iface.name, bytes, xid = msg.xid, "DHCP frame sent");
            }
            Err(e) => {
                error!(interface = %iface.name, error = %e, "Failed to send DHCP frame");
                ctx.stats.increment_errors();
                match policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
