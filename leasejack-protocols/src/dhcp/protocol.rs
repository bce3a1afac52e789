//! DHCP Protocol implementation
//!
//! Publishes the attack catalogue, launches attacks on the executor and
//! keeps passive-mode statistics for captured DHCP frames.

use super::attack::{DiscoverFlood, ReleaseDos, RogueServer, SendRaw, OPTIONS_PARAM, SPOOF_SOURCE};
use super::packet::{DhcpField, DhcpMessage, DhcpMessageType};
use super::tlv::decode;
use async_trait::async_trait;
use leasejack_attack::AttackExecutor;
use leasejack_core::{
    Attack, AttackDescriptor, AttackHandle, AttackId, AttackParams, Error, Interface, Packet,
    PacketCounters, ParamDescriptor, ParameterType, Protocol, ProtocolFilter, ProtocolId,
    ProtocolStats, Result,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ATTACK_SEND_RAW: AttackId = AttackId(0);
pub const ATTACK_DISCOVER_FLOOD: AttackId = AttackId(1);
pub const ATTACK_ROGUE_SERVER: AttackId = AttackId(2);
pub const ATTACK_RELEASE_DOS: AttackId = AttackId(3);

const MESSAGE_KINDS: usize = 8;

/// Passive-mode counters, indexed by message type
#[derive(Debug, Default)]
pub struct DhcpStats {
    pub total_packets: AtomicU64,
    pub bytes_received: AtomicU64,
    pub parse_errors: AtomicU64,
    /// Frames without a recognisable MessageType
    pub untyped: AtomicU64,
    received: [AtomicU64; MESSAGE_KINDS],
}

impl DhcpStats {
    pub fn record_received(&self, kind: DhcpMessageType) {
        self.received[kind as usize - 1].fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self, kind: DhcpMessageType) -> u64 {
        self.received[kind as usize - 1].load(Ordering::Relaxed)
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }
}

const ALL_KINDS: [DhcpMessageType; MESSAGE_KINDS] = [
    DhcpMessageType::Discover,
    DhcpMessageType::Offer,
    DhcpMessageType::Request,
    DhcpMessageType::Decline,
    DhcpMessageType::Ack,
    DhcpMessageType::Nak,
    DhcpMessageType::Release,
    DhcpMessageType::Inform,
];

fn spoof_param() -> ParamDescriptor {
    ParamDescriptor::new(SPOOF_SOURCE, ParameterType::Bool)
        .with_description("Send from the template's forged MAC instead of the interface MAC")
        .with_default("true")
}

fn catalogue() -> Vec<AttackDescriptor> {
    let mut raw_params: Vec<ParamDescriptor> = DhcpField::FIXED
        .iter()
        .map(|field| {
            ParamDescriptor::new(field.name(), ParameterType::String)
                .with_description("Override of the template field")
        })
        .collect();
    raw_params.push(
        ParamDescriptor::new(OPTIONS_PARAM, ParameterType::String)
            .with_description("Replacement options, as code=value pairs separated by commas"),
    );
    raw_params.push(spoof_param());

    let range = |what: &'static str| {
        [
            ParamDescriptor::new("start_ip", ParameterType::IpAddr)
                .with_description(what)
                .required(),
            ParamDescriptor::new("end_ip", ParameterType::IpAddr)
                .with_description("Last address of the range, inclusive")
                .required(),
        ]
    };

    let mut rogue_params = range("First address handed out").to_vec();
    rogue_params.extend([
        ParamDescriptor::new("server", ParameterType::IpAddr)
            .with_description("Address the rogue server answers from")
            .required(),
        ParamDescriptor::new("router", ParameterType::IpAddr)
            .with_description("Router option, defaults to the server"),
        ParamDescriptor::new("dns", ParameterType::IpAddr)
            .with_description("DNS option, defaults to the server"),
        ParamDescriptor::new("subnet", ParameterType::IpAddr).with_default("255.255.255.0"),
        ParamDescriptor::new("lease", ParameterType::U32)
            .with_description("Lease time in seconds")
            .with_default("3600"),
        ParamDescriptor::new("renew", ParameterType::U32)
            .with_description("Renewal time in seconds")
            .with_default("1800"),
        ParamDescriptor::new("domain", ParameterType::String).with_default("localdomain"),
        spoof_param(),
    ]);

    let mut release_params = range("First address to release").to_vec();
    release_params.extend([
        ParamDescriptor::new("server", ParameterType::IpAddr)
            .with_description("DHCP server to send the RELEASEs to")
            .required(),
        ParamDescriptor::new("client_ip", ParameterType::IpAddr)
            .with_description("Sender address of our ARP requests")
            .with_default("0.0.0.0"),
        ParamDescriptor::new("settle_ms", ParameterType::U64)
            .with_description("Pause after learning the server MAC")
            .with_default("0"),
        ParamDescriptor::new("arp_attempts", ParameterType::U32).with_default("500"),
        ParamDescriptor::new("arp_interval_ms", ParameterType::U64).with_default("800"),
        ParamDescriptor::new("arp_timeout_ms", ParameterType::U64).with_default("5000"),
        spoof_param(),
    ]);

    vec![
        AttackDescriptor {
            id: ATTACK_SEND_RAW,
            name: "sending RAW packet",
            description: "Send the template DHCP packet once, with optional field and option overrides",
            continuous: false,
            parameters: raw_params,
        },
        AttackDescriptor {
            id: ATTACK_DISCOVER_FLOOD,
            name: "sending DISCOVER packet",
            description: "Flood DISCOVERs from random hardware addresses to exhaust the pool",
            continuous: true,
            parameters: vec![
                ParamDescriptor::new("interval_ms", ParameterType::U64)
                    .with_description("Pause between DISCOVERs")
                    .with_default("0"),
                spoof_param(),
            ],
        },
        AttackDescriptor {
            id: ATTACK_ROGUE_SERVER,
            name: "creating DHCP rogue server",
            description: "Answer DISCOVER and REQUEST with forged OFFER and ACK",
            continuous: true,
            parameters: rogue_params,
        },
        AttackDescriptor {
            id: ATTACK_RELEASE_DOS,
            name: "sending RELEASE packet",
            description: "Release every lease in a range on behalf of its holder",
            continuous: true,
            parameters: release_params,
        },
    ]
}

/// DHCP Protocol implementation
pub struct DhcpProtocol {
    attacks: Vec<AttackDescriptor>,
    template: DhcpMessage,
    stats: DhcpStats,
    counters: Arc<PacketCounters>,
}

impl DhcpProtocol {
    /// `counters` is the registry-wide outbound counter set shared by every
    /// attack this protocol launches
    pub fn new(counters: Arc<PacketCounters>) -> Self {
        Self {
            attacks: catalogue(),
            template: DhcpMessage::discover(),
            stats: DhcpStats::default(),
            counters,
        }
    }

    /// Message every attack starts from, instead of the default DISCOVER
    pub fn with_template(mut self, template: DhcpMessage) -> Self {
        self.template = template;
        self
    }

    pub fn template(&self) -> &DhcpMessage {
        &self.template
    }

    pub fn dhcp_stats(&self) -> &DhcpStats {
        &self.stats
    }

    fn build_attack(&self, attack_id: AttackId) -> Result<Arc<dyn Attack>> {
        let template = self.template.clone();
        let attack: Arc<dyn Attack> = match attack_id {
            ATTACK_SEND_RAW => Arc::new(SendRaw::new(template)),
            ATTACK_DISCOVER_FLOOD => Arc::new(DiscoverFlood::new(template)),
            ATTACK_ROGUE_SERVER => Arc::new(RogueServer::new(template)),
            ATTACK_RELEASE_DOS => Arc::new(ReleaseDos::new(template)),
            _ => return Err(Error::InvalidAttackId(attack_id.0)),
        };
        Ok(attack)
    }
}

#[async_trait]
impl Protocol for DhcpProtocol {
    fn name(&self) -> &'static str {
        "Dynamic Host Configuration Protocol"
    }

    fn shortname(&self) -> &'static str {
        "dhcp"
    }

    fn id(&self) -> ProtocolId {
        ProtocolId::DHCP
    }

    fn capture_filter(&self) -> ProtocolFilter {
        ProtocolFilter::Dhcp
    }

    fn attacks(&self) -> &[AttackDescriptor] {
        &self.attacks
    }

    fn handle_packet(&self, packet: &Packet) -> Result<()> {
        self.stats.total_packets.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_received
            .fetch_add(packet.len() as u64, Ordering::Relaxed);

        let kind = decode(packet.data()).and_then(|mut decoded| decoded.message_type());
        match kind {
            Ok(Some(value)) => match DhcpMessageType::from_u8(value) {
                Some(kind) => {
                    self.stats.record_received(kind);
                    debug!(interface = %packet.interface, kind = %kind, "DHCP packet");
                }
                None => {
                    self.stats.untyped.fetch_add(1, Ordering::Relaxed);
                    debug!(interface = %packet.interface, value, "Unknown DHCP message type");
                }
            },
            Ok(None) => {
                self.stats.untyped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.record_parse_error();
                warn!(interface = %packet.interface, error = %e, "Failed to parse DHCP packet");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn launch_attack(
        &self,
        attack_id: AttackId,
        params: AttackParams,
        interfaces: &[Interface],
    ) -> Result<AttackHandle> {
        if interfaces.is_empty() {
            return Err(Error::Interface("DHCP attacks need at least one interface".to_string()));
        }
        let attack = self.build_attack(attack_id)?;

        info!(
            attack_id = %attack_id,
            attack = attack.name(),
            interfaces = interfaces.len(),
            "Launching DHCP attack"
        );

        AttackExecutor::new("DHCP", attack.name()).execute(
            attack,
            interfaces.to_vec(),
            params,
            self.counters.clone(),
        )
    }

    fn stats(&self) -> ProtocolStats {
        let total = self.stats.total_packets.load(Ordering::Relaxed);
        let errors = self.stats.parse_errors.load(Ordering::Relaxed);

        let mut stats = ProtocolStats {
            packets_received: total,
            packets_parsed: total.saturating_sub(errors),
            packets_errors: errors,
            bytes_received: self.stats.bytes_received.load(Ordering::Relaxed),
            packets_sent: self.counters.sent(ProtocolId::DHCP),
            ..Default::default()
        };
        for kind in ALL_KINDS {
            stats.custom.insert(
                format!("{}_received", kind.as_str().to_lowercase()),
                self.stats.received(kind),
            );
        }
        stats
    }
}
