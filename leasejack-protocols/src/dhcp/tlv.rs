//! DHCP option (TLV) codec
//!
//! Captured frames are attacker-controlled, so nothing here indexes a raw
//! buffer directly: [`FrameView`] validates the capture length against every
//! fixed field before any of them is read, and [`OptionCursor`] checks each
//! option read against the end of the capture.
//!
//! - [`decode`] renders a capture into the printable field table plus a lazy
//!   option sequence.
//! - [`load_fixed_fields`] copies a capture into a [`DhcpMessage`] without any
//!   rendering, for reuse by later sends.
//! - [`DhcpMessage::edit_option`] adds or deletes single options in place.

use super::packet::{
    DhcpField, DhcpMessage, DhcpMessageType, OptionCode, OptionFormat, FIXED_HEADER_SIZE,
    MAX_OPTIONS_SIZE, MAX_TLV, MAX_VALUE_LENGTH, OPTIONS_OFFSET,
};
use leasejack_core::{ethertypes, Error, MacAddr, Result};
use std::fmt;
use std::net::Ipv4Addr;

const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const CHADDR_OFFSET: usize = 28;

/// Bounds-checked read position inside one option region.
///
/// `base` is the region's offset inside the capture, so errors report
/// capture offsets.
#[derive(Debug, Clone)]
pub struct OptionCursor<'a> {
    buf: &'a [u8],
    offset: usize,
    base: usize,
}

impl<'a> OptionCursor<'a> {
    pub fn new(buf: &'a [u8], base: usize) -> Self {
        Self { buf, offset: 0, base }
    }

    /// Offset of the next read inside the region
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Offset of the next read inside the capture
    pub fn capture_offset(&self) -> usize {
        self.base + self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, wanted: usize) -> Error {
        Error::TruncatedPacket {
            needed: self.base + self.offset + wanted,
            available: self.base + self.buf.len(),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.offset).ok_or_else(|| self.truncated(1))?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or_else(|| self.truncated(len))?;
        let slice = self.buf.get(self.offset..end).ok_or_else(|| self.truncated(len))?;
        self.offset = end;
        Ok(slice)
    }
}

/// Offsets of every header inside a captured Ethernet/IPv4/UDP/DHCP frame.
///
/// `parse` checks the capture holds the Ethernet header, the full IPv4
/// header, the UDP header and the DHCP fixed header before handing out
/// any field.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    frame: &'a [u8],
    ip: usize,
    udp: usize,
    dhcp: usize,
}

impl<'a> FrameView<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self> {
        if frame.len() < ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN {
            return Err(Error::TruncatedPacket {
                needed: ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN,
                available: frame.len(),
            });
        }

        let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
        if ethertype != ethertypes::IPV4 {
            return Err(Error::PacketParsing(format!(
                "ethertype 0x{:04X} is not IPv4",
                ethertype
            )));
        }

        let ip = ETHERNET_HEADER_LEN;
        let version_ihl = frame[ip];
        if version_ihl >> 4 != 4 {
            return Err(Error::PacketParsing(format!("IP version {}", version_ihl >> 4)));
        }
        let ihl = usize::from(version_ihl & 0x0F) * 4;
        if ihl < IPV4_MIN_HEADER_LEN {
            return Err(Error::PacketParsing(format!("IHL {} too small", ihl)));
        }

        let udp = ip + ihl;
        let dhcp = udp + UDP_HEADER_LEN;
        let needed = dhcp + FIXED_HEADER_SIZE;
        if frame.len() < needed {
            return Err(Error::TruncatedPacket {
                needed,
                available: frame.len(),
            });
        }

        Ok(Self { frame, ip, udp, dhcp })
    }

    fn mac_at(&self, at: usize) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.frame[at..at + 6]);
        MacAddr(mac)
    }

    fn ip_at(&self, at: usize) -> Ipv4Addr {
        let f = self.frame;
        Ipv4Addr::new(f[at], f[at + 1], f[at + 2], f[at + 3])
    }

    fn u16_at(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.frame[at], self.frame[at + 1]])
    }

    pub fn source_mac(&self) -> MacAddr {
        self.mac_at(6)
    }

    pub fn destination_mac(&self) -> MacAddr {
        self.mac_at(0)
    }

    pub fn source_ip(&self) -> Ipv4Addr {
        self.ip_at(self.ip + 12)
    }

    pub fn destination_ip(&self) -> Ipv4Addr {
        self.ip_at(self.ip + 16)
    }

    pub fn source_port(&self) -> u16 {
        self.u16_at(self.udp)
    }

    pub fn destination_port(&self) -> u16 {
        self.u16_at(self.udp + 2)
    }

    /// DHCP fixed header
    pub fn header(&self) -> &'a [u8] {
        &self.frame[self.dhcp..self.dhcp + FIXED_HEADER_SIZE]
    }

    /// Captured option bytes; empty when the capture stops before them
    pub fn options(&self) -> &'a [u8] {
        self.frame.get(self.dhcp + OPTIONS_OFFSET..).unwrap_or(&[])
    }

    /// Capture offset of the first option byte
    pub fn options_offset(&self) -> usize {
        self.dhcp + OPTIONS_OFFSET
    }

    pub fn xid(&self) -> u32 {
        let h = self.header();
        u32::from_be_bytes([h[4], h[5], h[6], h[7]])
    }

    pub fn client_mac(&self) -> MacAddr {
        self.mac_at(self.dhcp + CHADDR_OFFSET)
    }

    /// Copy the framing and fixed header fields into `msg`
    fn fill(&self, msg: &mut DhcpMessage) {
        let h = self.header();
        let at = self.dhcp;

        msg.mac_dest = self.destination_mac();
        msg.mac_source = self.source_mac();
        msg.sip = self.source_ip();
        msg.dip = self.destination_ip();
        msg.sport = self.source_port();
        msg.dport = self.destination_port();
        msg.op = h[0];
        msg.htype = h[1];
        msg.hlen = h[2];
        msg.hops = h[3];
        msg.xid = self.xid();
        msg.secs = u16::from_be_bytes([h[8], h[9]]);
        msg.flags = u16::from_be_bytes([h[10], h[11]]);
        msg.ciaddr = self.ip_at(at + 12);
        msg.yiaddr = self.ip_at(at + 16);
        msg.siaddr = self.ip_at(at + 20);
        msg.giaddr = self.ip_at(at + 24);
        msg.chaddr = self.client_mac();
    }
}

/// One decoded option, borrowing its value from the capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOption<'a> {
    pub code: OptionCode,
    pub value: &'a [u8],
    pub text: String,
}

impl RenderedOption<'_> {
    pub fn label(&self) -> &'static str {
        self.code.label()
    }
}

impl fmt::Display for RenderedOption<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            f.write_str(self.label())
        } else {
            write!(f, "{} {}", self.label(), self.text)
        }
    }
}

fn render_value(code: OptionCode, value: &[u8], offset: usize) -> Result<String> {
    let short = || Error::MalformedOption {
        offset,
        code: code.code(),
        reason: "value shorter than 4 bytes",
    };

    let text = match code.format() {
        OptionFormat::Marker => String::new(),
        OptionFormat::Byte => format!("{:02X}", value[0]),
        OptionFormat::Seconds => {
            let v = value.get(..4).ok_or_else(short)?;
            format!("{:08X}", u32::from_be_bytes([v[0], v[1], v[2], v[3]]))
        }
        OptionFormat::Address => {
            let v = value.get(..4).ok_or_else(short)?;
            Ipv4Addr::new(v[0], v[1], v[2], v[3]).to_string()
        }
        OptionFormat::Text => {
            let width = value.len().min(MAX_VALUE_LENGTH);
            String::from_utf8_lossy(&value[..width]).into_owned()
        }
    };
    Ok(text)
}

/// Lazy walk over the captured options.
///
/// Stops after END, after `MAX_TLV` options, at the end of the capture, or
/// after the first error. PAD bytes and unrecognised codes produce nothing.
#[derive(Debug, Clone)]
pub struct OptionIter<'a> {
    cursor: OptionCursor<'a>,
    emitted: usize,
    done: bool,
}

impl<'a> OptionIter<'a> {
    pub fn new(options: &'a [u8], base: usize) -> Self {
        Self {
            cursor: OptionCursor::new(options, base),
            emitted: 0,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<RenderedOption<'a>>> {
        loop {
            if self.cursor.is_empty() || self.emitted >= MAX_TLV {
                return Ok(None);
            }

            let offset = self.cursor.capture_offset();
            let raw_code = self.cursor.read_u8()?;

            match OptionCode::from_u8(raw_code) {
                Some(OptionCode::Pad) => continue,
                Some(OptionCode::End) => {
                    self.done = true;
                    return Ok(Some(RenderedOption {
                        code: OptionCode::End,
                        value: &[],
                        text: String::new(),
                    }));
                }
                code => {
                    let len = usize::from(self.cursor.read_u8()?);
                    if len == 0 {
                        return Err(Error::MalformedOption {
                            offset,
                            code: raw_code,
                            reason: "zero length",
                        });
                    }
                    let value = self.cursor.read_slice(len)?;

                    if let Some(code) = code {
                        let text = render_value(code, value, offset)?;
                        return Ok(Some(RenderedOption { code, value, text }));
                    }
                }
            }
        }
    }
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = Result<RenderedOption<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(option)) => {
                self.emitted += 1;
                Some(Ok(option))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for OptionIter<'_> {}

/// Printable field table of one captured frame
#[derive(Debug, Clone)]
pub struct DecodedPacket<'a> {
    /// Fixed fields in table order
    pub fields: Vec<(DhcpField, String)>,
    /// Options, produced on demand
    pub options: OptionIter<'a>,
}

impl<'a> DecodedPacket<'a> {
    /// Rendered value of one fixed field
    pub fn field(&self, field: DhcpField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Consume the options into the single delimited text slot
    pub fn render_options(&mut self) -> Result<String> {
        let mut parts = Vec::new();
        for option in self.options.by_ref() {
            parts.push(option?.to_string());
        }
        Ok(parts.join(" | "))
    }

    /// Numeric MessageType of the capture, if it carries one
    pub fn message_type(&mut self) -> Result<Option<u8>> {
        for option in self.options.by_ref() {
            let option = option?;
            if option.code == OptionCode::MessageType {
                return Ok(option.value.first().copied());
            }
        }
        Ok(None)
    }
}

/// Render a captured Ethernet frame carrying DHCP
pub fn decode(frame: &[u8]) -> Result<DecodedPacket<'_>> {
    let view = FrameView::parse(frame)?;
    let h = view.header();
    let at = |i: usize| Ipv4Addr::new(h[i], h[i + 1], h[i + 2], h[i + 3]).to_string();

    let fields = vec![
        (DhcpField::Smac, view.source_mac().to_string()),
        (DhcpField::Dmac, view.destination_mac().to_string()),
        (DhcpField::Sip, view.source_ip().to_string()),
        (DhcpField::Dip, view.destination_ip().to_string()),
        (DhcpField::Sport, view.source_port().to_string()),
        (DhcpField::Dport, view.destination_port().to_string()),
        (DhcpField::Op, format!("{:02X}", h[0])),
        (DhcpField::Htype, format!("{:02X}", h[1])),
        (DhcpField::Hlen, format!("{:02X}", h[2])),
        (DhcpField::Hops, format!("{:02X}", h[3])),
        (DhcpField::Xid, format!("{:08X}", view.xid())),
        (DhcpField::Secs, format!("{:04X}", u16::from_be_bytes([h[8], h[9]]))),
        (DhcpField::Flags, format!("{:04X}", u16::from_be_bytes([h[10], h[11]]))),
        (DhcpField::Ciaddr, at(12)),
        (DhcpField::Yiaddr, at(16)),
        (DhcpField::Siaddr, at(20)),
        (DhcpField::Giaddr, at(24)),
        (DhcpField::Chaddr, view.client_mac().to_string()),
    ];

    Ok(DecodedPacket {
        fields,
        options: OptionIter::new(view.options(), view.options_offset()),
    })
}

/// Copy a captured frame into a message, options kept as raw bytes.
///
/// Options are copied whole up to capacity; one that would not fit, or
/// that the capture cuts short, ends the copy.
pub fn load_fixed_fields(frame: &[u8]) -> Result<DhcpMessage> {
    let view = FrameView::parse(frame)?;
    let mut msg = DhcpMessage::default();
    view.fill(&mut msg);

    let options = view.options();
    let mut offset = 0;
    while offset < options.len() {
        let code = options[offset];
        let size = match code {
            0 | 255 => 1,
            _ => match options.get(offset + 1) {
                Some(len) => usize::from(*len) + 2,
                None => break,
            },
        };
        if offset + size > options.len() || offset + size > MAX_OPTIONS_SIZE {
            break;
        }
        offset += size;
        if code == 255 {
            break;
        }
    }
    msg.options[..offset].copy_from_slice(&options[..offset]);
    msg.options_len = offset;

    Ok(msg)
}

/// Typed value of an option to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// END, no length or value byte
    Marker,
    Byte(u8),
    /// Written as the address's octets
    Address(Ipv4Addr),
    /// Written big-endian
    Seconds(u32),
    Text(String),
}

impl OptionValue {
    /// Parse `raw` in the format `code` expects.
    ///
    /// Bytes and seconds take decimal or `0x` hex.
    pub fn parse(code: OptionCode, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let bad = |reason: &str| Error::invalid_parameter(code.label(), reason.to_string());
        let number = |raw: &str| match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        };

        match code.format() {
            OptionFormat::Marker => Ok(OptionValue::Marker),
            OptionFormat::Byte => number(raw)
                .and_then(|v| u8::try_from(v).ok())
                .map(OptionValue::Byte)
                .ok_or_else(|| bad("expected a byte value")),
            OptionFormat::Seconds => number(raw)
                .map(OptionValue::Seconds)
                .ok_or_else(|| bad("expected a 32-bit value")),
            OptionFormat::Address => raw
                .parse()
                .map(OptionValue::Address)
                .map_err(|_| bad("expected an IPv4 address")),
            OptionFormat::Text => Ok(OptionValue::Text(raw.to_string())),
        }
    }

    fn encode(&self, code: OptionCode) -> Result<Vec<u8>> {
        let tag = code.code();
        let mismatch = || Error::invalid_parameter(code.label(), "value does not match option type");

        let bytes = match (code.format(), self) {
            (OptionFormat::Marker, OptionValue::Marker) => vec![tag],
            (OptionFormat::Byte, OptionValue::Byte(b)) => vec![tag, 1, *b],
            (OptionFormat::Address, OptionValue::Address(addr)) => {
                let mut out = vec![tag, 4];
                out.extend_from_slice(&addr.octets());
                out
            }
            (OptionFormat::Seconds, OptionValue::Seconds(secs)) => {
                let mut out = vec![tag, 4];
                out.extend_from_slice(&secs.to_be_bytes());
                out
            }
            (OptionFormat::Text, OptionValue::Text(text)) => {
                let len = u8::try_from(text.len())
                    .map_err(|_| Error::invalid_parameter(code.label(), "longer than 255 bytes"))?;
                let mut out = vec![tag, len];
                out.extend_from_slice(text.as_bytes());
                out
            }
            _ => return Err(mismatch()),
        };
        Ok(bytes)
    }
}

/// In-place edit of the options buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvAction {
    /// Append one option at the end of the valid prefix
    Add { code: OptionCode, value: OptionValue },
    /// Remove the option at this index
    Delete(usize),
}

impl DhcpMessage {
    /// Apply one add or delete.
    ///
    /// On error the options buffer and its length are unchanged.
    pub fn edit_option(&mut self, action: TlvAction) -> Result<()> {
        match action {
            TlvAction::Add { code, value } => self.add_option(code, &value),
            TlvAction::Delete(index) => self.delete_option(index),
        }
    }

    pub fn add_option(&mut self, code: OptionCode, value: &OptionValue) -> Result<()> {
        if code == OptionCode::Pad {
            return Err(Error::invalid_parameter("Pad", "padding is not an option"));
        }
        let bytes = value.encode(code)?;

        let start = self.options_len;
        let end = start + bytes.len();
        if end > MAX_OPTIONS_SIZE {
            return Err(Error::OptionsFull {
                needed: end,
                capacity: MAX_OPTIONS_SIZE,
            });
        }

        self.options[start..end].copy_from_slice(&bytes);
        self.options_len = end;
        Ok(())
    }

    /// Remove the `index`th option (PAD and END count one byte each).
    ///
    /// The walk covers the whole valid prefix, so options appended after an
    /// END can be removed too.
    pub fn delete_option(&mut self, index: usize) -> Result<()> {
        let len = self.options_len;
        let mut offset = 0;
        let mut current = 0;

        while offset < len && current < MAX_TLV {
            let code = self.options[offset];
            let size = match code {
                0 | 255 => 1,
                _ => {
                    if offset + 1 >= len {
                        return Err(Error::MalformedOption {
                            offset,
                            code,
                            reason: "missing length byte",
                        });
                    }
                    usize::from(self.options[offset + 1]) + 2
                }
            };
            if offset + size > len {
                return Err(Error::MalformedOption {
                    offset,
                    code,
                    reason: "length runs past the options",
                });
            }

            if current == index {
                self.options.copy_within(offset + size..len, offset);
                self.options[len - size..len].fill(0);
                self.options_len = len - size;
                return Ok(());
            }

            offset += size;
            current += 1;
        }

        Err(Error::OptionNotFound(index))
    }
}

/// Numeric message type of a loaded message's first MessageType option
pub fn find_message_type(options: &[u8]) -> Option<DhcpMessageType> {
    let mut offset = 0;
    while offset < options.len() {
        match options[offset] {
            0 => offset += 1,
            255 => return None,
            53 => return options.get(offset + 2).copied().and_then(DhcpMessageType::from_u8),
            _ => offset += usize::from(*options.get(offset + 1)?) + 2,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhcp::frame::build_frame;
    use crate::dhcp::packet::DHCP_MAGIC_COOKIE;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn frame_with_options(options: &[u8]) -> Vec<u8> {
        let mut msg = DhcpMessage::discover();
        msg.xid = 0xAABBCCDD;
        msg.set_options(options).unwrap();
        build_frame(&msg, msg.mac_source).unwrap()
    }

    /// Headers up to and including the magic cookie, then `options` verbatim
    fn raw_frame(options: &[u8]) -> Vec<u8> {
        let mut frame = frame_with_options(&[]);
        let cookie_end = 14 + 20 + 8 + OPTIONS_OFFSET;
        frame.truncate(cookie_end);
        assert_eq!(&frame[cookie_end - 4..], &DHCP_MAGIC_COOKIE);
        frame.extend_from_slice(options);
        frame
    }

    #[test]
    fn test_round_trip_default_message() {
        let msg = DhcpMessage::discover();
        let frame = build_frame(&msg, msg.mac_source).unwrap();

        let loaded = load_fixed_fields(&frame).unwrap();
        assert_eq!(loaded, msg);
        assert_eq!(loaded.options(), &[53, 1, 1, 255]);
    }

    #[test]
    fn test_decode_fixed_fields() {
        let frame = frame_with_options(&[53, 1, 1, 255]);
        let decoded = decode(&frame).unwrap();

        assert_eq!(decoded.field(DhcpField::Xid), Some("AABBCCDD"));
        assert_eq!(decoded.field(DhcpField::Op), Some("01"));
        assert_eq!(decoded.field(DhcpField::Flags), Some("8000"));
        assert_eq!(decoded.field(DhcpField::Dip), Some("255.255.255.255"));
        assert_eq!(decoded.field(DhcpField::Sport), Some("68"));
        assert_eq!(decoded.field(DhcpField::Dmac), Some("FF:FF:FF:FF:FF:FF"));
        assert_eq!(decoded.fields.len(), DhcpField::FIXED.len());
    }

    #[test]
    fn test_decode_renders_options() {
        let mut options = vec![53, 1, 2, 0, 54, 4, 10, 0, 0, 1, 51, 4, 0, 0, 0x0e, 0x10];
        options.extend_from_slice(&[99, 2, 0xde, 0xad]);
        options.extend_from_slice(&[15, 3, b'l', b'a', b'n', 255]);
        let frame = frame_with_options(&options);

        let mut decoded = decode(&frame).unwrap();
        assert_eq!(
            decoded.render_options().unwrap(),
            "MessageType 02 | ServerID 10.0.0.1 | LeaseTime 00000E10 | DomainName lan | End"
        );
        // the sequence is single-use
        assert!(decoded.options.next().is_none());
    }

    #[test]
    fn test_decode_truncates_long_strings() {
        let mut options = vec![12, 200];
        options.extend(std::iter::repeat(b'h').take(200));
        options.push(255);
        let frame = frame_with_options(&options);

        let first = decode(&frame).unwrap().options.next().unwrap().unwrap();
        assert_eq!(first.code, OptionCode::Hostname);
        assert_eq!(first.text.len(), MAX_VALUE_LENGTH);
        assert_eq!(first.value.len(), 200);
    }

    #[test]
    fn test_decode_without_end_stops_at_capture() {
        let frame = raw_frame(&[53, 1, 3]);
        let mut decoded = decode(&frame).unwrap();
        assert_eq!(decoded.message_type().unwrap(), Some(3));

        let mut decoded = decode(&frame).unwrap();
        assert_eq!(decoded.render_options().unwrap(), "MessageType 03");
    }

    #[test]
    fn test_decode_rejects_zero_length() {
        let frame = raw_frame(&[53, 0, 255]);
        let result = decode(&frame).unwrap().render_options();
        assert!(matches!(
            result,
            Err(Error::MalformedOption { code: 53, reason: "zero length", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_short_address() {
        let frame = raw_frame(&[54, 2, 10, 0, 255]);
        let result = decode(&frame).unwrap().render_options();
        assert!(matches!(result, Err(Error::MalformedOption { code: 54, .. })));
    }

    #[test]
    fn test_decode_truncated_option_never_reads_past_capture() {
        let full = raw_frame(&[53, 1, 1, 54, 4, 10, 0, 0, 1, 12, 6, b'v', b'i', b'c', b't', b'i', b'm', 255]);
        let options_start = 14 + 20 + 8 + OPTIONS_OFFSET;

        for cut in options_start..full.len() {
            let frame = &full[..cut];
            let mut decoded = decode(frame).unwrap();
            match decoded.render_options() {
                Ok(_) => {}
                Err(Error::TruncatedPacket { needed, available }) => {
                    assert_eq!(available, cut);
                    assert!(needed > available);
                }
                Err(other) => panic!("unexpected error {:?} at cut {}", other, cut),
            }
        }
    }

    #[test]
    fn test_decode_rejects_short_or_foreign_frames() {
        let frame = frame_with_options(&[53, 1, 1, 255]);
        for cut in [0, 13, 33, 14 + 20 + 8 + FIXED_HEADER_SIZE - 1] {
            assert!(matches!(
                decode(&frame[..cut]),
                Err(Error::TruncatedPacket { .. })
            ));
        }

        let mut arp = frame.clone();
        arp[12..14].copy_from_slice(&ethertypes::ARP.to_be_bytes());
        assert!(matches!(decode(&arp), Err(Error::PacketParsing(_))));

        let mut bad_ihl = frame;
        bad_ihl[14] = 0x44;
        assert!(matches!(load_fixed_fields(&bad_ihl), Err(Error::PacketParsing(_))));
    }

    #[test]
    fn test_decode_stops_at_max_options() {
        let mut options = Vec::new();
        for _ in 0..MAX_TLV + 5 {
            options.extend_from_slice(&[53, 1, 1]);
        }
        let frame = raw_frame(&options);
        let count = decode(&frame).unwrap().options.count();
        assert_eq!(count, MAX_TLV);
    }

    #[test]
    fn test_load_never_splits_options() {
        let frame = raw_frame(&[53, 1, 5, 54, 4, 10, 0]);
        let msg = load_fixed_fields(&frame).unwrap();
        assert_eq!(msg.options(), &[53, 1, 5]);
        assert_eq!(msg.xid, 0xAABBCCDD);
        assert_eq!(find_message_type(msg.options()), Some(DhcpMessageType::Ack));
    }

    #[test]
    fn test_load_respects_capacity() {
        let mut options = Vec::new();
        // 40 options of 10 bytes = 400 bytes, more than the buffer holds
        for i in 0..40u8 {
            options.extend_from_slice(&[12, 8, i, i, i, i, i, i, i, i]);
        }
        let frame = raw_frame(&options);
        let msg = load_fixed_fields(&frame).unwrap();
        assert_eq!(msg.options_len(), 310);
        assert_eq!(&msg.options()[300..302], &[12, 8]);
    }

    #[test]
    fn test_add_encodes_per_type() {
        let mut msg = DhcpMessage::default();
        msg.add_option(OptionCode::MessageType, &OptionValue::Byte(3)).unwrap();
        msg.add_option(OptionCode::Router, &OptionValue::Address(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();
        msg.add_option(OptionCode::LeaseTime, &OptionValue::Seconds(3600)).unwrap();
        msg.add_option(OptionCode::Hostname, &OptionValue::Text("pc".into())).unwrap();
        msg.add_option(OptionCode::End, &OptionValue::Marker).unwrap();

        assert_eq!(
            msg.options(),
            &[53, 1, 3, 3, 4, 10, 0, 0, 1, 51, 4, 0, 0, 0x0e, 0x10, 12, 2, b'p', b'c', 255]
        );

        let mismatch = msg.add_option(OptionCode::Router, &OptionValue::Seconds(1));
        assert!(matches!(mismatch, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_add_then_delete_restores_buffer() {
        let mut msg = DhcpMessage::discover();
        msg.add_option(OptionCode::ServerId, &OptionValue::Address(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();
        let before = msg.clone();

        msg.add_option(OptionCode::ClassId, &OptionValue::Text("MSFT 5.0".into()))
            .unwrap();
        assert_ne!(msg.options_len(), before.options_len());

        // [53,1,1] [255] [54,...] [60,...]
        msg.delete_option(3).unwrap();
        assert_eq!(msg.options_buffer(), before.options_buffer());
        assert_eq!(msg.options_len(), before.options_len());
    }

    #[test]
    fn test_delete_shifts_and_zero_fills() {
        let mut msg = DhcpMessage::default();
        msg.set_options(&[53, 1, 1, 54, 4, 10, 0, 0, 1, 255]).unwrap();

        msg.edit_option(TlvAction::Delete(0)).unwrap();
        assert_eq!(msg.options(), &[54, 4, 10, 0, 0, 1, 255]);
        assert!(msg.options_buffer()[7..].iter().all(|b| *b == 0));

        assert!(matches!(msg.delete_option(5), Err(Error::OptionNotFound(5))));
    }

    #[test]
    fn test_delete_rejects_corrupt_length() {
        let mut msg = DhcpMessage::default();
        msg.set_options(&[53, 1, 1, 12, 40, b'x']).unwrap();
        let before = msg.clone();

        let result = msg.delete_option(1);
        assert!(matches!(result, Err(Error::MalformedOption { offset: 3, code: 12, .. })));
        assert_eq!(msg, before);
    }

    #[test]
    fn test_add_fails_when_full() {
        let mut msg = DhcpMessage::default();
        msg.set_options(&[0u8; MAX_OPTIONS_SIZE - 2]).unwrap();
        let snapshot = msg.clone();

        let result = msg.add_option(OptionCode::LeaseTime, &OptionValue::Seconds(60));
        assert!(matches!(
            result,
            Err(Error::OptionsFull { needed: 316, capacity: 312 })
        ));
        assert_eq!(msg, snapshot);

        // exact fill is allowed
        msg.add_option(OptionCode::End, &OptionValue::Marker).unwrap();
        msg.add_option(OptionCode::End, &OptionValue::Marker).unwrap();
        assert_eq!(msg.options_len(), MAX_OPTIONS_SIZE);
        assert!(msg.add_option(OptionCode::End, &OptionValue::Marker).is_err());
    }

    #[test]
    fn test_option_value_parse() {
        assert_eq!(
            OptionValue::parse(OptionCode::MessageType, "0x03").unwrap(),
            OptionValue::Byte(3)
        );
        assert_eq!(
            OptionValue::parse(OptionCode::LeaseTime, "3600").unwrap(),
            OptionValue::Seconds(3600)
        );
        assert_eq!(
            OptionValue::parse(OptionCode::DnsServer, "8.8.8.8").unwrap(),
            OptionValue::Address(Ipv4Addr::new(8, 8, 8, 8))
        );
        assert!(OptionValue::parse(OptionCode::MessageType, "300").is_err());
        assert!(OptionValue::parse(OptionCode::Router, "gateway").is_err());

        let long = OptionValue::Text("x".repeat(256));
        let mut msg = DhcpMessage::default();
        assert!(msg.add_option(OptionCode::DomainName, &long).is_err());
        assert_eq!(msg.options_len(), 0);
    }

    /// Everything a capture goes through; only the absence of panics matters
    fn exercise(frame: &[u8]) {
        if let Ok(mut decoded) = decode(frame) {
            let _ = decoded.render_options();
        }
        if let Ok(mut decoded) = decode(frame) {
            let _ = decoded.message_type();
        }
        if let Ok(mut msg) = load_fixed_fields(frame) {
            let _ = find_message_type(msg.options());
            let _ = msg.delete_option(0);
        }
    }

    #[test]
    fn test_random_bytes_never_panic() {
        let mut rng = StdRng::seed_from_u64(0x1ea5_e7ac);

        for _ in 0..2000 {
            let len = rng.gen_range(0..700);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

            exercise(&bytes);
            let _ = OptionIter::new(&bytes, 0).count();
            let _ = find_message_type(&bytes);
        }
    }

    #[test]
    fn test_random_option_areas_never_panic() {
        const KNOWN: [u8; 10] = [1, 3, 6, 12, 15, 50, 51, 53, 54, 255];
        let mut rng = StdRng::seed_from_u64(53);

        for _ in 0..2000 {
            let len = rng.gen_range(0..400);
            // small codes and lengths so most bytes land on known options
            let options: Vec<u8> = (0..len)
                .map(|_| match rng.gen_range(0..4) {
                    0 => rng.gen_range(0..8),
                    1 => KNOWN[rng.gen_range(0..KNOWN.len())],
                    _ => rng.gen(),
                })
                .collect();
            exercise(&raw_frame(&options));
        }
    }

    #[test]
    fn test_mutated_discover_never_panics() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = frame_with_options(&[53, 1, 1, 61, 7, 1, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 12, 4, b'h', b'o', b's', b't', 255]);

        for _ in 0..3000 {
            let mut frame = base.clone();
            for _ in 0..rng.gen_range(1..8) {
                let at = rng.gen_range(0..frame.len());
                frame[at] = rng.gen();
            }
            if rng.gen_bool(0.3) {
                frame.truncate(rng.gen_range(0..=frame.len()));
            }
            exercise(&frame);
        }
    }
}
