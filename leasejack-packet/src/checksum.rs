//! Internet checksum (RFC 1071) for IPv4 headers and UDP datagrams

use std::net::Ipv4Addr;

/// Add `data` as big-endian 16-bit words into a running sum.
///
/// An odd trailing byte is padded with zero on the right.
fn accumulate(data: &[u8], mut sum: u64) -> u64 {
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let Some(&last) = words.remainder().first() {
        sum += u64::from(last) << 8;
    }
    sum
}

fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// One's complement checksum over `data`.
///
/// ```
/// use leasejack_packet::checksum::internet_checksum;
///
/// let header = [0x45, 0x00, 0x00, 0x1c];
/// let sum = internet_checksum(&header);
/// assert_ne!(sum, 0);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    fold(accumulate(data, 0))
}

/// Checksum of a transport segment including the IPv4 pseudo-header
/// (source, destination, zero, protocol, segment length).
pub fn transport_checksum(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, segment: &[u8]) -> u16 {
    let mut sum = accumulate(&src.octets(), 0);
    sum = accumulate(&dst.octets(), sum);
    sum += u64::from(protocol);
    sum += segment.len() as u64;
    fold(accumulate(segment, sum))
}

/// True when `data` (checksum field included) sums to zero
pub fn validate_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}
