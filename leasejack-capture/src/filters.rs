//! BPF filter expressions for the frames leasejack listens for

use leasejack_core::ProtocolFilter;

/// DHCP filter (both client and server)
/// Captures IPv4/UDP traffic on ports 67 and 68
pub fn dhcp_filter() -> &'static str {
    "ip and udp and (port 67 or port 68)"
}

/// ARP filter
pub fn arp_filter() -> &'static str {
    "arp"
}

/// Kernel-side equivalent of [`ProtocolFilter::matches`]
pub fn for_protocol(filter: ProtocolFilter) -> &'static str {
    match filter {
        ProtocolFilter::Dhcp => dhcp_filter(),
        ProtocolFilter::Arp => arp_filter(),
    }
}
