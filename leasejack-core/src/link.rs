//! Link-layer abstraction
//!
//! Attacks never talk to pcap or raw sockets directly. Every [`Interface`]
//! carries an `Arc<dyn LinkLayer>` that can write complete Ethernet frames and
//! hand back captured ones. The real implementation lives in
//! `leasejack-capture`; [`MemoryLink`] is the in-process one used by tests and
//! by dry runs.
//!
//! [`next_packet`] is the capture dispatcher shared by every attack that has
//! to wait for traffic: it polls the configured interfaces in short slices so
//! that the attack's stop flag is honoured within one slice.

use crate::types::{ethertypes, protocol_constants};
use crate::{Error, Interface, Packet, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single poll on one interface while waiting for traffic
pub const POLL_SLICE: Duration = Duration::from_millis(100);

const ETHERNET_HEADER_LEN: usize = 14;

/// Which frames a capture call is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolFilter {
    /// IPv4/UDP with port 67 or 68 on either side
    Dhcp,
    /// Any ARP frame
    Arp,
}

impl ProtocolFilter {
    /// Software classification of a raw Ethernet frame.
    ///
    /// Reads only bytes that the frame actually holds.
    pub fn matches(self, frame: &[u8]) -> bool {
        let Some(ethertype) = frame.get(12..14) else {
            return false;
        };
        let ethertype = u16::from_be_bytes([ethertype[0], ethertype[1]]);

        match self {
            ProtocolFilter::Arp => ethertype == ethertypes::ARP,
            ProtocolFilter::Dhcp => {
                if ethertype != ethertypes::IPV4 {
                    return false;
                }
                let ip = &frame[ETHERNET_HEADER_LEN..];
                let Some(&version_ihl) = ip.first() else {
                    return false;
                };
                let ihl = usize::from(version_ihl & 0x0F) * 4;
                if version_ihl >> 4 != 4 || ihl < 20 || ip.len() < ihl + 4 {
                    return false;
                }
                if ip[9] != protocol_constants::IPPROTO_UDP {
                    return false;
                }
                let sport = u16::from_be_bytes([ip[ihl], ip[ihl + 1]]);
                let dport = u16::from_be_bytes([ip[ihl + 2], ip[ihl + 3]]);
                [sport, dport].iter().any(|p| {
                    *p == protocol_constants::DHCP_SERVER_PORT
                        || *p == protocol_constants::DHCP_CLIENT_PORT
                })
            }
        }
    }
}

/// How long a capture call may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTimeout {
    /// Block until a matching frame arrives or the attack is stopped
    Never,
    /// Give up after the given duration
    After(Duration),
}

/// Outcome of [`next_packet`]
#[derive(Debug)]
pub enum Captured {
    Packet(Packet),
    Timeout,
    Cancelled,
}

/// Raw frame transmit/receive capability of one interface
pub trait LinkLayer: Send + Sync {
    /// Transmit one complete Ethernet frame
    fn send(&self, frame: &[u8]) -> Result<()>;

    /// Wait up to `wait` for the next frame matching `filter`
    fn recv(&self, filter: ProtocolFilter, wait: Duration) -> Result<Option<Packet>>;
}

/// Wait for the next frame matching `filter` on any of `interfaces`.
///
/// Interfaces are polled in registration order. `running` is checked before
/// every poll; clearing it makes the call return [`Captured::Cancelled`]
/// within one [`POLL_SLICE`].
pub fn next_packet(
    interfaces: &[Interface],
    filter: ProtocolFilter,
    running: &AtomicBool,
    timeout: CaptureTimeout,
) -> Result<Captured> {
    if interfaces.is_empty() {
        return Err(Error::Interface(
            "no interfaces configured for capture".to_string(),
        ));
    }

    let deadline = match timeout {
        CaptureTimeout::Never => None,
        CaptureTimeout::After(d) => Some(Instant::now() + d),
    };

    loop {
        for iface in interfaces {
            if !running.load(Ordering::Relaxed) {
                return Ok(Captured::Cancelled);
            }

            let wait = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()).min(POLL_SLICE),
                None => POLL_SLICE,
            };

            if let Some(packet) = iface.link().recv(filter, wait)? {
                return Ok(Captured::Packet(packet));
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(Captured::Timeout);
        }
    }
}

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// In-memory link: records transmitted frames and serves queued inbound ones.
///
/// An optional responder sees every transmitted frame and may queue a reply,
/// which is how tests answer ARP requests.
pub struct MemoryLink {
    name: String,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    arrived: Condvar,
    sent: Mutex<Vec<Vec<u8>>>,
    responder: Option<Responder>,
    fail_sends: AtomicBool,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::named("mem0")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inbound: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
            sent: Mutex::new(Vec::new()),
            responder: None,
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Install a closure that may answer transmitted frames
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue a frame for the next matching `recv`
    pub fn push_inbound(&self, frame: Vec<u8>) {
        self.inbound.lock().push_back(frame);
        self.arrived.notify_all();
    }

    /// Make every following `send` fail with a link-layer error
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Copy of every frame transmitted so far
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Drain the transmitted frames
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkLayer for MemoryLink {
    fn send(&self, frame: &[u8]) -> Result<()> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(Error::link_layer(format!("write failed on {}", self.name)));
        }

        self.sent.lock().push(frame.to_vec());

        if let Some(reply) = self.responder.as_ref().and_then(|r| r(frame)) {
            self.push_inbound(reply);
        }
        Ok(())
    }

    fn recv(&self, filter: ProtocolFilter, wait: Duration) -> Result<Option<Packet>> {
        let deadline = Instant::now() + wait;
        let mut inbound = self.inbound.lock();

        loop {
            if let Some(pos) = inbound.iter().position(|f| filter.matches(f)) {
                let frame = inbound.remove(pos).unwrap_or_default();
                return Ok(Some(Packet::new(self.name.clone(), frame)));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.arrived.wait_for(&mut inbound, deadline - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MacAddr;
    use std::sync::Arc;

    fn arp_frame() -> Vec<u8> {
        let mut frame = vec![0xff; 6];
        frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        frame.extend_from_slice(&ethertypes::ARP.to_be_bytes());
        frame.extend_from_slice(&[0u8; 28]);
        frame
    }

    fn udp_frame(sport: u16, dport: u16) -> Vec<u8> {
        let mut frame = vec![0xff; 6];
        frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        frame.extend_from_slice(&ethertypes::IPV4.to_be_bytes());
        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[9] = protocol_constants::IPPROTO_UDP;
        frame.extend_from_slice(&ip);
        frame.extend_from_slice(&sport.to_be_bytes());
        frame.extend_from_slice(&dport.to_be_bytes());
        frame.extend_from_slice(&[0, 8, 0, 0]);
        frame
    }

    #[test]
    fn test_filter_classification() {
        assert!(ProtocolFilter::Arp.matches(&arp_frame()));
        assert!(!ProtocolFilter::Dhcp.matches(&arp_frame()));
        assert!(ProtocolFilter::Dhcp.matches(&udp_frame(68, 67)));
        assert!(ProtocolFilter::Dhcp.matches(&udp_frame(67, 68)));
        assert!(!ProtocolFilter::Dhcp.matches(&udp_frame(53, 5353)));
    }

    #[test]
    fn test_filter_never_reads_past_short_frames() {
        let frame = udp_frame(68, 67);
        for len in 0..frame.len() {
            assert!(!ProtocolFilter::Dhcp.matches(&frame[..len]) || len >= 38);
            let _ = ProtocolFilter::Arp.matches(&frame[..len]);
        }
    }

    #[test]
    fn test_memory_link_filters_and_keeps_other_frames() {
        let link = MemoryLink::new();
        link.push_inbound(udp_frame(68, 67));
        link.push_inbound(arp_frame());

        let arp = link
            .recv(ProtocolFilter::Arp, Duration::from_millis(10))
            .unwrap()
            .unwrap();
        assert_eq!(arp.data(), &arp_frame()[..]);

        let dhcp = link
            .recv(ProtocolFilter::Dhcp, Duration::from_millis(10))
            .unwrap();
        assert!(dhcp.is_some());

        let empty = link
            .recv(ProtocolFilter::Dhcp, Duration::from_millis(10))
            .unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_memory_link_serves_concurrent_filters() {
        let link = Arc::new(MemoryLink::new());

        let waiter = |filter: ProtocolFilter| {
            let link = link.clone();
            std::thread::spawn(move || link.recv(filter, Duration::from_secs(5)).unwrap())
        };
        let dhcp = waiter(ProtocolFilter::Dhcp);
        let arp = waiter(ProtocolFilter::Arp);

        std::thread::sleep(Duration::from_millis(50));
        link.push_inbound(arp_frame());
        link.push_inbound(udp_frame(68, 67));

        let dhcp = dhcp.join().unwrap().unwrap();
        let arp = arp.join().unwrap().unwrap();
        assert!(ProtocolFilter::Dhcp.matches(dhcp.data()));
        assert_eq!(arp.data(), &arp_frame()[..]);
        assert!(link.recv(ProtocolFilter::Arp, Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_memory_link_responder_and_failures() {
        let link = MemoryLink::new().with_responder(|_| Some(arp_frame()));
        link.send(&[1, 2, 3]).unwrap();
        assert_eq!(link.sent_count(), 1);
        assert!(link
            .recv(ProtocolFilter::Arp, Duration::ZERO)
            .unwrap()
            .is_some());

        link.set_fail_sends(true);
        assert!(matches!(link.send(&[4]), Err(Error::LinkLayer(_))));
        assert_eq!(link.take_sent().len(), 1);
        assert_eq!(link.sent_count(), 0);
    }

    #[test]
    fn test_next_packet_timeout_and_cancel() {
        let link = Arc::new(MemoryLink::new());
        let iface = Interface::new("mem0", 0, MacAddr::zero(), link.clone());
        let interfaces = vec![iface];
        let running = AtomicBool::new(true);

        let started = Instant::now();
        let outcome = next_packet(
            &interfaces,
            ProtocolFilter::Arp,
            &running,
            CaptureTimeout::After(Duration::from_millis(50)),
        )
        .unwrap();
        assert!(matches!(outcome, Captured::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(50));

        running.store(false, Ordering::Relaxed);
        let outcome = next_packet(
            &interfaces,
            ProtocolFilter::Arp,
            &running,
            CaptureTimeout::Never,
        )
        .unwrap();
        assert!(matches!(outcome, Captured::Cancelled));
    }

    #[test]
    fn test_next_packet_delivers_from_second_interface() {
        let first = Arc::new(MemoryLink::named("a"));
        let second = Arc::new(MemoryLink::named("b"));
        second.push_inbound(arp_frame());
        let interfaces = vec![
            Interface::new("a", 0, MacAddr::zero(), first),
            Interface::new("b", 1, MacAddr::zero(), second),
        ];
        let running = AtomicBool::new(true);

        let outcome = next_packet(
            &interfaces,
            ProtocolFilter::Arp,
            &running,
            CaptureTimeout::Never,
        )
        .unwrap();
        match outcome {
            Captured::Packet(p) => assert_eq!(p.interface, "b"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_next_packet_requires_interfaces() {
        let running = AtomicBool::new(true);
        assert!(next_packet(&[], ProtocolFilter::Dhcp, &running, CaptureTimeout::Never).is_err());
    }
}
