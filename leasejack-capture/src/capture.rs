//! Real link layer: pcap for receive, pnet datalink for transmit

use crate::filters;
use leasejack_core::{Error, LinkLayer, Packet, ProtocolFilter, Result};
use parking_lot::Mutex;
use pcap::{Active, Capture, Device};
use pnet_datalink::{Channel, DataLinkSender, NetworkInterface};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error};

/// Default snapshot length (maximum bytes per packet)
const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout; one capture poll never blocks longer than this
const DEFAULT_TIMEOUT_MS: i32 = 100;

/// Configuration for packet capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Buffer size (0 = default)
    pub buffer_size: i32,
    /// Enable immediate mode (deliver packets immediately)
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            buffer_size: 0,
            immediate_mode: true,
        }
    }
}

/// One capture handle per [`ProtocolFilter`], opened on first use.
///
/// Each handle keeps its own BPF program for its whole life, so consumers
/// waiting on different filters never steal or discard each other's frames.
/// Consumers of the same filter share that filter's handle.
struct FilterHandles<H> {
    handles: Mutex<HashMap<ProtocolFilter, Arc<Mutex<H>>>>,
}

impl<H> FilterHandles<H> {
    fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Handle for `filter`, calling `open` the first time it is needed.
    /// A failed open is not remembered.
    fn get_or_open<F>(&self, filter: ProtocolFilter, open: F) -> Result<Arc<Mutex<H>>>
    where
        F: FnOnce(ProtocolFilter) -> Result<H>,
    {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&filter) {
            return Ok(handle.clone());
        }
        let handle = Arc::new(Mutex::new(open(filter)?));
        handles.insert(filter, handle.clone());
        Ok(handle)
    }
}

/// Link layer over one physical interface
pub struct PcapLink {
    name: String,
    config: CaptureConfig,
    captures: FilterHandles<Capture<Active>>,
    sender: Mutex<Box<dyn DataLinkSender>>,
}

impl PcapLink {
    /// Open the transmit channel for `iface` and its DHCP capture handle.
    /// The ARP handle is opened by the first ARP `recv`.
    pub fn open(iface: &NetworkInterface, config: &CaptureConfig) -> Result<Self> {
        let sender = match pnet_datalink::channel(iface, Default::default()) {
            Ok(Channel::Ethernet(tx, _rx)) => tx,
            Ok(_) => return Err(Error::Interface("Unsupported channel type".to_string())),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        let link = Self {
            name: iface.name.clone(),
            config: config.clone(),
            captures: FilterHandles::new(),
            sender: Mutex::new(sender),
        };
        link.capture_for(ProtocolFilter::Dhcp)?;
        Ok(link)
    }

    fn capture_for(&self, filter: ProtocolFilter) -> Result<Arc<Mutex<Capture<Active>>>> {
        self.captures
            .get_or_open(filter, |filter| open_capture(&self.name, &self.config, filter))
    }
}

/// Open a capture handle on `name` with the BPF program of `filter` installed
fn open_capture(name: &str, config: &CaptureConfig, filter: ProtocolFilter) -> Result<Capture<Active>> {
    let mut builder = Capture::from_device(Device::from(name))
        .map_err(|e| Error::Capture(format!("Failed to create capture: {}", e)))?
        .promisc(config.promiscuous)
        .snaplen(config.snaplen)
        .timeout(config.timeout_ms)
        .immediate_mode(config.immediate_mode);

    if config.buffer_size > 0 {
        builder = builder.buffer_size(config.buffer_size);
    }

    let mut handle = builder
        .open()
        .map_err(|e| Error::Capture(format!("Failed to open capture: {}", e)))?;

    let bpf = filters::for_protocol(filter);
    handle
        .filter(bpf, true)
        .map_err(|e| Error::Capture(format!("Failed to apply filter '{}': {}", bpf, e)))?;

    debug!(interface = %name, filter = bpf, "capture initialized");
    Ok(handle)
}

impl LinkLayer for PcapLink {
    fn send(&self, frame: &[u8]) -> Result<()> {
        self.sender
            .lock()
            .send_to(frame, None)
            .ok_or_else(|| Error::link_layer(format!("{}: transmit queue unavailable", self.name)))?
            .map_err(|e| {
                error!(interface = %self.name, error = %e, "frame write failed");
                Error::link_layer(format!("{}: {}", self.name, e))
            })
    }

    fn recv(&self, filter: ProtocolFilter, wait: Duration) -> Result<Option<Packet>> {
        let deadline = Instant::now() + wait;
        let capture = self.capture_for(filter)?;
        let mut handle = capture.lock();

        loop {
            match handle.next_packet() {
                Ok(raw) => {
                    let data = raw.data.to_vec();
                    let len = raw.header.len as usize;
                    // the BPF program already selected this filter's traffic
                    if filter.matches(&data) {
                        return Ok(Some(Packet {
                            timestamp: SystemTime::now(),
                            interface: self.name.clone(),
                            data,
                            len,
                        }));
                    }
                }
                Err(pcap::Error::TimeoutExpired) => {}
                Err(e) => {
                    error!(interface = %self.name, error = %e, "packet capture error");
                    return Err(Error::Capture(format!("{}: {}", self.name, e)));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}
