//! Protocol trait and related types

use crate::link::ProtocolFilter;
use crate::parameter::ParamDescriptor;
use crate::{AttackDescriptor, AttackHandle, AttackId, Error, Interface, MacAddr, Packet};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

/// Main trait that all protocol implementations must implement
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Full name of the protocol (e.g., "Dynamic Host Configuration Protocol")
    fn name(&self) -> &'static str;

    /// Short name used in CLI (e.g., "dhcp")
    fn shortname(&self) -> &'static str;

    /// Protocol ID
    fn id(&self) -> crate::ProtocolId;

    /// Frames this protocol wants to see in passive mode
    fn capture_filter(&self) -> ProtocolFilter;

    /// List of attacks available for this protocol
    fn attacks(&self) -> &[AttackDescriptor];

    /// Process a captured packet (passive mode)
    ///
    /// Parses the packet, updates internal statistics and logs a summary.
    /// A packet that fails to parse is counted and reported as an error;
    /// callers keep listening.
    fn handle_packet(&self, packet: &Packet) -> Result<(), Error>;

    /// Launch a specific attack
    ///
    /// Returns an AttackHandle that can be used to control the attack.
    async fn launch_attack(
        &self,
        attack_id: AttackId,
        params: AttackParams,
        interfaces: &[Interface],
    ) -> Result<AttackHandle, Error>;

    /// Get current protocol statistics
    fn stats(&self) -> ProtocolStats;

    /// Look up an attack descriptor by id
    fn attack(&self, attack_id: AttackId) -> Option<&AttackDescriptor> {
        self.attacks().iter().find(|a| a.id == attack_id)
    }
}

/// Parameters for launching an attack
#[derive(Debug, Clone, Default)]
pub struct AttackParams {
    params: HashMap<String, ParamValue>,
}

impl AttackParams {
    /// Create a new empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the parameter set for one attack from raw `name=value` pairs.
    ///
    /// Unknown names and missing required parameters are rejected; absent
    /// optional parameters take the descriptor's default.
    pub fn from_raw<K, V>(descriptors: &[ParamDescriptor], raw: &[(K, V)]) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::new();

        for (key, value) in raw {
            let key = key.as_ref();
            let desc = descriptors
                .iter()
                .find(|d| d.name == key)
                .ok_or_else(|| Error::invalid_parameter(key, "unknown parameter for this attack"))?;
            params.insert(desc.name, desc.parse(value.as_ref())?);
        }

        for desc in descriptors {
            if params.contains(desc.name) {
                continue;
            }
            match &desc.default {
                Some(default) => params.insert(desc.name, desc.parse(default)?),
                None if desc.required => {
                    return Err(Error::invalid_parameter(desc.name, "required parameter missing"))
                }
                None => {}
            }
        }

        Ok(params)
    }

    /// Set a parameter value
    pub fn set<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) {
        self.params.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_string())
    }

    /// Get a u32 parameter
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.params.get(key).and_then(|v| v.as_u32())
    }

    /// Get a boolean parameter
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(|v| v.as_bool())
    }

    /// Get a u64 parameter
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(|v| v.as_u64())
    }

    /// Get an IPv4 address parameter
    pub fn get_ipv4(&self, key: &str) -> Option<Ipv4Addr> {
        self.params.get(key).and_then(|v| v.as_ipv4())
    }

    /// Get a MAC address parameter
    pub fn get_mac(&self, key: &str) -> Option<MacAddr> {
        self.params.get(key).and_then(|v| v.as_mac())
    }

    /// IPv4 parameter that must be present
    pub fn require_ipv4(&self, key: &str) -> Result<Ipv4Addr, Error> {
        self.get_ipv4(key)
            .ok_or_else(|| Error::invalid_parameter(key, "an IPv4 address is required"))
    }
}

/// Parameter value types
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    U64(u64),
    U32(u32),
    U16(u16),
    U8(u8),
    Bool(bool),
    MacAddr(MacAddr),
    IpAddr(IpAddr),
}

impl ParamValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ParamValue::U32(v) => Some(*v),
            ParamValue::U8(v) => Some(*v as u32),
            ParamValue::U16(v) => Some(*v as u32),
            ParamValue::U64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::U64(v) => Some(*v),
            ParamValue::U8(v) => Some(*v as u64),
            ParamValue::U16(v) => Some(*v as u64),
            ParamValue::U32(v) => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            ParamValue::IpAddr(IpAddr::V4(v)) => Some(*v),
            ParamValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            ParamValue::MacAddr(v) => Some(*v),
            ParamValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::U32(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::U64(v)
    }
}

impl From<Ipv4Addr> for ParamValue {
    fn from(v: Ipv4Addr) -> Self {
        ParamValue::IpAddr(IpAddr::V4(v))
    }
}

impl From<MacAddr> for ParamValue {
    fn from(v: MacAddr) -> Self {
        ParamValue::MacAddr(v)
    }
}

/// Statistics for a protocol
#[derive(Debug, Clone, Default)]
pub struct ProtocolStats {
    /// Number of packets received
    pub packets_received: u64,
    /// Number of packets parsed successfully
    pub packets_parsed: u64,
    /// Number of packets with errors
    pub packets_errors: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Frames sent by attacks of this protocol
    pub packets_sent: u64,
    /// Protocol-specific stats
    pub custom: HashMap<String, u64>,
}
