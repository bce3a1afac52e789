//! Protocol registry for lookup by short name or ID
//!
//! The CLI builds one registry at startup, registers every protocol it
//! ships, and resolves user input (`dhcp`, `arp`) against it.

use leasejack_core::{Error, Protocol, ProtocolId, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Information about a registered protocol
#[derive(Debug, Clone)]
pub struct ProtocolInfo {
    pub id: ProtocolId,
    pub name: String,
    pub shortname: String,
    pub attack_count: usize,
}

/// Thread-safe protocol registry
pub struct ProtocolRegistry {
    protocols_by_id: RwLock<HashMap<ProtocolId, Arc<dyn Protocol>>>,
    protocols_by_name: RwLock<HashMap<String, ProtocolId>>,
}

impl ProtocolRegistry {
    /// Create a new empty protocol registry
    pub fn new() -> Self {
        debug!("Creating new ProtocolRegistry");
        Self {
            protocols_by_id: RwLock::new(HashMap::new()),
            protocols_by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Register a protocol
    ///
    /// Fails with `AlreadyExists` when the ID or the short name is taken.
    pub fn register(&self, protocol: Arc<dyn Protocol>) -> Result<()> {
        let id = protocol.id();
        let shortname = protocol.shortname().to_string();

        // Both maps are locked for the whole check-and-insert.
        let mut by_id = self.protocols_by_id.write();
        let mut by_name = self.protocols_by_name.write();

        if by_id.contains_key(&id) {
            warn!(id = %id, "Protocol already registered by ID");
            return Err(Error::AlreadyExists(format!(
                "Protocol with ID {} already registered",
                id
            )));
        }
        if by_name.contains_key(&shortname) {
            warn!(shortname = %shortname, "Protocol already registered by name");
            return Err(Error::AlreadyExists(format!(
                "Protocol with shortname '{}' already registered",
                shortname
            )));
        }

        info!(id = %id, name = protocol.name(), shortname = %shortname, "Registering protocol");
        by_id.insert(id, protocol);
        by_name.insert(shortname, id);
        Ok(())
    }

    /// Unregister a protocol by ID
    pub fn unregister(&self, id: ProtocolId) -> Result<()> {
        let mut by_id = self.protocols_by_id.write();
        let protocol = by_id
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Protocol with ID {} not found", id)))?;

        self.protocols_by_name.write().remove(protocol.shortname());
        debug!(id = %id, shortname = protocol.shortname(), "Protocol unregistered");
        Ok(())
    }

    /// Get a protocol by its short name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Protocol>> {
        let id = *self
            .protocols_by_name
            .read()
            .get(&name.to_ascii_lowercase())?;
        self.get_by_id(id)
    }

    /// Get a protocol by its ID
    pub fn get_by_id(&self, id: ProtocolId) -> Option<Arc<dyn Protocol>> {
        self.protocols_by_id.read().get(&id).cloned()
    }

    /// Resolve a protocol by name, or fail with `NotFound`
    pub fn require(&self, name: &str) -> Result<Arc<dyn Protocol>> {
        self.get_by_name(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown protocol '{}'", name)))
    }

    /// All registered protocols, ordered by ID
    pub fn list_protocols(&self) -> Vec<ProtocolInfo> {
        let mut list: Vec<ProtocolInfo> = self
            .protocols_by_id
            .read()
            .values()
            .map(|protocol| ProtocolInfo {
                id: protocol.id(),
                name: protocol.name().to_string(),
                shortname: protocol.shortname().to_string(),
                attack_count: protocol.attacks().len(),
            })
            .collect();
        list.sort_by_key(|info| info.id);
        list
    }

    pub fn count(&self) -> usize {
        self.protocols_by_id.read().len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.protocols_by_name
            .read()
            .contains_key(&name.to_ascii_lowercase())
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
