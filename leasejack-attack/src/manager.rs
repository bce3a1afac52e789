//! Attack manager for orchestrating multiple concurrent attacks
//!
//! The `AttackManager` is the main entry point for launching and managing
//! attacks. It provides:
//!
//! - Concurrent attack execution, one blocking-pool thread per attack
//! - Attack lifecycle management (launch, wait, stop)
//! - Thread-safe attack tracking with DashMap
//! - Graceful shutdown

use dashmap::DashMap;
use leasejack_core::{
    Attack, AttackHandle, AttackId, AttackParams, AttackPhase, AttackStats, Error, Interface,
    PacketCounters, Protocol, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::executor::{stop_and_wait, wait_for_attack, AttackExecutor};

/// Information about a tracked attack
#[derive(Debug, Clone)]
pub struct AttackInfo {
    /// Unique attack instance ID
    pub id: Uuid,
    /// Protocol name
    pub protocol: String,
    /// Attack name
    pub attack_name: String,
    /// When the attack started
    pub started_at: SystemTime,
    /// Lifecycle phase
    pub phase: AttackPhase,
    /// Current statistics
    pub stats: AttackStats,
}

/// Attack manager that orchestrates multiple concurrent attacks
pub struct AttackManager {
    /// Map of tracked attacks (UUID -> AttackHandle)
    attacks: Arc<DashMap<Uuid, AttackHandle>>,
    /// Is the manager shutting down?
    shutting_down: Arc<AtomicBool>,
}

impl AttackManager {
    /// Create a new attack manager
    pub fn new() -> Self {
        debug!("Creating new AttackManager");
        Self {
            attacks: Arc::new(DashMap::new()),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.shutting_down.load(Ordering::Relaxed) {
            return Err(Error::ExecutionFailed("Manager is shutting down".to_string()));
        }
        Ok(())
    }

    /// Launch an attack through its protocol
    ///
    /// Every interface in `interfaces` becomes an output interface of the
    /// attack, in the given order. Returns the UUID of the attack instance.
    pub async fn launch(
        &self,
        protocol: &dyn Protocol,
        attack_id: AttackId,
        params: AttackParams,
        interfaces: &[Interface],
    ) -> Result<Uuid> {
        self.ensure_accepting()?;

        info!(
            protocol = %protocol.shortname(),
            attack_id = %attack_id,
            interfaces = interfaces.len(),
            "Launching attack"
        );

        let handle = protocol.launch_attack(attack_id, params, interfaces).await?;
        let attack_uuid = handle.id;
        self.attacks.insert(attack_uuid, handle);

        info!(id = %attack_uuid, protocol = %protocol.shortname(), "Attack launched");
        Ok(attack_uuid)
    }

    /// Launch an `Attack` directly, bypassing protocol lookup
    pub fn launch_custom(
        &self,
        protocol_name: &str,
        attack: Arc<dyn Attack>,
        interfaces: Vec<Interface>,
        params: AttackParams,
        counters: Arc<PacketCounters>,
    ) -> Result<Uuid> {
        self.ensure_accepting()?;

        let attack_name = attack.name().to_string();
        info!(protocol = %protocol_name, attack = %attack_name, "Launching custom attack");

        let handle = AttackExecutor::new(protocol_name, attack_name)
            .execute(attack, interfaces, params, counters)?;
        let attack_uuid = handle.id;
        self.attacks.insert(attack_uuid, handle);

        Ok(attack_uuid)
    }

    /// Wait until the attack body exits on its own, then reap it
    pub async fn wait(&self, id: Uuid) -> Result<()> {
        let mut phase = self
            .attacks
            .get(&id)
            .map(|h| h.phase.clone())
            .ok_or_else(|| Error::NotFound(format!("Attack {} not found", id)))?;
        let _ = phase.wait_for(|p| *p == AttackPhase::Finished).await;

        match self.attacks.remove(&id) {
            Some((_, mut handle)) => wait_for_attack(&mut handle).await,
            None => Ok(()),
        }
    }

    /// Stop an attack and wait for it to unwind
    pub async fn stop(&self, id: Uuid) -> Result<()> {
        info!(id = %id, "Stopping attack");

        if let Some((_, mut handle)) = self.attacks.remove(&id) {
            stop_and_wait(&mut handle).await?;
            info!(id = %id, "Attack stopped");
            Ok(())
        } else {
            warn!(id = %id, "Attack not found");
            Err(Error::NotFound(format!("Attack {} not found", id)))
        }
    }

    /// Stop all running attacks
    pub async fn stop_all(&self) -> Result<()> {
        info!("Stopping all attacks");
        self.shutting_down.store(true, Ordering::Relaxed);

        let attack_ids: Vec<Uuid> = self.attacks.iter().map(|entry| *entry.key()).collect();

        let mut failures = 0usize;
        for id in attack_ids {
            if let Err(e) = self.stop(id).await {
                error!(id = %id, error = %e, "Attack ended with an error");
                failures += 1;
            }
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(Error::ExecutionFailed(format!("{} attacks ended with errors", failures)))
        }
    }

    /// List all tracked attacks
    pub fn list_active(&self) -> Vec<AttackInfo> {
        self.attacks
            .iter()
            .map(|entry| {
                let handle = entry.value();
                AttackInfo {
                    id: handle.id,
                    protocol: handle.protocol.clone(),
                    attack_name: handle.attack_name.clone(),
                    started_at: handle.started_at,
                    phase: handle.phase(),
                    stats: handle.stats(),
                }
            })
            .collect()
    }

    /// Get statistics for a specific attack
    pub fn get_stats(&self, id: Uuid) -> Result<AttackStats> {
        self.attacks
            .get(&id)
            .map(|h| h.stats())
            .ok_or_else(|| Error::NotFound(format!("Attack {} not found", id)))
    }

    /// Get the number of tracked attacks
    pub fn active_count(&self) -> usize {
        self.attacks.len()
    }

    /// Whether the attack is tracked and has not been asked to stop
    pub fn is_running(&self, id: Uuid) -> bool {
        self.attacks.get(&id).map(|h| h.is_running()).unwrap_or(false)
    }

    /// Whether the attack body has exited
    pub fn is_finished(&self, id: Uuid) -> bool {
        self.attacks.get(&id).map(|h| h.is_finished()).unwrap_or(true)
    }

    /// Drop handles of attacks whose body has exited
    pub fn cleanup_completed(&self) -> usize {
        let before = self.attacks.len();
        self.attacks.retain(|id, handle| {
            let keep = !handle.is_finished();
            if !keep {
                debug!(id = %id, "Cleaned up completed attack");
            }
            keep
        });
        before - self.attacks.len()
    }
}

impl Default for AttackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AttackManager {
    fn drop(&mut self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        for entry in self.attacks.iter() {
            entry.value().stop();
        }
    }
}
