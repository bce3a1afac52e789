//! Attack traits and types

use crate::interface::PacketCounters;
use crate::link::POLL_SLICE;
use crate::parameter::ParamDescriptor;
use crate::protocol::AttackParams;
use crate::{Error, Interface, ProtocolId, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::watch;

/// Attack identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttackId(pub u8);

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attack trait that all attacks must implement
///
/// Attack bodies are blocking: they sleep between transmissions and wait on
/// captures. The executor runs them on tokio's blocking pool, so `execute`
/// must poll `ctx.is_running()` between steps to allow a clean shutdown.
pub trait Attack: Send + Sync {
    /// Run the attack until it completes, fails, or is stopped
    fn execute(&self, ctx: AttackContext) -> Result<()>;

    /// Get attack name
    fn name(&self) -> &str;
}

/// Attack descriptor (metadata about an attack)
#[derive(Debug, Clone)]
pub struct AttackDescriptor {
    /// Attack ID
    pub id: AttackId,
    /// Human-readable name
    pub name: &'static str,
    /// Description of what the attack does
    pub description: &'static str,
    /// Keeps running until stopped
    pub continuous: bool,
    /// Parameters this attack accepts
    pub parameters: Vec<ParamDescriptor>,
}

/// Lifecycle of one attack run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    Pending,
    Running,
    Finished,
}

impl fmt::Display for AttackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackPhase::Pending => write!(f, "pending"),
            AttackPhase::Running => write!(f, "running"),
            AttackPhase::Finished => write!(f, "finished"),
        }
    }
}

/// Sending half of the finished signal.
///
/// Lives inside the [`AttackContext`]; whichever way the attack body exits,
/// dropping the context publishes [`AttackPhase::Finished`] exactly once and
/// then closes the channel.
pub struct PhaseSignal {
    tx: watch::Sender<AttackPhase>,
}

impl PhaseSignal {
    /// Create a signal and the receiver kept by the handle
    pub fn channel() -> (Self, watch::Receiver<AttackPhase>) {
        let (tx, rx) = watch::channel(AttackPhase::Pending);
        (Self { tx }, rx)
    }

    fn set(&self, phase: AttackPhase) {
        self.tx.send_replace(phase);
    }
}

impl Drop for PhaseSignal {
    fn drop(&mut self) {
        self.tx.send_replace(AttackPhase::Finished);
    }
}

/// Attack statistics
#[derive(Debug, Clone)]
pub struct AttackStats {
    /// Packets sent
    pub packets_sent: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Packets received (if applicable)
    pub packets_received: u64,
    /// Errors encountered
    pub errors: u64,
    /// When the attack started
    pub started_at: Option<SystemTime>,
    /// Duration in seconds (if finished)
    pub duration_secs: Option<u64>,
    /// Is the attack currently running?
    pub is_running: bool,
    /// Lifecycle phase
    pub phase: AttackPhase,
}

/// Attack context passed to the execute method
pub struct AttackContext {
    /// Interfaces to send and capture on, in configuration order
    pub interfaces: Vec<Interface>,
    /// Launch parameters
    pub params: AttackParams,
    /// Running flag (attack should stop when this is false)
    pub running: Arc<AtomicBool>,
    /// Statistics counters
    pub stats: Arc<AttackStatsCounters>,
    /// Registry-wide per-protocol counters
    pub counters: Arc<PacketCounters>,
    phase: PhaseSignal,
}

impl AttackContext {
    pub fn new(
        interfaces: Vec<Interface>,
        params: AttackParams,
        running: Arc<AtomicBool>,
        stats: Arc<AttackStatsCounters>,
        counters: Arc<PacketCounters>,
        phase: PhaseSignal,
    ) -> Self {
        Self {
            interfaces,
            params,
            running,
            stats,
            counters,
            phase,
        }
    }

    /// Whether the attack may keep going
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Request a stop from inside the attack body
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Publish that the body has started
    pub fn mark_running(&self) {
        self.phase.set(AttackPhase::Running);
    }

    /// Sleep for `duration`, waking every [`POLL_SLICE`] to check the stop
    /// flag. Returns `Cancelled` once a stop is observed. A duration past
    /// what `Instant` can represent only ends with a stop.
    pub fn pause(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if !self.is_running() {
                return Err(Error::Cancelled);
            }
            let left = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => POLL_SLICE,
            };
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(POLL_SLICE));
        }
    }

    /// Account for one frame written on `iface`
    pub fn record_sent(&self, protocol: ProtocolId, iface: &Interface, bytes: usize) {
        iface.counters().increment_sent(protocol);
        self.counters.increment_sent(protocol);
        self.stats.increment_packets_sent();
        self.stats.add_bytes_sent(bytes as u64);
    }
}

/// Thread-safe attack statistics counters
#[derive(Debug, Default)]
pub struct AttackStatsCounters {
    pub packets_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub packets_received: AtomicU64,
    pub errors: AtomicU64,
}

impl AttackStatsCounters {
    pub fn increment_packets_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_packets_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn to_stats(&self, started_at: SystemTime, phase: AttackPhase, running: bool) -> AttackStats {
        let duration_secs = if phase == AttackPhase::Finished {
            SystemTime::now()
                .duration_since(started_at)
                .ok()
                .map(|d| d.as_secs())
        } else {
            None
        };

        AttackStats {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            started_at: Some(started_at),
            duration_secs,
            is_running: running,
            phase,
        }
    }
}

/// Handle to a running attack
pub struct AttackHandle {
    /// Attack ID (UUID v7 for time-ordered tracking)
    pub id: uuid::Uuid,
    /// Protocol name
    pub protocol: String,
    /// Attack name
    pub attack_name: String,
    /// Running flag
    pub running: Arc<AtomicBool>,
    /// Statistics
    pub stats: Arc<AttackStatsCounters>,
    /// Start time
    pub started_at: SystemTime,
    /// Finished signal receiver
    pub phase: watch::Receiver<AttackPhase>,
    /// Task handle (for async runtime)
    pub task_handle: Option<tokio::task::JoinHandle<Result<()>>>,
}

impl AttackHandle {
    /// Ask the attack to stop; it exits at its next checkpoint
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> AttackPhase {
        *self.phase.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == AttackPhase::Finished
    }

    /// Resolve once the attack body has exited
    pub async fn wait_finished(&self) {
        let mut rx = self.phase.clone();
        // A closed channel means the signal was dropped, which also publishes Finished.
        let _ = rx.wait_for(|p| *p == AttackPhase::Finished).await;
    }

    /// Get current statistics
    pub fn stats(&self) -> AttackStats {
        self.stats
            .to_stats(self.started_at, self.phase(), self.is_running())
    }
}

impl fmt::Debug for AttackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttackHandle")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("attack_name", &self.attack_name)
            .field("phase", &self.phase())
            .finish()
    }
}
