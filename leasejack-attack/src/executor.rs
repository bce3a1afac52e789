//! Attack executor that runs attacks with proper error handling
//!
//! Attack bodies are blocking, so each one gets its own thread from tokio's
//! blocking pool. The executor owns the wiring around that thread:
//! - building the `AttackContext` (stop flag, counters, finished signal)
//! - translating a cooperative stop into a clean `Ok(())`
//! - logging the outcome via tracing
//! - turning join failures (panics) into `ExecutionFailed`

use leasejack_core::{
    Attack, AttackContext, AttackHandle, AttackParams, AttackStatsCounters, Error, Interface,
    PacketCounters, PhaseSignal, Result,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Attack executor that handles the lifecycle of an attack
pub struct AttackExecutor {
    /// Unique identifier for this attack instance
    id: Uuid,
    /// Protocol name
    protocol_name: String,
    /// Attack name
    attack_name: String,
}

impl AttackExecutor {
    /// Create a new attack executor
    pub fn new(protocol_name: impl Into<String>, attack_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            protocol_name: protocol_name.into(),
            attack_name: attack_name.into(),
        }
    }

    /// Start `attack` on the blocking pool and return its handle.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn execute(
        self,
        attack: Arc<dyn Attack>,
        interfaces: Vec<Interface>,
        params: AttackParams,
        counters: Arc<PacketCounters>,
    ) -> Result<AttackHandle> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::ExecutionFailed(format!("no tokio runtime: {}", e)))?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(AttackStatsCounters::default());
        let (signal, phase) = PhaseSignal::channel();
        let context = AttackContext::new(
            interfaces,
            params,
            running.clone(),
            stats.clone(),
            counters,
            signal,
        );

        let id = self.id;
        info!(
            id = %id,
            protocol = %self.protocol_name,
            attack = %self.attack_name,
            "Starting attack"
        );

        let protocol_name = self.protocol_name.clone();
        let attack_name = self.attack_name.clone();
        let task_handle = runtime.spawn_blocking(move || {
            context.mark_running();
            let result = attack.execute(context);

            match result {
                Ok(()) => {
                    info!(id = %id, protocol = %protocol_name, attack = %attack_name, "Attack completed");
                    Ok(())
                }
                Err(e) if e.is_cancelled() => {
                    info!(id = %id, protocol = %protocol_name, attack = %attack_name, "Attack stopped");
                    Ok(())
                }
                Err(e) => {
                    error!(
                        id = %id,
                        protocol = %protocol_name,
                        attack = %attack_name,
                        error = %e,
                        "Attack failed"
                    );
                    Err(e)
                }
            }
        });

        Ok(AttackHandle {
            id,
            protocol: self.protocol_name,
            attack_name: self.attack_name,
            running,
            stats,
            started_at: SystemTime::now(),
            phase,
            task_handle: Some(task_handle),
        })
    }
}

/// Helper function to wait for an attack to complete
pub async fn wait_for_attack(handle: &mut AttackHandle) -> Result<()> {
    if let Some(task_handle) = handle.task_handle.take() {
        match task_handle.await {
            Ok(result) => result,
            Err(e) => {
                if e.is_panic() {
                    error!(id = %handle.id, "Attack task panicked");
                    Err(Error::ExecutionFailed("Attack task panicked".to_string()))
                } else {
                    error!(id = %handle.id, error = %e, "Failed to join attack task");
                    Err(Error::ExecutionFailed(format!(
                        "Failed to join attack task: {}",
                        e
                    )))
                }
            }
        }
    } else {
        warn!(id = %handle.id, "Attack task already joined");
        Ok(())
    }
}

/// Helper function to stop an attack and wait for it to complete
pub async fn stop_and_wait(handle: &mut AttackHandle) -> Result<()> {
    debug!(id = %handle.id, "Stopping attack");

    handle.stop();
    wait_for_attack(handle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use leasejack_core::{AttackPhase, MacAddr, MemoryLink};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    enum Behaviour {
        LoopUntilStopped,
        Fail,
        Panic,
        Cancelled,
    }

    struct TestAttack {
        behaviour: Behaviour,
    }

    impl Attack for TestAttack {
        fn execute(&self, ctx: AttackContext) -> Result<()> {
            match self.behaviour {
                Behaviour::Panic => panic!("Test panic"),
                Behaviour::Fail => Err(Error::link_layer("Test error")),
                Behaviour::Cancelled => Err(Error::Cancelled),
                Behaviour::LoopUntilStopped => {
                    while ctx.is_running() {
                        std::thread::sleep(Duration::from_millis(5));
                        ctx.stats.increment_packets_sent();
                    }
                    Ok(())
                }
            }
        }

        fn name(&self) -> &str {
            "test_attack"
        }
    }

    fn launch(behaviour: Behaviour) -> AttackHandle {
        let iface = Interface::new("mem0", 0, MacAddr::zero(), Arc::new(MemoryLink::new()));
        AttackExecutor::new("test", "test_attack")
            .execute(
                Arc::new(TestAttack { behaviour }),
                vec![iface],
                AttackParams::new(),
                Arc::new(PacketCounters::new()),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_executor_success() {
        let mut handle = launch(Behaviour::LoopUntilStopped);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.phase(), AttackPhase::Running);

        assert!(stop_and_wait(&mut handle).await.is_ok());
        assert!(handle.stats().packets_sent > 0);
        assert_eq!(handle.phase(), AttackPhase::Finished);
        assert!(!handle.running.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_executor_handles_error() {
        let mut handle = launch(Behaviour::Fail);
        let result = wait_for_attack(&mut handle).await;
        assert!(matches!(result, Err(Error::LinkLayer(_))));
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_executor_handles_panic() {
        let mut handle = launch(Behaviour::Panic);
        let result = wait_for_attack(&mut handle).await;
        assert!(matches!(result, Err(Error::ExecutionFailed(_))));
        handle.wait_finished().await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_cancellation_is_a_clean_exit() {
        let mut handle = launch(Behaviour::Cancelled);
        assert!(wait_for_attack(&mut handle).await.is_ok());
        assert!(wait_for_attack(&mut handle).await.is_ok());
    }

    #[test]
    fn test_executor_requires_runtime() {
        let iface = Interface::new("mem0", 0, MacAddr::zero(), Arc::new(MemoryLink::new()));
        let result = AttackExecutor::new("test", "test_attack").execute(
            Arc::new(TestAttack {
                behaviour: Behaviour::Fail,
            }),
            vec![iface],
            AttackParams::new(),
            Arc::new(PacketCounters::new()),
        );
        assert!(matches!(result, Err(Error::ExecutionFailed(_))));
    }
}
