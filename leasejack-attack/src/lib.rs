//! Attack orchestration for leasejack
//!
//! - `AttackManager`: tracks concurrent attack runs by UUID
//! - `AttackExecutor`: runs one blocking attack body on tokio's blocking pool
//! - `ProtocolRegistry`: protocol lookup by short name or ID
//!
//! # Example
//!
//! ```no_run
//! use leasejack_attack::{AttackManager, ProtocolRegistry};
//! use leasejack_core::{AttackId, AttackParams, Interface};
//!
//! async fn run(registry: &ProtocolRegistry, interfaces: &[Interface]) -> leasejack_core::Result<()> {
//!     let manager = AttackManager::new();
//!     let dhcp = registry.require("dhcp")?;
//!     let id = manager
//!         .launch(dhcp.as_ref(), AttackId(1), AttackParams::new(), interfaces)
//!         .await?;
//!     manager.stop(id).await
//! }
//! ```

pub mod executor;
pub mod manager;
pub mod registry;

pub use executor::{stop_and_wait, wait_for_attack, AttackExecutor};
pub use manager::{AttackInfo, AttackManager};
pub use registry::{ProtocolInfo, ProtocolRegistry};
