//! leasejack core library
//!
//! Fundamental traits, types, error taxonomy and the link-layer abstraction
//! shared by every leasejack crate.

pub mod attack;
pub mod error;
pub mod interface;
pub mod link;
pub mod packet;
pub mod parameter;
pub mod protocol;
pub mod types;

// Re-export commonly used types
pub use attack::{
    Attack, AttackContext, AttackDescriptor, AttackHandle, AttackId, AttackPhase, AttackStats,
    AttackStatsCounters, PhaseSignal,
};
pub use error::{Error, Result};
pub use interface::{Interface, PacketCounters};
pub use link::{next_packet, CaptureTimeout, Captured, LinkLayer, MemoryLink, ProtocolFilter};
pub use packet::Packet;
pub use parameter::{parse_param_value, ParamDescriptor, ParameterType};
pub use protocol::{AttackParams, ParamValue, Protocol, ProtocolStats};
pub use types::*;
