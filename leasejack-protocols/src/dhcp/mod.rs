//! DHCP (Dynamic Host Configuration Protocol) manipulation
//!
//! - [`packet`]: the editable message model and its builders
//! - [`tlv`]: option walking, decoding of captured frames, option edits
//! - [`frame`]: Ethernet/IPv4/UDP wrapping and per-interface transmission
//! - [`attack`]: raw send, DISCOVER flood, rogue server, RELEASE DoS
//! - [`protocol`]: the [`Protocol`](leasejack_core::Protocol) implementation

pub mod attack;
pub mod frame;
pub mod packet;
pub mod protocol;
pub mod tlv;

pub use attack::{DiscoverFlood, LeasePool, ReleaseDos, RogueServer, SendRaw};
pub use frame::{build_frame, send_message, FailurePolicy};
pub use packet::{DhcpField, DhcpMessage, DhcpMessageType, OptionCode};
pub use protocol::{DhcpProtocol, DhcpStats};
pub use tlv::{decode, load_fixed_fields, DecodedPacket, OptionValue, TlvAction};
