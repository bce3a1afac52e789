//! Error types for leasejack

use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for leasejack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for leasejack
#[derive(Error, Debug)]
pub enum Error {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol-specific error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Attack execution error
    #[error("Attack error: {0}")]
    Attack(String),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Invalid attack ID
    #[error("Invalid attack ID: {0}")]
    InvalidAttackId(u8),

    /// A layer was rejected while building a frame
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),

    /// Packet parsing error
    #[error("Packet parsing error: {0}")]
    PacketParsing(String),

    /// Capture error
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Option with a bad length or type in attacker-supplied bytes
    #[error("Malformed option {code} at offset {offset}: {reason}")]
    MalformedOption {
        offset: usize,
        code: u8,
        reason: &'static str,
    },

    /// Capture shorter than the fields being read
    #[error("Truncated packet: need {needed} bytes, capture has {available}")]
    TruncatedPacket { needed: usize, available: usize },

    /// A field write would run past a fixed buffer
    #[error("Buffer overflow: {needed} bytes exceed capacity {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    /// No room left in the options buffer
    #[error("Options buffer full: {needed} bytes exceed capacity {capacity}")]
    OptionsFull { needed: usize, capacity: usize },

    /// Option index not present in the options buffer
    #[error("Option #{0} not found")]
    OptionNotFound(usize),

    /// No ARP reply within the learning budget
    #[error("Timeout waiting for an ARP reply from {0}")]
    ArpTimeout(Ipv4Addr),

    /// Stop flag observed
    #[error("Operation cancelled")]
    Cancelled,

    /// Frame build or write failure from the transmission substrate
    #[error("Link layer error: {0}")]
    LinkLayer(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl Error {
    /// Create a protocol error with a custom message
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create an attack error with a custom message
    pub fn attack<S: Into<String>>(msg: S) -> Self {
        Error::Attack(msg.into())
    }

    /// Create a link layer error with a custom message
    pub fn link_layer<S: Into<String>>(msg: S) -> Self {
        Error::LinkLayer(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure only affects the current packet or operation.
    ///
    /// Parsing and capacity errors reject one input; an ARP timeout lets the
    /// caller decide whether to skip the address. Everything else ends the
    /// attack run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedOption { .. }
                | Error::TruncatedPacket { .. }
                | Error::BufferOverflow { .. }
                | Error::OptionsFull { .. }
                | Error::OptionNotFound(_)
                | Error::ArpTimeout(_)
        )
    }

    /// Whether this error is the cooperative stop outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
