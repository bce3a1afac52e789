//! CLI interface for leasejack
//!
//! Argument parsing and the text rendering used by the `leasejack` binary.

pub mod args;
pub mod report;

pub use args::{parse_params, Cli, Commands};
