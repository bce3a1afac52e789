//! CLI argument parsing

use clap::{Parser, Subcommand};
use leasejack_core::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "leasejack")]
#[command(version, about = "DHCP manipulation toolkit for network security testing", long_about = None)]
pub struct Cli {
    /// Network interface to use (repeat for several output interfaces)
    #[arg(short = 'i', long = "interface", global = true, value_name = "IFACE")]
    pub interfaces: Vec<String>,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use in-memory links instead of real interfaces; nothing reaches the wire
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available network interfaces
    Interfaces,

    /// List protocols and their attacks
    Protocols {
        /// Specific protocol to show
        #[arg(value_name = "PROTOCOL")]
        protocol: Option<String>,
    },

    /// Launch an attack
    Attack {
        /// Protocol short name
        #[arg(short = 'P', long, default_value = "dhcp")]
        protocol: String,

        /// Attack ID (see `protocols`)
        #[arg(short, long)]
        attack: u8,

        /// Attack parameters (key=value pairs)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Stop the attack after this many seconds (0 = run until done or Ctrl-C)
        #[arg(short = 't', long, value_name = "SECONDS", default_value = "0")]
        timeout: u64,
    },

    /// Print every captured packet of a protocol
    Watch {
        /// Protocol short name
        #[arg(short = 'P', long, default_value = "dhcp")]
        protocol: String,

        /// Stop after this many packets
        #[arg(short = 'c', long)]
        count: Option<u64>,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Split `key=value` strings, keeping their order
pub fn parse_params(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|param| {
            let (key, value) = param.split_once('=').ok_or_else(|| {
                Error::invalid_parameter(param.clone(), "expected KEY=VALUE")
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::invalid_parameter(param.clone(), "empty parameter name"));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
