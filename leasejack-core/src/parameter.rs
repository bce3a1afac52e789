//! Attack parameter descriptors and parsing

use crate::protocol::ParamValue;
use crate::{Error, MacAddr, Result};
use std::net::IpAddr;

/// Parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// String parameter
    String,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit unsigned integer
    U32,
    /// 16-bit unsigned integer
    U16,
    /// 8-bit unsigned integer
    U8,
    /// Boolean flag
    Bool,
    /// MAC address
    MacAddr,
    /// IP address
    IpAddr,
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParameterType::String => "string",
            ParameterType::U64 => "u64",
            ParameterType::U32 => "u32",
            ParameterType::U16 => "u16",
            ParameterType::U8 => "u8",
            ParameterType::Bool => "bool",
            ParameterType::MacAddr => "mac",
            ParameterType::IpAddr => "ip",
        };
        f.write_str(name)
    }
}

/// Parameter descriptor
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// Parameter name
    pub name: &'static str,
    /// Parameter description
    pub description: &'static str,
    /// Parameter type
    pub param_type: ParameterType,
    /// Default value
    pub default: Option<String>,
    /// Is this parameter required?
    pub required: bool,
}

impl ParamDescriptor {
    pub fn new(name: &'static str, param_type: ParameterType) -> Self {
        Self {
            name,
            description: "",
            param_type,
            default: None,
            required: false,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Parse a raw value for this parameter
    pub fn parse(&self, raw: &str) -> Result<ParamValue> {
        parse_param_value(self.param_type, raw).map_err(|err| match err {
            Error::Protocol(reason) => Error::invalid_parameter(self.name, reason),
            other => Error::invalid_parameter(self.name, other.to_string()),
        })
    }
}

fn parse_uint(raw: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    }
}

/// Parse a command-line value into the typed form `param_type` asks for.
///
/// Integers accept decimal or `0x`-prefixed hex.
pub fn parse_param_value(param_type: ParameterType, raw: &str) -> Result<ParamValue> {
    let raw = raw.trim();
    let out_of_range = || Error::protocol(format!("'{}' is out of range for {}", raw, param_type));
    let not_a = |what: &str| Error::protocol(format!("'{}' is not {}", raw, what));

    let value = match param_type {
        ParameterType::String => ParamValue::String(raw.to_string()),
        ParameterType::U64 => ParamValue::U64(parse_uint(raw).map_err(|_| not_a("an integer"))?),
        ParameterType::U32 => {
            let v = parse_uint(raw).map_err(|_| not_a("an integer"))?;
            ParamValue::U32(u32::try_from(v).map_err(|_| out_of_range())?)
        }
        ParameterType::U16 => {
            let v = parse_uint(raw).map_err(|_| not_a("an integer"))?;
            ParamValue::U16(u16::try_from(v).map_err(|_| out_of_range())?)
        }
        ParameterType::U8 => {
            let v = parse_uint(raw).map_err(|_| not_a("an integer"))?;
            ParamValue::U8(u8::try_from(v).map_err(|_| out_of_range())?)
        }
        ParameterType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => ParamValue::Bool(true),
            "false" | "no" | "off" | "0" => ParamValue::Bool(false),
            _ => return Err(not_a("a boolean")),
        },
        ParameterType::MacAddr => ParamValue::MacAddr(raw.parse::<MacAddr>()?),
        ParameterType::IpAddr => {
            ParamValue::IpAddr(raw.parse::<IpAddr>().map_err(|_| not_a("an IP address"))?)
        }
    };
    Ok(value)
}
