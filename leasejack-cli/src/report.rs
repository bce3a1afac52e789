//! Text output of the CLI commands

use leasejack_capture::InterfaceInfo;
use leasejack_core::{AttackStats, Protocol, Result};
use leasejack_protocols::dhcp::{decode, DhcpField};
use std::fmt::Write;

/// One line per interface: name, MAC, addresses, state
pub fn interface_line(info: &InterfaceInfo) -> String {
    let mac = info
        .mac
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    let ips: Vec<String> = info.ips.iter().map(|ip| ip.to_string()).collect();
    let state = match (info.is_up, info.is_capture_capable()) {
        (false, _) => "down",
        (true, false) => "up",
        (true, true) => "up, usable",
    };
    format!("{:<12} {:<17} [{}] ({})", info.name, mac, ips.join(", "), state)
}

/// Attack catalogue of a protocol with the parameters of each attack
pub fn describe_protocol(protocol: &dyn Protocol) -> String {
    let mut out = format!("{} ({})\n", protocol.name(), protocol.shortname());

    for attack in protocol.attacks() {
        let kind = if attack.continuous { "continuous" } else { "one-shot" };
        let _ = writeln!(out, "  {}  {} [{}]", attack.id, attack.name, kind);
        let _ = writeln!(out, "      {}", attack.description);

        for param in &attack.parameters {
            let mut line = format!("      - {} <{}>", param.name, param.param_type);
            if param.required {
                line.push_str(" required");
            }
            if let Some(default) = &param.default {
                let _ = write!(line, " default={}", default);
            }
            if !param.description.is_empty() {
                let _ = write!(line, "  {}", param.description);
            }
            let _ = writeln!(out, "{}", line);
        }
    }
    out
}

pub fn attack_summary(stats: &AttackStats) -> String {
    format!(
        "sent {} packets ({} bytes), received {}, errors {}",
        stats.packets_sent, stats.bytes_sent, stats.packets_received, stats.errors
    )
}

/// Decoded field table of a captured DHCP frame, options on the last row
pub fn dhcp_table(frame: &[u8]) -> Result<String> {
    let mut decoded = decode(frame)?;
    let options = decoded.render_options()?;

    let mut out = String::new();
    for (field, value) in &decoded.fields {
        let _ = writeln!(out, "{:>7}: {}", field.name().to_uppercase(), value);
    }
    let _ = writeln!(out, "{:>7}: {}", DhcpField::Tlv.name().to_uppercase(), options);
    Ok(out)
}
