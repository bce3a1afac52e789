use leasejack_attack::{AttackManager, ProtocolRegistry};
use leasejack_capture::{list_interfaces, open_interface, CaptureConfig};
use leasejack_cli::report::{attack_summary, describe_protocol, dhcp_table, interface_line};
use leasejack_cli::{parse_params, Cli, Commands};
use leasejack_core::{
    next_packet, AttackId, AttackParams, CaptureTimeout, Captured, Error, Interface, MacAddr,
    MemoryLink, PacketCounters, Protocol, Result,
};
use leasejack_protocols::DhcpProtocol;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "leasejack failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let counters = Arc::new(PacketCounters::new());
    let registry = ProtocolRegistry::new();
    registry.register(Arc::new(DhcpProtocol::new(counters.clone())))?;

    match &cli.command {
        Commands::Interfaces => {
            for info in list_interfaces()? {
                println!("{}", interface_line(&info));
            }
            Ok(())
        }
        Commands::Protocols { protocol } => {
            match protocol {
                Some(name) => print!("{}", describe_protocol(registry.require(name)?.as_ref())),
                None => {
                    for info in registry.list_protocols() {
                        if let Some(proto) = registry.get_by_id(info.id) {
                            print!("{}", describe_protocol(proto.as_ref()));
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Attack {
            protocol,
            attack,
            params,
            timeout,
        } => {
            let proto = registry.require(protocol)?;
            let interfaces = open_interfaces(&cli)?;
            run_attack(proto.as_ref(), AttackId(*attack), params, *timeout, &interfaces).await
        }
        Commands::Watch { protocol, count } => {
            let proto = registry.require(protocol)?;
            let interfaces = open_interfaces(&cli)?;
            watch(proto, interfaces, *count).await
        }
    }
}

/// Real interfaces, or in-memory links under `--dry-run`
fn open_interfaces(cli: &Cli) -> Result<Vec<Interface>> {
    if cli.dry_run {
        let names = if cli.interfaces.is_empty() {
            vec!["mem0".to_string()]
        } else {
            cli.interfaces.clone()
        };
        return Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let link = Arc::new(MemoryLink::named(name.clone()));
                Interface::new(name, index as u32, MacAddr::random_local(), link)
            })
            .collect());
    }

    if cli.interfaces.is_empty() {
        return Err(Error::Interface("no interface given, use -i <IFACE>".to_string()));
    }
    let config = CaptureConfig::default();
    cli.interfaces
        .iter()
        .map(|name| open_interface(name, &config))
        .collect()
}

async fn run_attack(
    protocol: &dyn Protocol,
    attack_id: AttackId,
    raw_params: &[String],
    timeout: u64,
    interfaces: &[Interface],
) -> Result<()> {
    let descriptor = protocol
        .attack(attack_id)
        .ok_or(Error::InvalidAttackId(attack_id.0))?;
    let params = AttackParams::from_raw(&descriptor.parameters, &parse_params(raw_params)?)?;

    let manager = AttackManager::new();
    let id = manager.launch(protocol, attack_id, params, interfaces).await?;
    println!("Attack '{}' running as {} (Ctrl-C to stop)", descriptor.name, id);

    let deadline = async {
        if timeout == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(timeout)).await
        }
    };

    let mut last = manager.get_stats(id).ok();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let wait = manager.wait(id);
    tokio::pin!(wait, deadline);

    let result = loop {
        tokio::select! {
            result = &mut wait => break result,
            _ = &mut deadline => {
                info!(id = %id, seconds = timeout, "Timeout reached, stopping attack");
                break manager.stop(id).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!(id = %id, "Interrupted, stopping attack");
                break manager.stop(id).await;
            }
            _ = ticker.tick() => {
                if let Ok(stats) = manager.get_stats(id) {
                    last = Some(stats);
                }
            }
        }
    };

    if let Some(stats) = last {
        println!("{}", attack_summary(&stats));
    }
    result
}

async fn watch(protocol: Arc<dyn Protocol>, interfaces: Vec<Interface>, count: Option<u64>) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));

    let worker = {
        let running = running.clone();
        let protocol = protocol.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let filter = protocol.capture_filter();
            let mut seen = 0u64;
            while running.load(Ordering::Relaxed) {
                let packet = match next_packet(&interfaces, filter, &running, CaptureTimeout::Never)? {
                    Captured::Packet(packet) => packet,
                    Captured::Timeout => continue,
                    Captured::Cancelled => break,
                };

                if protocol.handle_packet(&packet).is_err() {
                    continue;
                }
                match dhcp_table(packet.data()) {
                    Ok(table) => println!("--- {} ({} bytes)\n{}", packet.interface, packet.len(), table),
                    Err(e) => warn!(interface = %packet.interface, error = %e, "Cannot render packet"),
                }

                seen += 1;
                if count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            Ok(())
        })
    };
    tokio::pin!(worker);

    let finished = tokio::select! {
        joined = &mut worker => Some(joined),
        _ = tokio::signal::ctrl_c() => None,
    };
    let joined = match finished {
        Some(joined) => joined,
        None => {
            running.store(false, Ordering::Relaxed);
            worker.await
        }
    };
    let result = joined.map_err(|e| Error::ExecutionFailed(format!("capture task failed: {}", e)))?;

    let stats = protocol.stats();
    println!(
        "{} packets seen, {} parsed, {} errors",
        stats.packets_received, stats.packets_parsed, stats.packets_errors
    );
    result
}
