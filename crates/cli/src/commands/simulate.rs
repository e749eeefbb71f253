//! `simulate` command implementation.

use anyhow::{Context, Result};
use contracts::NodeBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::SimulateArgs;
use crate::error::CliError;
use crate::simulation::{Simulation, SimulationConfig, REMOTE_NODE};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        node = %blueprint.node.name,
        components = blueprint.components.len(),
        peers = blueprint.peers.len(),
        ack_timeout_ms = blueprint.dispatcher.ack_timeout_ms,
        max_retries = blueprint.dispatcher.max_retries,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let node = blueprint.node.name.clone();
    let simulation = Simulation::new(SimulationConfig {
        blueprint,
        requests: args.requests,
        loss_every: if args.loss == 0 { None } else { Some(args.loss) },
        tick: Duration::from_millis(args.tick_ms),
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting simulation...");

    tokio::select! {
        result = simulation.run() => {
            let stats = result.context("Simulation failed")?;
            info!(
                responses = stats.requests.responses,
                timeouts = stats.requests.timeouts,
                packets_lost = stats.packets_lost,
                duration_secs = stats.duration.as_secs_f64(),
                "Simulation completed"
            );
            stats.print_summary(&node, REMOTE_NODE);
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping simulation...");
        }
    }

    info!("xpcc dispatch finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &NodeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Node: {}", blueprint.node.name);
    println!(
        "Dispatcher: ack timeout {} ms, {} retries",
        blueprint.dispatcher.ack_timeout_ms, blueprint.dispatcher.max_retries
    );
    if let Some(ms) = blueprint.dispatcher.response_timeout_ms {
        println!("Response timeout: {} ms", ms);
    }

    println!("\nComponents ({}):", blueprint.components.len());
    for component in &blueprint.components {
        println!("  - #{} {}", component.id, component.name);
    }

    if !blueprint.peers.is_empty() {
        println!("\nPeers ({}):", blueprint.peers.len());
        for peer in &blueprint.peers {
            println!("  - #{} {}", peer.id, peer.name);
        }
    }

    println!();
}
