//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ComponentConfig, NodeBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    node: String,
    dispatcher: DispatcherInfo,
    components: Vec<ComponentInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    peers: Vec<ComponentInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    ack_timeout_ms: u64,
    max_retries: u8,
    max_transmissions: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct ComponentInfo {
    id: u8,
    name: String,
}

impl From<&ComponentConfig> for ComponentInfo {
    fn from(component: &ComponentConfig) -> Self {
        Self {
            id: component.id,
            name: component.name.clone(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &NodeBlueprint, args: &InfoArgs) -> ConfigInfo {
    let dispatcher = &blueprint.dispatcher;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        node: blueprint.node.name.clone(),
        dispatcher: DispatcherInfo {
            ack_timeout_ms: dispatcher.ack_timeout_ms,
            max_retries: dispatcher.max_retries,
            max_transmissions: u16::from(dispatcher.max_retries) + 1,
            response_timeout_ms: dispatcher.response_timeout_ms,
        },
        components: blueprint.components.iter().map(ComponentInfo::from).collect(),
        peers: if args.peers {
            blueprint.peers.iter().map(ComponentInfo::from).collect()
        } else {
            Vec::new()
        },
    }
}

fn print_config_info(blueprint: &NodeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                xpcc Dispatcher Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Node");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Name: {}", blueprint.node.name);

    let dispatcher = &blueprint.dispatcher;
    println!("\n⚙️  Dispatcher");
    println!("   ├─ Ack timeout: {} ms", dispatcher.ack_timeout_ms);
    println!(
        "   ├─ Max retries: {} ({} transmissions)",
        dispatcher.max_retries,
        u16::from(dispatcher.max_retries) + 1
    );
    match dispatcher.response_timeout_ms {
        Some(ms) => println!("   └─ Response timeout: {} ms", ms),
        None => println!("   └─ Response timeout: none"),
    }

    print_components("🧩 Components", &blueprint.components);

    if args.peers {
        print_components("🌐 Peers", &blueprint.peers);
    } else {
        println!("\n🌐 Peers ({})", blueprint.peers.len());
    }

    println!();
}

fn print_components(title: &str, components: &[ComponentConfig]) {
    println!("\n{} ({})", title, components.len());
    for (i, component) in components.iter().enumerate() {
        let prefix = if i == components.len() - 1 { "└─" } else { "├─" };
        println!("   {} #{} {}", prefix, component.id, component.name);
    }
}
