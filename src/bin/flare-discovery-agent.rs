//! Flare 服务发现代理
//!
//! 加载配置后注册当前服务并等待 Ctrl+C，或一次性解析服务、检查实例健康。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use flare_discovery::config::Config;
use flare_discovery::discovery::DiscoveryFactory;
use flare_discovery::runtime::ServiceRuntime;
use flare_discovery::telemetry;

#[derive(Parser)]
#[command(name = "flare-discovery-agent")]
#[command(about = "Registers a service and resolves peers through Consul or Kubernetes DNS.")]
struct CommandLine {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/discovery.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this service and wait for a shutdown signal (default)
    #[command(alias = "r")]
    Run,
    /// Resolve a service name to one healthy instance
    Resolve { service_name: String },
    /// List every healthy instance of a service
    List { service_name: String },
    /// Check the health of a registered instance
    Health { service_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing()?;

    let cli = CommandLine::parse();
    let config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    info!(path = %cli.config.display(), provider = %config.discovery.provider, "Configuration loaded");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let runtime = ServiceRuntime::new(&config.discovery)?.with_config(config.runtime);
            let state = runtime.run().await?;
            info!(state = ?state, "Agent exited");
        }
        Commands::Resolve { service_name } => {
            let discovery = DiscoveryFactory::create(&config.discovery)?;
            match discovery.discover_service(&service_name).await {
                Some(instance) => println!("{}", instance.http_url()),
                None => anyhow::bail!("no healthy instance of {}", service_name),
            }
        }
        Commands::List { service_name } => {
            let discovery = DiscoveryFactory::create(&config.discovery)?;
            for instance in discovery.discover_services(&service_name).await {
                println!("{}\t{}", instance.service_id(), instance.http_url());
            }
        }
        Commands::Health { service_id } => {
            let discovery = DiscoveryFactory::create(&config.discovery)?;
            let healthy = discovery.is_service_healthy(&service_id).await;
            println!("{}\t{}", service_id, if healthy { "passing" } else { "critical" });
            if !healthy {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
