mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::lifecycle::Control;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vmflow")]
#[command(about = "EC2 virtualization driver: deploy, control and monitor VMs", long_about = None)]
struct Cli {
    /// Driver configuration file (ec2_driver.conf) [default: VMFLOW_CONFIG_PATH,
    /// ~/.config/vmflow, /etc/vmflow]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Attribute defaults file (ec2_driver.default) [default: VMFLOW_DEFAULTS_PATH,
    /// or beside the config file]
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an instance from a resource descriptor
    Deploy {
        /// Orchestrator VM id (stored in the ONE_ID tag)
        id: String,
        /// Target host name, selects the region binding and descriptor section
        host: String,
        /// Resource descriptor file
        descriptor: PathBuf,
        /// Override a descriptor attribute
        #[arg(
            short = 'a',
            long = "attribute",
            value_name = "KEY=VALUE",
            value_parser = parse_attribute
        )]
        attributes: Vec<(String, String)>,
    },
    /// Terminate an instance
    Shutdown {
        deploy_id: String,
        host: String,
    },
    /// Terminate an instance (abort a running deployment)
    Cancel {
        deploy_id: String,
        host: String,
    },
    /// Reboot an instance
    Reboot {
        deploy_id: String,
        host: String,
    },
    /// Stop an instance, keeping its volumes
    Save {
        deploy_id: String,
        host: String,
    },
    /// Start a stopped instance
    Restore {
        deploy_id: String,
        host: String,
    },
    /// Report the state of one instance
    Poll {
        /// Orchestrator VM id
        id: String,
        deploy_id: String,
        host: String,
    },
    /// Report host capacity and every instance in the region
    Monitor {
        host: String,
    },
    /// Show version information
    Version,
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the driver protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let context = || utils::load_context(cli.config.as_deref(), cli.defaults.as_deref());

    match cli.command {
        Commands::Deploy {
            id,
            host,
            descriptor,
            attributes,
        } => {
            commands::deploy::handle(&context()?, &id, &host, &descriptor, &attributes).await?;
        }
        Commands::Shutdown { deploy_id, host } => {
            commands::lifecycle::handle(&context()?, Control::Shutdown, &deploy_id, &host).await?;
        }
        Commands::Cancel { deploy_id, host } => {
            commands::lifecycle::handle(&context()?, Control::Cancel, &deploy_id, &host).await?;
        }
        Commands::Reboot { deploy_id, host } => {
            commands::lifecycle::handle(&context()?, Control::Reboot, &deploy_id, &host).await?;
        }
        Commands::Save { deploy_id, host } => {
            commands::lifecycle::handle(&context()?, Control::Save, &deploy_id, &host).await?;
        }
        Commands::Restore { deploy_id, host } => {
            commands::lifecycle::handle(&context()?, Control::Restore, &deploy_id, &host).await?;
        }
        Commands::Poll {
            id,
            deploy_id,
            host,
        } => {
            commands::poll::handle(&context()?, &id, &deploy_id, &host).await?;
        }
        Commands::Monitor { host } => {
            commands::monitor::handle(&context()?, &host).await?;
        }
        Commands::Version => {
            println!("vmflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
