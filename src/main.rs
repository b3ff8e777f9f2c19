use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

use processos::api::ApiServer;
use processos::config::Config;
use processos::service::ProcessService;
use processos::storage::StorageFactory;

/// Process management backend
#[derive(Parser)]
#[command(name = "processos")]
#[command(
    about = "Process management backend - CRUD over processes with checklist sub-steps",
    long_about = None
)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default command)
    Serve {
        /// Address to bind (overrides config and environment)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and environment)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to a TOML configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("processos started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Some(Commands::Serve { host, port, config }) => run_serve(host, port, config).await,
        None => run_serve(None, None, None).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = StorageFactory::from_config(&config.storage).await?;
    let service = Arc::new(ProcessService::new(store));

    ApiServer::new(service, config.server.host.clone(), config.server.port)
        .start()
        .await
}
