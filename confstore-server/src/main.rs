mod config;
mod server;

use crate::config::AppConfig;
use crate::server::run_server;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "confstore")]
#[command(about = "Versioned configuration and configuration-group registry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Validate the configuration and store connectivity, then exit
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confstore=info,confstore_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (config_path, check_only) = match cli.command {
        Commands::Server { config } => (config, false),
        Commands::Check { config } => (config, true),
    };

    tracing::info!("Loading config: {}", config_path);
    let cfg = match AppConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let store = match cfg.store.builder().build().await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to connect to {} store: {}", cfg.store.backend.as_str(), e);
            std::process::exit(1);
        }
    };

    if check_only {
        tracing::info!(
            "Config OK: backend={} namespace={} label_index={}",
            cfg.store.backend.as_str(),
            cfg.store.namespace_or_default(),
            cfg.groups.label_index
        );
        return;
    }

    if let Err(e) = run_server(cfg, store).await {
        tracing::error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
