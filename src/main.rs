use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ConfigCommand, VaultCommand};
use ravn_realmsync::{Config, JsonActorStore, RealmsyncApi, VaultClient};

#[derive(Parser)]
#[command(name = "ravn")]
#[command(version)]
#[command(about = "Sync player characters with the Hero Vault", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse, import and export Hero Vault characters
    Vault(VaultCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ravn_realmsync=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::Vault(cmd)) => {
            // Token and base URL are re-read from the config file on every request
            let client = VaultClient::new(Config::live_client_config(cli.config.clone()))?;
            let store = JsonActorStore::new(config.data_dir.value.clone());
            let api = RealmsyncApi::new(&client, &store, config.environment());
            cmd.run(&api).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
