use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config;
use crate::player;
use crate::store::PlayerStore;
use crate::util::logging::init_tracing;
use crate::util::shutdown::SHUTDOWN;

#[derive(Parser)]
#[command(name = "signage-player")]
#[command(version, about = "Digital signage player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair with the server if needed, then stay connected
    Run {
        /// Overrides `api_url` from the config file
        #[arg(long)]
        api_url: Option<String>,
        /// Seconds between pairing status checks
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// Show the stored pairing state
    Status,

    /// Forget the device identity and credentials
    Reset,

    /// Show version information
    Version,
}

pub async fn cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            api_url,
            poll_interval,
        } => {
            let log_level = init_tracing("info");
            let mut config = config::Config::load()?;
            if let Some(url) = api_url {
                config.api_url = url;
            }
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            if let Err(e) = log_level.apply_configured(&config.log_level) {
                warn!(level = %config.log_level, "ignoring invalid log level: {e}");
            }

            let store = PlayerStore::default_location()?;
            player::run(&config, store, SHUTDOWN.clone()).await?
        }
        Commands::Status => {
            let store = PlayerStore::default_location()?;
            let state = store.load().context("Failed to read player state")?;
            println!("State file: {}", store.path().display());
            println!(
                "Device id:  {}",
                state.device_hardware_id.as_deref().unwrap_or("(not generated)")
            );
            match state.credentials() {
                Some(creds) => {
                    let screen = creds
                        .screen_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "(unknown)".to_string());
                    println!("Paired:     yes (screen {screen})");
                    if let Some(name) = creds.screen_name {
                        println!("Name:       {name}");
                    }
                    if let Some(playlist) = creds.playlist_id {
                        println!("Playlist:   {playlist}");
                    }
                }
                None => println!("Paired:     no"),
            }
        }
        Commands::Reset => {
            let store = PlayerStore::default_location()?;
            store.clear()?;
            println!("Player state cleared; the next run pairs again");
        }
        Commands::Version => {
            println!("signage-player version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
