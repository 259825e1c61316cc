pub mod bootstrap;
pub mod config;
pub mod identity;
pub mod player;
pub mod realtime;
pub mod server;
pub mod store;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

/// Entrypoint used by `main.rs` to run the full CLI.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
