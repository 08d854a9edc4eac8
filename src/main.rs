use anyhow::Result;
use clap::Parser;
use tracing::info;

use peerchat::{cli::Cli, session};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    // Diagnostics go to stderr; stdout is reserved for the chat surface.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.peer {
        Some(peer) => session::dial(peer).await?,
        None => session::listen().await?,
    }

    // The process outlives any single chat session; only the interrupt ends it.
    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    Ok(())
}
