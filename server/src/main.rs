//! Dioscuri binary: command line shell over the [`dioscuri`] library crate.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use dioscuri::{router, AppState};
use dioscuri_core::{Browser, Config};

/// Browse Geminispace from any web browser.
#[derive(Parser)]
#[command(name = "dioscuri", version, about, long_about = None)]
struct Cli {
    /// Directory holding config.toml, the database, themes and static files
    /// (default: ~/.dioscuri)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Address to listen on, overriding config.toml
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Theme directory name under themes/, overriding config.toml
    #[arg(long)]
    theme: Option<String>,
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("Received SIGINT, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dioscuri_core::init_logging();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(Config::default_data_dir);

    let mut config = Config::load(&data_dir)
        .with_context(|| format!("loading config from {}", data_dir.display()))?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    let listen = config.listen;
    let browser = Browser::new(config).context("initializing browser")?;
    let app = router(AppState::new(browser));

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    info!("Dioscuri listening on http://{listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
