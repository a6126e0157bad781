mod error;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;

use captioner_core::{CaptionService, MediaStore, Settings};
use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "captioner-server")]
#[command(about = "HTTP API for video uploads and caption generation", version)]
struct Args {
    /// Overrides the configured listen port
    #[arg(short, long)]
    port: Option<u16>,
    /// Overrides the configured upload directory
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut settings = Settings::load()
        .into_diagnostic()
        .wrap_err("Failed to load configuration")?;
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(dir) = args.upload_dir {
        settings.upload_dir = dir;
    }
    settings.warn_if_incomplete();

    let store = MediaStore::from_settings(&settings).wrap_err("Failed to open upload directory")?;
    let captions = CaptionService::from_settings(&settings, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(
        addr = %addr,
        uploads = %captions.store().dir().display(),
        provider_configured = captions.is_configured(),
        environment = %settings.app_env,
        "server_listening"
    );

    let app = routes::router(routes::AppState { captions });
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "shutdown_signal_unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown_signal_received");
}
