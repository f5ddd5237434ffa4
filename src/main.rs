use anyhow::{Context, Result};
use clap::Parser;
use loqa_clips::{
    create_router, AppState, CaptureDeviceFactory, Config, ControllerOptions, HttpUploadService,
    RecorderController,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loqa-clips")]
#[command(about = "Record short audio clips, save them locally or send them for transcription")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/loqa-clips")]
    config: String,

    /// HTTP bind address (overrides service.http.bind)
    #[arg(long)]
    bind: Option<String>,

    /// HTTP port (overrides service.http.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loqa Clips v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let device = CaptureDeviceFactory::create(&cfg.capture)?;
    let uploader = Arc::new(HttpUploadService::new(&cfg.upload)?);

    let downloads_dir = cfg.downloads_dir();
    info!("Recordings will be saved to {}", downloads_dir.display());

    let recorder = RecorderController::spawn(
        device,
        uploader,
        ControllerOptions {
            downloads_dir,
            ..ControllerOptions::default()
        },
    );

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(AppState::new(recorder)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
