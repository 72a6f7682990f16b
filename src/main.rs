use anyhow::{Context, Result};
use clap::Parser;
use meeting_ingest::{
    create_router, AppState, ArchivingSink, BufferRegistry, Config, FlushScheduler, NatsClient,
    NatsSegmentSink, SegmentArchiver, SegmentSink,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "meeting-ingest", about = "Per-session audio buffering for live-meeting transcription")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/meeting-ingest")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);

    // Production sink: publish segments over NATS, optionally archiving
    // each one to disk first
    let nats_client = NatsClient::connect(&cfg.nats.url).await?;
    let nats_sink: Arc<dyn SegmentSink> = Arc::new(NatsSegmentSink::new(nats_client));

    let sink: Arc<dyn SegmentSink> = if cfg.archive.enabled {
        let archiver = SegmentArchiver::new(&cfg.archive.path)?;
        Arc::new(ArchivingSink::new(archiver, nats_sink))
    } else {
        nats_sink
    };

    let registry = Arc::new(BufferRegistry::new(cfg.registry_config()));

    let scheduler = FlushScheduler::new(Arc::clone(&registry), Arc::clone(&sink), cfg.scan_interval());
    scheduler.start().await;

    let state = AppState::new(Arc::clone(&registry), Arc::clone(&sink));
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Orderly shutdown: no more scheduler flushes, then drain what's left
    scheduler.stop().await;
    registry.flush_all(&sink).await;

    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
