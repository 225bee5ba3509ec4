//! Surveillance worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phoenix_alerts::{AlertDispatcher, EventStore, JsonlEventStore, LogNotifier, Notifier, TelegramNotifier};
use phoenix_media::{backends, Gallery};
use phoenix_worker::{BackendFactory, CameraSupervisor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider was already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run().await {
        error!("Worker failed: {:#}", e);
        std::process::exit(1);
    }
    info!("Worker shutdown complete");
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["phoenix=info", "ort=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting phoenix-worker");

    let config = WorkerConfig::from_env().context("invalid configuration")?;
    info!(
        cameras = config.cameras.len(),
        width = config.frame_width,
        height = config.frame_height,
        sample_every = config.sample_every,
        videos_dir = %config.videos_dir.display(),
        "Worker config loaded"
    );

    if let Some(addr) = &config.metrics_addr {
        phoenix_worker::metrics::init_metrics(addr)?;
    }

    let gallery = load_gallery(&config).await?;

    let notifier: Arc<dyn Notifier> = match config.telegram() {
        Some((token, chat_id)) => Arc::new(TelegramNotifier::new(token, chat_id)?),
        None => {
            warn!("Telegram credentials not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let store: Arc<dyn EventStore> = Arc::new(JsonlEventStore::new(&config.events_path));
    let (outbox, alerts) = AlertDispatcher::channel(config.alert_queue_capacity);
    let dispatcher = tokio::spawn(AlertDispatcher::new(notifier, store).run(alerts));

    let factory = Arc::new(BackendFactory::new(config.clone(), gallery));
    let supervisor = CameraSupervisor::start(&config, factory, Arc::new(outbox))?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
        _ = supervisor.wait_until_finished() => info!("All cameras stopped"),
    }

    let statuses = tokio::task::spawn_blocking(move || supervisor.shutdown())
        .await
        .context("joining camera workers")?;
    for (camera, status) in statuses {
        info!(camera = %camera, status = status.label(), "Camera finished");
    }

    // Every outbox is gone once the workers are joined, so the dispatcher
    // drains what is queued and returns.
    dispatcher.await.context("alert dispatcher")?;
    Ok(())
}

async fn load_gallery(config: &WorkerConfig) -> anyhow::Result<Arc<Gallery>> {
    let dir = config.known_faces_dir.clone();
    let detector = config.face_detector_model.clone();
    let recognizer = config.face_recognizer_model.clone();

    let gallery = tokio::task::spawn_blocking(move || {
        let mut model = backends::face_model(detector.as_deref(), recognizer.as_deref());
        Gallery::load_dir(&dir, model.as_mut())
    })
    .await
    .context("loading known faces")??;

    info!(identities = gallery.len(), "Known faces loaded");
    Ok(Arc::new(gallery))
}
