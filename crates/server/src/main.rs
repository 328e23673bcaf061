mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxysheet_core::{
    load_config, validate_config, CachedImageSource, CommandCompositorFactory, CompositorFactory,
    HttpImageSource, ImageCache, ImageSource,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PROXYSHEET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        "Fetcher: batch size {}, timeout {}s",
        config.fetcher.batch_size, config.fetcher.timeout_secs
    );

    // Create image source, wrapped in a cache when enabled
    let http_source =
        HttpImageSource::new(&config.fetcher).context("Failed to create HTTP image source")?;
    let (image_source, image_cache): (Arc<dyn ImageSource>, Option<ImageCache>) =
        if config.cache.enabled {
            let cache = ImageCache::new(Duration::from_secs(config.cache.ttl_secs));
            info!("Image cache enabled (ttl {}s)", config.cache.ttl_secs);
            (
                Arc::new(CachedImageSource::new(http_source, cache.clone())),
                Some(cache),
            )
        } else {
            info!("Image cache disabled");
            (Arc::new(http_source), None)
        };

    // Create compositor factory
    let compositor_factory = CommandCompositorFactory::new(config.compositor.clone());
    if compositor_factory.is_configured() {
        info!("Using compositor program {:?}", config.compositor.program);
    } else {
        error!("No compositor program configured, print requests will fail");
    }
    let compositor_factory: Arc<dyn CompositorFactory> = Arc::new(compositor_factory);

    // Spawn cache pruning task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let prune_handle = image_cache.map(|cache| {
        let interval = Duration::from_secs(config.cache.prune_interval_secs.max(1));
        tokio::spawn(prune_cache(cache, interval, shutdown_rx))
    });

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        image_source,
        compositor_factory,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Stop the pruning task
    let _ = shutdown_tx.send(true);
    if let Some(handle) = prune_handle {
        let _ = handle.await;
        info!("Cache pruning stopped");
    }

    Ok(())
}

/// Evict expired cache entries every `interval` until shutdown.
async fn prune_cache(cache: ImageCache, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cache.prune().await;
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
