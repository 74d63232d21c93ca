//! Intel Feed Engine — Binary Entrypoint
//! Wires the pipeline (catalog, fetcher, classifier, cache), starts the
//! scheduled refresh loop and serves the consumer API over Axum.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use intel_feed_engine::{
    api::{create_router, AppState},
    cache::NewsCache,
    classify::{Classifier, ClassifierConfig},
    fetch::{default_routes, HttpTransport, ProxyFetcher},
    pipeline::{Aggregator, EngineConfig},
    scheduler::{spawn_refresh_task, RefreshCfg},
    sources::SourceCatalog,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intel_feed_engine=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let catalog = SourceCatalog::load_from_file("config/sources.toml");
    let classifier = Classifier::new(ClassifierConfig::load_from_file("config/classifier.toml"));
    let cache = Arc::new(NewsCache::with_snapshot(
        std::env::var("INTEL_CACHE_PATH").unwrap_or_else(|_| "intel_cache.json".to_string()),
    ));

    let cfg = EngineConfig::default();
    let fetcher = ProxyFetcher::new(
        Arc::new(HttpTransport::new()),
        default_routes(),
        cfg.fetch_timeout,
    );

    let engine = Arc::new(Aggregator::new(
        catalog,
        fetcher,
        classifier,
        Arc::clone(&cache),
        cfg,
    ));

    // Scheduled re-aggregation is owned here, not by the pipeline.
    let refresh_interval = std::env::var("INTEL_REFRESH_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| RefreshCfg::default().interval);
    spawn_refresh_task(Arc::clone(&engine), RefreshCfg {
        interval: refresh_interval,
    });

    let router = create_router(AppState { engine });

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "serving consumer API");
    axum::serve(listener, router).await?;
    Ok(())
}
