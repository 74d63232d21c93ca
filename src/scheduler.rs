// src/scheduler.rs
//! Fixed-interval background refresh. The pipeline never schedules itself;
//! whoever owns the engine spawns this (the binary does, tests may not).

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::pipeline::Aggregator;

#[derive(Clone, Copy, Debug)]
pub struct RefreshCfg {
    pub interval: Duration,
}

impl Default for RefreshCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Spawn the refresh loop. Each tick forces a full aggregation pass; a
/// failed pass is logged and the loop keeps ticking.
pub fn spawn_refresh_task(engine: Arc<Aggregator>, cfg: RefreshCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match engine.fetch_news(true).await {
                Ok(items) => {
                    tracing::info!(target: "refresh", items = items.len(), "scheduled refresh tick");
                }
                Err(e) => {
                    tracing::warn!(target: "refresh", error = %e, "scheduled refresh yielded nothing");
                }
            }
        }
    })
}
