// src/pipeline.rs
//! # Aggregator
//!
//! Drives the whole pipeline: fan-out fetch across every registered source,
//! parse + classify + normalize each, one dedup pass over the union, sort
//! by recency, cache update. Per-source failures are isolated — a broken
//! source is simply absent from the pass. The worst outcome of a pass is
//! serving stale cached data with an advisory.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::cache::{NewsCache, DEFAULT_MAX_AGE_HOURS};
use crate::classify::Classifier;
use crate::dedup::dedup_items;
use crate::feed::{parse_feed, FeedLimits};
use crate::fetch::ProxyFetcher;
use crate::item::IntelItem;
use crate::normalize::normalize;
use crate::sources::{Source, SourceCatalog};

/// One-time metrics registration (so series show up even before traffic).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries parsed from feeds.");
        describe_counter!("ingest_items_kept_total", "Items kept after dedup.");
        describe_counter!("ingest_dedup_total", "Items removed by deduplication.");
        describe_counter!("ingest_source_errors_total", "Sources excluded from a pass.");
        describe_counter!("fetch_route_errors_total", "Individual route failures.");
        describe_counter!("fetch_exhausted_total", "Sources with every route failed.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("ingest_last_pass_ts", "Unix ts of the last aggregation pass.");
    });
}

/// Recoverable pipeline conditions surfaced to the consumer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Zero sources yielded items and the cache is empty too.
    #[error("no sources available")]
    NoSourcesAvailable,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-route attempt timeout inside the fetcher.
    pub fetch_timeout: Duration,
    pub limits: FeedLimits,
    /// Advisory freshness horizon for serving straight from cache.
    pub max_age_hours: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(8),
            limits: FeedLimits::default(),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

/// Explicitly constructed pipeline instance; no ambient globals. Owned by
/// whatever schedules refreshes (the binary, or a test).
pub struct Aggregator {
    catalog: SourceCatalog,
    fetcher: Arc<ProxyFetcher>,
    classifier: Arc<Classifier>,
    cache: Arc<NewsCache>,
    cfg: EngineConfig,
}

impl Aggregator {
    pub fn new(
        catalog: SourceCatalog,
        fetcher: ProxyFetcher,
        classifier: Classifier,
        cache: Arc<NewsCache>,
        cfg: EngineConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            catalog,
            fetcher: Arc::new(fetcher),
            classifier: Arc::new(classifier),
            cache,
            cfg,
        }
    }

    pub fn cache(&self) -> &Arc<NewsCache> {
        &self.cache
    }

    /// Cache summary judged against this engine's freshness horizon.
    pub fn cache_info(&self) -> crate::cache::CacheInfo {
        self.cache.info(self.cfg.max_age_hours)
    }

    /// Consumer entrypoint. Serves the cache while it is fresh unless a
    /// refresh is forced; otherwise runs a pass. A failed pass falls back
    /// to whatever the cache holds — stale data beats no data.
    pub async fn fetch_news(&self, force_refresh: bool) -> Result<Vec<IntelItem>, PipelineError> {
        if !force_refresh && !self.cache.is_stale(self.cfg.max_age_hours) {
            let cached = self.cache.get();
            if !cached.is_empty() {
                tracing::debug!(items = cached.len(), "serving fresh cache");
                return Ok(cached);
            }
        }

        match self.aggregate_once().await {
            Ok(items) => Ok(items),
            Err(PipelineError::NoSourcesAvailable) => {
                let cached = self.cache.get();
                if cached.is_empty() {
                    Err(PipelineError::NoSourcesAvailable)
                } else {
                    tracing::warn!(items = cached.len(), "pass yielded nothing, serving cache");
                    Ok(cached)
                }
            }
        }
    }

    /// One full aggregation pass. The pass completes when every per-source
    /// task has resolved; there is no global deadline beyond the per-route
    /// timeouts and no cancellation once started.
    pub async fn aggregate_once(&self) -> Result<Vec<IntelItem>, PipelineError> {
        let mut tasks: JoinSet<Vec<IntelItem>> = JoinSet::new();
        for source in self.catalog.sources.iter().cloned() {
            let fetcher = Arc::clone(&self.fetcher);
            let classifier = Arc::clone(&self.classifier);
            let limits = self.cfg.limits;
            tasks.spawn(async move { ingest_source(source, fetcher, classifier, limits).await });
        }

        let mut union: Vec<IntelItem> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(items) => union.extend(items),
                Err(e) => {
                    // A panicking source task is still just one source lost.
                    tracing::warn!(error = ?e, "source task aborted");
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }

        let before = union.len();
        let mut items = dedup_items(union);
        let removed = before - items.len();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        counter!("ingest_items_kept_total").increment(items.len() as u64);
        counter!("ingest_dedup_total").increment(removed as u64);
        gauge!("ingest_last_pass_ts").set(chrono::Utc::now().timestamp() as f64);

        if items.is_empty() {
            // Never overwrite a good cache record with an empty pass.
            tracing::warn!("aggregation pass yielded zero items");
            return Err(PipelineError::NoSourcesAvailable);
        }

        tracing::info!(items = items.len(), deduped = removed, "aggregation pass complete");
        self.cache.put(items.clone());
        Ok(items)
    }
}

/// Fetch, parse and normalize one source. Every failure path returns an
/// empty vec after logging — nothing here may abort sibling sources.
async fn ingest_source(
    source: Source,
    fetcher: Arc<ProxyFetcher>,
    classifier: Arc<Classifier>,
    limits: FeedLimits,
) -> Vec<IntelItem> {
    let body = match fetcher.fetch(&source.url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(source = %source.name, error = %e, "source fetch exhausted");
            counter!("ingest_source_errors_total").increment(1);
            return Vec::new();
        }
    };

    let entries = match parse_feed(&body, source.kind, &limits) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(source = %source.name, error = %e, "feed body unparseable");
            counter!("ingest_source_errors_total").increment(1);
            return Vec::new();
        }
    };

    entries
        .iter()
        .map(|entry| {
            let classified = classifier.classify(&entry.title, &entry.summary);
            normalize(entry, &source, classified)
        })
        .collect()
}
