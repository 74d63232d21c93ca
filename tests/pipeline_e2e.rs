// tests/pipeline_e2e.rs
// Full-pipeline scenarios over canned transports; no network involved.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use intel_feed_engine::cache::NewsCache;
use intel_feed_engine::classify::Classifier;
use intel_feed_engine::fetch::{ProxyFetcher, Route, Transport};
use intel_feed_engine::item::{SourceKind, UrgencyLevel};
use intel_feed_engine::pipeline::{Aggregator, EngineConfig, PipelineError};
use intel_feed_engine::sources::{Source, SourceCatalog};

/// Serves canned bodies by upstream URL; unknown URLs hang past the
/// fetcher timeout to simulate a dead route.
struct CannedTransport {
    bodies: HashMap<String, String>,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn get(&self, url: &str) -> Result<String> {
        match self.bodies.get(url) {
            Some(body) => Ok(body.clone()),
            None => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(anyhow!("unreachable"))
            }
        }
    }
}

fn rss_feed(title: &str, pub_date: &str) -> String {
    format!(
        "<rss><channel><item>\
           <title>{title}</title>\
           <link>https://wire.test/story</link>\
           <pubDate>{pub_date}</pubDate>\
           <description>Rocket fired at border town, sirens reported.</description>\
         </item></channel></rss>"
    )
}

fn atom_feed(title: &str, published: &str) -> String {
    format!(
        "<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry>\
           <title>{title}</title>\
           <link href=\"https://board.test/thread\"/>\
           <published>{published}</published>\
           <content>Rocket fired at border town, thread with footage.</content>\
         </entry></feed>"
    )
}

fn source(url: &str, name: &str, kind: SourceKind) -> Source {
    Source {
        url: url.into(),
        name: name.into(),
        kind,
    }
}

fn engine(catalog: SourceCatalog, bodies: HashMap<String, String>) -> Aggregator {
    let cfg = EngineConfig {
        fetch_timeout: Duration::from_millis(100),
        ..EngineConfig::default()
    };
    // Three routes so exhaustion means three failed attempts per source.
    let routes = vec![
        Route::Direct,
        Route::Envelope {
            prefix: "https://wrap.test/get?url=".into(),
        },
        Route::Prefixed {
            prefix: "https://echo.test/?quest=".into(),
        },
    ];
    let fetcher = ProxyFetcher::new(
        Arc::new(CannedTransport { bodies }),
        routes,
        cfg.fetch_timeout,
    );
    Aggregator::new(
        catalog,
        fetcher,
        Classifier::with_defaults(),
        Arc::new(NewsCache::new()),
        cfg,
    )
}

#[tokio::test]
async fn cross_source_duplicate_collapses_to_latest_and_flash() {
    let catalog = SourceCatalog {
        sources: vec![
            source("https://a.test/feed", "Wire A", SourceKind::MediaT1),
            source("https://b.test/feed", "Board B", SourceKind::Social),
        ],
    };
    let mut bodies = HashMap::new();
    bodies.insert(
        "https://a.test/feed".to_string(),
        rss_feed(
            "Breaking: rocket fired at border town",
            "Sun, 15 Jun 2025 10:00:00 GMT",
        ),
    );
    bodies.insert(
        "https://b.test/feed".to_string(),
        atom_feed(
            "BREAKING: Rocket Fired At Border Town",
            "2025-06-15T11:00:00Z",
        ),
    );

    let items = engine(catalog, bodies).fetch_news(true).await.unwrap();

    assert_eq!(items.len(), 1, "near-duplicates must collapse to one item");
    let item = &items[0];
    assert_eq!(item.urgency, UrgencyLevel::Flash);
    assert_eq!(item.decision_window, Some(1));
    assert_eq!(item.event_velocity, 10);
    // The later (social) version wins the dedup.
    assert_eq!(item.source.name, "Board B");
    assert_eq!(item.timestamp.to_rfc3339(), "2025-06-15T11:00:00+00:00");
}

#[tokio::test]
async fn dead_source_contributes_nothing_without_aborting_the_pass() {
    let catalog = SourceCatalog {
        sources: vec![
            source("https://a.test/feed", "Wire A", SourceKind::MediaT1),
            source("https://dead.test/feed", "Dead Feed", SourceKind::MediaT2),
        ],
    };
    let mut bodies = HashMap::new();
    bodies.insert(
        "https://a.test/feed".to_string(),
        rss_feed("Minister presents budget", "Sun, 15 Jun 2025 09:00:00 GMT"),
    );
    // dead.test is absent: every route times out.

    let items = engine(catalog, bodies).fetch_news(true).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source.name, "Wire A");
}

#[tokio::test]
async fn malformed_feed_excludes_only_that_source() {
    let catalog = SourceCatalog {
        sources: vec![
            source("https://a.test/feed", "Wire A", SourceKind::MediaT1),
            source("https://bad.test/feed", "Broken Wire", SourceKind::MediaT2),
        ],
    };
    let mut bodies = HashMap::new();
    bodies.insert(
        "https://a.test/feed".to_string(),
        rss_feed("Port reopens after storm", "Sun, 15 Jun 2025 08:00:00 GMT"),
    );
    bodies.insert(
        "https://bad.test/feed".to_string(),
        "<rss><channel><item><title>trunc".to_string(),
    );

    let items = engine(catalog, bodies).fetch_news(true).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source.name, "Wire A");
}

#[tokio::test]
async fn empty_pass_preserves_prior_cache_record() {
    let catalog = SourceCatalog {
        sources: vec![source(
            "https://dead.test/feed",
            "Dead Feed",
            SourceKind::MediaT1,
        )],
    };
    let engine = engine(catalog, HashMap::new());

    // Seed the cache through a prior good state.
    let record = intel_feed_engine::cache::CacheRecord {
        version: intel_feed_engine::cache::CACHE_VERSION.to_string(),
        items: Vec::new(),
        captured_at_ms: 0,
    };
    engine.cache().restore(record.clone());

    // Pass fails entirely; direct aggregate surfaces the condition...
    let err = engine.aggregate_once().await.unwrap_err();
    assert!(matches!(err, PipelineError::NoSourcesAvailable));
    // ...and the prior record is untouched.
    assert_eq!(engine.cache().record(), Some(record));
}

#[tokio::test]
async fn totally_empty_world_surfaces_no_sources() {
    let catalog = SourceCatalog {
        sources: vec![source(
            "https://dead.test/feed",
            "Dead Feed",
            SourceKind::MediaT1,
        )],
    };
    let engine = engine(catalog, HashMap::new());
    let err = engine.fetch_news(true).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoSourcesAvailable));
}

#[tokio::test]
async fn cache_info_reflects_the_engine_horizon() {
    let catalog = SourceCatalog {
        sources: vec![source("https://a.test/feed", "Wire A", SourceKind::MediaT1)],
    };
    let cfg = EngineConfig {
        fetch_timeout: Duration::from_millis(100),
        max_age_hours: 2.0,
        ..EngineConfig::default()
    };
    let fetcher = ProxyFetcher::new(
        Arc::new(CannedTransport {
            bodies: HashMap::new(),
        }),
        vec![Route::Direct],
        cfg.fetch_timeout,
    );
    let engine = Aggregator::new(
        catalog,
        fetcher,
        Classifier::with_defaults(),
        Arc::new(NewsCache::new()),
        cfg,
    );

    // A 90-minute-old record is fresh under the configured 2h horizon,
    // even though the default horizon would call it stale.
    engine
        .cache()
        .restore(intel_feed_engine::cache::CacheRecord {
            version: intel_feed_engine::cache::CACHE_VERSION.to_string(),
            items: Vec::new(),
            captured_at_ms: chrono::Utc::now().timestamp_millis() - 90 * 60_000,
        });
    assert!(!engine.cache_info().is_stale);
    assert!(engine.cache().is_stale(1.0));
}

#[tokio::test]
async fn fresh_cache_is_served_without_a_pass() {
    // No sources reachable, but the cache was captured moments ago with a
    // real item, so no pass should be needed.
    let catalog = SourceCatalog {
        sources: vec![source("https://a.test/feed", "Wire A", SourceKind::MediaT1)],
    };
    let mut bodies = HashMap::new();
    bodies.insert(
        "https://a.test/feed".to_string(),
        rss_feed("Quiet afternoon", "Sun, 15 Jun 2025 08:00:00 GMT"),
    );
    let engine = engine(catalog, bodies);

    let first = engine.fetch_news(true).await.unwrap();
    let second = engine.fetch_news(false).await.unwrap();
    assert_eq!(first, second);
}
