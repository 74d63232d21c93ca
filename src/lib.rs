// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod classify;
pub mod dedup;
pub mod feed;
pub mod fetch;
pub mod item;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cache::{CacheInfo, CacheRecord, ExportRecord, NewsCache, CACHE_VERSION};
pub use crate::classify::{Classifier, ClassifierConfig};
pub use crate::fetch::{default_routes, HttpTransport, ProxyFetcher, Route, Transport};
pub use crate::item::{IntelItem, SourceKind, UrgencyLevel};
pub use crate::pipeline::{Aggregator, EngineConfig, PipelineError};
pub use crate::sources::{Source, SourceCatalog};
