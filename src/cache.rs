// src/cache.rs
//! # News Cache
//!
//! Holds the last successfully aggregated item set with its capture time.
//! One writer (the aggregator after a full pass), concurrent readers; a
//! read always observes a complete record, never a partial one. Optionally
//! snapshots to a JSON file so a restart starts warm — the file is
//! best-effort, the in-memory record is authoritative.
//!
//! Staleness is advisory: a stale cache is still served immediately while
//! the caller refreshes in the background.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

use crate::item::IntelItem;

/// Version tag of the persistence format. Imports must match exactly.
pub const CACHE_VERSION: &str = "v1";

/// Default advisory freshness horizon.
pub const DEFAULT_MAX_AGE_HOURS: f64 = 1.0;

/// The persisted shape: `{version, items[], capturedAtEpochMillis}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: String,
    pub items: Vec<IntelItem>,
    #[serde(rename = "capturedAtEpochMillis")]
    pub captured_at_ms: i64,
}

/// Export payload for the external data-management boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub version: String,
    #[serde(rename = "exportDate")]
    pub export_date: DateTime<Utc>,
    #[serde(rename = "itemCount")]
    pub item_count: usize,
    pub items: Vec<IntelItem>,
}

/// Advisory summary for consumers.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    #[serde(rename = "itemCount")]
    pub item_count: usize,
    #[serde(rename = "ageHours")]
    pub age_hours: f64,
    #[serde(rename = "isStale")]
    pub is_stale: bool,
}

/// Rejected import payloads; the existing record is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: String, got: String },
    #[error("payload is not a valid cache record: {0}")]
    Malformed(String),
}

pub struct NewsCache {
    inner: RwLock<Option<CacheRecord>>,
    snapshot_path: Option<PathBuf>,
}

impl NewsCache {
    /// In-memory only.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
            snapshot_path: None,
        }
    }

    /// Backed by a JSON snapshot file. An existing, valid snapshot with a
    /// matching version tag is loaded; anything else is ignored.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let loaded = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str::<CacheRecord>(&s).ok())
            .filter(|r| r.version == CACHE_VERSION);
        if let Some(r) = &loaded {
            tracing::info!(items = r.items.len(), path = %path.display(), "cache snapshot loaded");
        }
        Self {
            inner: RwLock::new(loaded),
            snapshot_path: Some(path),
        }
    }

    /// Last good item set, or empty when nothing was ever cached.
    pub fn get(&self) -> Vec<IntelItem> {
        self.inner
            .read()
            .expect("cache lock poisoned")
            .as_ref()
            .map(|r| r.items.clone())
            .unwrap_or_default()
    }

    pub fn record(&self) -> Option<CacheRecord> {
        self.inner.read().expect("cache lock poisoned").clone()
    }

    /// Replace the record wholesale with a fresh capture timestamp.
    pub fn put(&self, items: Vec<IntelItem>) {
        let record = CacheRecord {
            version: CACHE_VERSION.to_string(),
            items,
            captured_at_ms: Utc::now().timestamp_millis(),
        };
        self.install(Some(record));
    }

    /// Install a record as-is, preserving its capture time. Used for
    /// snapshot restore and by tests that need an aged cache.
    pub fn restore(&self, record: CacheRecord) {
        self.install(Some(record));
    }

    pub fn clear(&self) {
        self.install(None);
    }

    /// Import an external payload. The version tag must match exactly and
    /// `items` must be a sequence of well-formed items; otherwise the
    /// import is rejected synchronously and the cache is untouched.
    pub fn import(&self, payload: serde_json::Value) -> Result<usize, ImportError> {
        let version = payload
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ImportError::Malformed("missing version tag".into()))?;
        if version != CACHE_VERSION {
            return Err(ImportError::VersionMismatch {
                expected: CACHE_VERSION.to_string(),
                got: version.to_string(),
            });
        }
        let items = payload
            .get("items")
            .filter(|v| v.is_array())
            .cloned()
            .ok_or_else(|| ImportError::Malformed("items is not a sequence".into()))?;
        let items: Vec<IntelItem> = serde_json::from_value(items)
            .map_err(|e| ImportError::Malformed(e.to_string()))?;

        let count = items.len();
        self.put(items);
        Ok(count)
    }

    /// Serialize the current record for export; ISO-8601 timestamps come
    /// from the items' serde representation.
    pub fn export(&self) -> ExportRecord {
        let items = self.get();
        ExportRecord {
            version: CACHE_VERSION.to_string(),
            export_date: Utc::now(),
            item_count: items.len(),
            items,
        }
    }

    pub fn age_hours(&self) -> Option<f64> {
        let guard = self.inner.read().expect("cache lock poisoned");
        guard.as_ref().map(|r| {
            let age_ms = Utc::now().timestamp_millis().saturating_sub(r.captured_at_ms);
            age_ms as f64 / 3_600_000.0
        })
    }

    /// Advisory only; an empty cache counts as stale.
    pub fn is_stale(&self, max_age_hours: f64) -> bool {
        match self.age_hours() {
            Some(age) => age > max_age_hours,
            None => true,
        }
    }

    /// Summary against the caller's freshness horizon, so the report
    /// agrees with whatever serving policy is in effect.
    pub fn info(&self, max_age_hours: f64) -> CacheInfo {
        let age = self.age_hours();
        CacheInfo {
            item_count: self.get().len(),
            age_hours: age.unwrap_or(0.0),
            is_stale: self.is_stale(max_age_hours),
        }
    }

    fn install(&self, record: Option<CacheRecord>) {
        {
            let mut guard = self.inner.write().expect("cache lock poisoned");
            *guard = record.clone();
        }
        self.persist(record.as_ref());
    }

    /// Best-effort snapshot write; failures are logged, never propagated.
    fn persist(&self, record: Option<&CacheRecord>) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let result = match record {
            Some(r) => serde_json::to_string(r)
                .map_err(anyhow::Error::from)
                .and_then(|s| std::fs::write(path, s).map_err(anyhow::Error::from)),
            None => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(anyhow::Error::from(e)),
            },
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = ?e, "cache snapshot write failed");
        }
    }
}

impl Default for NewsCache {
    fn default() -> Self {
        Self::new()
    }
}
