// src/sources.rs
//! # Source Registry
//!
//! Static catalog of feed endpoints, each tagged with an institutional
//! [`SourceKind`]. Loaded from TOML config with a compiled-in seed as
//! fallback, so the catalog is data rather than code.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::item::SourceKind;

/// One immutable catalog entry. Created at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceCatalog {
    pub sources: Vec<Source>,
}

impl SourceCatalog {
    /// Load the catalog from a TOML file.
    /// Falls back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Built-in catalog covering regional media, international coverage,
    /// social aggregation feeds and defense outlets.
    pub fn default_seed() -> Self {
        fn src(url: &str, name: &str, kind: SourceKind) -> Source {
            Source {
                url: url.to_string(),
                name: name.to_string(),
                kind,
            }
        }
        use SourceKind::*;
        Self {
            sources: vec![
                // Regional media
                src("https://www.timesofisrael.com/feed/", "Times of Israel", MediaT1),
                src(
                    "https://rss.jpost.com/rss/rssfeedsfrontpage.aspx",
                    "Jerusalem Post",
                    MediaT1,
                ),
                src("https://www.israelnationalnews.com/rss", "Arutz Sheva", MediaT2),
                src(
                    "https://www.ynetnews.com/Integration/StoryRss2.xml",
                    "Ynet News",
                    MediaT1,
                ),
                // International coverage
                src(
                    "https://feeds.bbci.co.uk/news/world/middle_east/rss.xml",
                    "BBC Middle East",
                    MediaT1,
                ),
                src("https://www.aljazeera.com/xml/rss/all.xml", "Al Jazeera", MediaT2),
                src("https://rss.cnn.com/rss/cnn_world.rss", "CNN World", MediaT2),
                // Social aggregation (Atom dialect)
                src("https://www.reddit.com/r/worldnews/.rss?limit=50", "r/worldnews", Social),
                src("https://www.reddit.com/r/geopolitics/.rss?limit=30", "r/geopolitics", Social),
                src(
                    "https://www.reddit.com/r/CredibleDefense/.rss?limit=30",
                    "r/CredibleDefense",
                    Social,
                ),
                src(
                    "https://www.reddit.com/r/LevantineWar/.rss?limit=30",
                    "r/LevantineWar",
                    Social,
                ),
                // Defense outlets
                src(
                    "https://www.defensenews.com/arc/outboundfeeds/rss/?outputType=xml",
                    "Defense News",
                    Military,
                ),
                src(
                    "https://www.timesofisrael.com/feed/category/defense/",
                    "Times of Israel Defense",
                    Military,
                ),
            ],
        }
    }
}
