// src/feed.rs
//! # Feed Parser
//!
//! Turns raw feed bytes into [`RawEntry`] values. Two container dialects
//! are handled transparently: classic RSS (`<channel><item>`) and Atom
//! (`<feed><entry>`, used by the social aggregation feeds). Malformed XML
//! is rejected before any entry extraction; entries without a title are
//! dropped silently.

use anyhow::{anyhow, Result};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::item::SourceKind;

/// Transient parse output; lives only within one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    /// Body or summary text, possibly HTML, possibly empty.
    pub summary: String,
    pub link: String,
    /// Feed-native date string; parsed later by the normalizer.
    pub published: String,
}

/// Per-source entry caps. Social feeds are chattier, so they get a higher
/// cap; everything else uses the standard one. Product tuning, kept as a
/// configurable table.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedLimits {
    #[serde(default = "default_social_cap")]
    pub social: usize,
    #[serde(default = "default_standard_cap")]
    pub standard: usize,
}

fn default_social_cap() -> usize {
    30
}
fn default_standard_cap() -> usize {
    20
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            social: default_social_cap(),
            standard: default_standard_cap(),
        }
    }
}

impl FeedLimits {
    pub fn cap_for(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::Social => self.social,
            _ => self.standard,
        }
    }
}

// --- RSS dialect ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    published: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

// --- Atom dialect ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    content: Option<String>,
    summary: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Parse one feed body into entries, capped per the source kind.
///
/// RSS is attempted first, then Atom; a body that satisfies neither is a
/// parse error and the whole source is excluded from the pass.
pub fn parse_feed(xml: &str, kind: SourceKind, limits: &FeedLimits) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let cleaned = scrub_html_entities_for_xml(xml);

    let entries = match from_str::<Rss>(&cleaned) {
        Ok(rss) => rss.channel.items.into_iter().filter_map(rss_entry).collect(),
        Err(rss_err) => match from_str::<AtomFeed>(&cleaned) {
            Ok(feed) => feed.entries.into_iter().filter_map(atom_entry).collect(),
            Err(atom_err) => {
                return Err(anyhow!(
                    "feed matches neither dialect (rss: {rss_err}; atom: {atom_err})"
                ));
            }
        },
    };

    let mut entries: Vec<RawEntry> = entries;
    entries.truncate(limits.cap_for(kind));

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_entries_total").increment(entries.len() as u64);
    Ok(entries)
}

fn rss_entry(it: RssItem) -> Option<RawEntry> {
    let title = non_empty(it.title)?;
    // Field preference mirrors the Atom side: some RSS feeds carry
    // `published`/`content` instead of `pubDate`/`description`.
    Some(RawEntry {
        title,
        summary: it.description.or(it.content).unwrap_or_default(),
        link: it.link.unwrap_or_default(),
        published: it.pub_date.or(it.published).unwrap_or_default(),
    })
}

fn atom_entry(it: AtomEntry) -> Option<RawEntry> {
    let title = non_empty(it.title)?;
    // Field preference: inline content first, then summary;
    // published first, then updated.
    let summary = it.content.or(it.summary).unwrap_or_default();
    let published = it.published.or(it.updated).unwrap_or_default();
    let link = it
        .links
        .into_iter()
        .find_map(|l| l.href)
        .unwrap_or_default();
    Some(RawEntry {
        title,
        summary,
        link,
        published,
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    let s = s?;
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Feeds routinely smuggle HTML entities into what claims to be XML;
/// replace the common offenders before handing the body to the parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
