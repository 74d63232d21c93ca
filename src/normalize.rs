// src/normalize.rs
//! # Item Normalizer
//!
//! Combines a raw feed entry, its source metadata and the classifier output
//! into one canonical [`IntelItem`]: markup stripped, content bounded,
//! timestamps parsed with a now() fallback, credibility assigned from the
//! source kind, and a stable id derived from content rather than fetch time.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::classify::Classification;
use crate::dedup::fingerprint;
use crate::feed::RawEntry;
use crate::item::{Credibility, IntelItem, SourceRef, VerificationStatus};
use crate::sources::Source;

/// Max content length in characters; longer bodies are cut to 297 + `...`.
pub const MAX_CONTENT_CHARS: usize = 300;

/// Decision window granted to flash items, in hours.
const FLASH_DECISION_WINDOW_HOURS: u32 = 1;

/// Strip HTML (entities first, then tags) and collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Bound the cleaned body, marking the cut with an ellipsis.
pub fn truncate_content(s: &str) -> String {
    if s.chars().count() > MAX_CONTENT_CHARS {
        let head: String = s.chars().take(MAX_CONTENT_CHARS - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Parse a feed-native date: RFC 2822 (RSS pubDate) first, RFC 3339 (Atom)
/// second. `None` means the caller should fall back to now — a bad date
/// never drops the entry.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let unix = OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()?
        .unix_timestamp();
    Utc.timestamp_opt(unix, 0).single()
}

/// Stable short id from source + title fingerprint + link. The id is not
/// the dedup key, but it must not change between passes for the same story.
fn item_id(source_name: &str, entry: &RawEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(fingerprint(&entry.title).as_bytes());
    hasher.update(entry.link.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(22);
    out.push_str("intel-");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Build the canonical item. Never fails: timestamp parsing falls back to
/// `now`, and everything else is total.
pub fn normalize(entry: &RawEntry, source: &Source, classified: Classification) -> IntelItem {
    let content = truncate_content(&clean_text(&entry.summary));
    let timestamp = parse_feed_date(&entry.published).unwrap_or_else(Utc::now);

    let decision_window = match classified.urgency {
        crate::item::UrgencyLevel::Flash => Some(FLASH_DECISION_WINDOW_HOURS),
        _ => None,
    };

    IntelItem {
        id: item_id(&source.name, entry),
        title: entry.title.clone(),
        content,
        timestamp,
        urgency: classified.urgency,
        context: classified.context,
        credibility: Credibility::for_kind(source.kind),
        verification: VerificationStatus::Pending,
        related_events: Vec::new(),
        decision_window,
        event_velocity: classified.event_velocity,
        tags: classified.tags,
        source: SourceRef {
            name: source.name.clone(),
            url: entry.link.clone(),
            kind: source.kind,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::item::{SourceKind, UrgencyLevel};

    fn source() -> Source {
        Source {
            url: "https://wire.test/feed".into(),
            name: "Test Wire".into(),
            kind: SourceKind::MediaT1,
        }
    }

    fn entry(title: &str, summary: &str, published: &str) -> RawEntry {
        RawEntry {
            title: title.into(),
            summary: summary.into(),
            link: "https://wire.test/story".into(),
            published: published.into(),
        }
    }

    #[test]
    fn strips_markup_and_collapses_whitespace() {
        let s = clean_text("<p>Hello&nbsp;<b>world</b></p>\n\n  twice");
        assert_eq!(s, "Hello world twice");
    }

    #[test]
    fn long_content_is_cut_with_ellipsis() {
        let long = "x".repeat(500);
        let out = truncate_content(&long);
        assert_eq!(out.chars().count(), MAX_CONTENT_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_content("short"), "short");
    }

    #[test]
    fn both_wire_date_formats_parse() {
        assert!(parse_feed_date("Sun, 15 Jun 2025 10:00:00 GMT").is_some());
        assert!(parse_feed_date("2025-06-15T10:00:00Z").is_some());
        assert!(parse_feed_date("not a date").is_none());
        assert!(parse_feed_date("").is_none());
    }

    #[test]
    fn bad_date_falls_back_to_now_instead_of_dropping() {
        let clf = Classifier::with_defaults();
        let e = entry("Quiet day", "nothing much", "garbage");
        let before = Utc::now();
        let item = normalize(&e, &source(), clf.classify(&e.title, &e.summary));
        assert!(item.timestamp >= before);
    }

    #[test]
    fn flash_items_get_a_decision_window() {
        let clf = Classifier::with_defaults();
        let e = entry("Breaking: rocket fired", "", "2025-06-15T10:00:00Z");
        let item = normalize(&e, &source(), clf.classify(&e.title, &e.summary));
        assert_eq!(item.urgency, UrgencyLevel::Flash);
        assert_eq!(item.decision_window, Some(1));

        let e2 = entry("Minister speaks", "", "2025-06-15T10:00:00Z");
        let item2 = normalize(&e2, &source(), clf.classify(&e2.title, &e2.summary));
        assert_eq!(item2.decision_window, None);
    }

    #[test]
    fn id_is_stable_across_passes() {
        let clf = Classifier::with_defaults();
        let e = entry("Same story", "body", "2025-06-15T10:00:00Z");
        let a = normalize(&e, &source(), clf.classify(&e.title, &e.summary));
        let b = normalize(&e, &source(), clf.classify(&e.title, &e.summary));
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("intel-"));
    }

    #[test]
    fn fresh_items_default_to_pending() {
        let clf = Classifier::with_defaults();
        let e = entry("Anything", "", "2025-06-15T10:00:00Z");
        let item = normalize(&e, &source(), clf.classify(&e.title, &e.summary));
        assert_eq!(item.verification, VerificationStatus::Pending);
    }
}
