// src/dedup.rs
//! # Deduplicator
//!
//! Cross-source collapse of near-duplicate items. Wire-service syndication
//! republishes the same story under different links, so the key is a
//! normalized title fingerprint, never the id or link. Must run once over
//! the combined output of all sources, not per source.

use std::collections::HashMap;

use crate::item::IntelItem;

/// Fingerprint prefix length. Long enough to separate stories, short
/// enough to absorb trailing edits.
const FINGERPRINT_LEN: usize = 50;

/// Lowercased title with non-alphanumerics stripped, truncated to a fixed
/// prefix.
pub fn fingerprint(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(FINGERPRINT_LEN)
        .collect()
}

/// Collapse items sharing a fingerprint, keeping the latest timestamp;
/// ties keep the first encountered. Input order is otherwise preserved.
pub fn dedup_items(items: Vec<IntelItem>) -> Vec<IntelItem> {
    let mut best: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut kept: Vec<Option<IntelItem>> = Vec::with_capacity(items.len());

    for item in items {
        let key = fingerprint(&item.title);
        match best.get(&key) {
            Some(&slot) => {
                let current = kept[slot]
                    .as_ref()
                    .expect("slot holds the current winner");
                if item.timestamp > current.timestamp {
                    kept[slot] = Some(item);
                }
            }
            None => {
                best.insert(key, kept.len());
                kept.push(Some(item));
            }
        }
    }

    kept.into_iter().flatten().collect()
}
