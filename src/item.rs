// src/item.rs
//! Canonical data model for the pipeline: the normalized intelligence item
//! and the fixed classification vocabularies attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Institutional type of a feed source. Fixed at catalog time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Government,
    Military,
    Intelligence,
    #[serde(rename = "media_t1")]
    MediaT1,
    #[serde(rename = "media_t2")]
    MediaT2,
    Social,
}

impl SourceKind {
    /// Base trust rating for the kind. Single source of truth for
    /// credibility scoring; see [`Credibility::for_kind`].
    pub fn trust_rating(self) -> f32 {
        match self {
            SourceKind::Government => 0.95,
            SourceKind::Military => 0.93,
            SourceKind::Intelligence => 0.90,
            SourceKind::MediaT1 => 0.85,
            SourceKind::MediaT2 => 0.75,
            SourceKind::Social => 0.60,
        }
    }
}

/// Primary triage dimension, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Flash,
    Priority,
    Monitor,
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Pending,
    Unverified,
}

/// Secondary topical category. Each kind carries a fixed glyph, relevance
/// weight and severity; see [`ContextTag::for_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Military,
    Economic,
    Diplomatic,
    Cyber,
    Social,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTag {
    #[serde(rename = "type")]
    pub kind: ContextKind,
    pub icon: String,
    pub weight: f32,
    pub severity: f32,
}

impl ContextTag {
    /// Fixed glyph/weight/severity per category. Weights and severities are
    /// not renormalized when several tags attach to one item.
    pub fn for_kind(kind: ContextKind) -> Self {
        let (icon, weight, severity) = match kind {
            ContextKind::Military => ("\u{1F6E1}\u{FE0F}", 0.35, 0.8),
            ContextKind::Economic => ("\u{1F4CA}", 0.25, 0.5),
            ContextKind::Diplomatic => ("\u{1F91D}", 0.20, 0.6),
            ContextKind::Cyber => ("\u{1F510}", 0.15, 0.7),
            ContextKind::Social => ("\u{1F4AC}", 0.10, 0.4),
        };
        Self {
            kind,
            icon: icon.to_string(),
            weight,
            severity,
        }
    }
}

/// Per-item credibility, derived deterministically from the source kind at
/// normalization time and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credibility {
    pub source: SourceKind,
    pub rating: f32,
    #[serde(rename = "historicalAccuracy")]
    pub historical_accuracy: f32,
    #[serde(rename = "biasIndicator")]
    pub bias_indicator: f32,
}

impl Credibility {
    pub fn for_kind(kind: SourceKind) -> Self {
        let rating = kind.trust_rating();
        Self {
            source: kind,
            rating,
            historical_accuracy: rating * 0.95,
            bias_indicator: 0.3,
        }
    }
}

/// Attribution back to the originating feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

/// The canonical unit produced by one aggregation pass. Created once by the
/// normalizer and never mutated; a corrected item is a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "urgencyLevel")]
    pub urgency: UrgencyLevel,
    pub context: Vec<ContextTag>,
    pub credibility: Credibility,
    #[serde(rename = "verificationStatus")]
    pub verification: VerificationStatus,
    #[serde(rename = "relatedEvents", default)]
    pub related_events: Vec<String>,
    /// Hours until relevance expires; present only for flash items.
    #[serde(rename = "decisionWindow", skip_serializing_if = "Option::is_none")]
    pub decision_window: Option<u32>,
    #[serde(rename = "eventVelocity")]
    pub event_velocity: u32,
    pub tags: Vec<String>,
    pub source: SourceRef,
}
