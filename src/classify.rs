// src/classify.rs
//! # Classifier
//!
//! Heuristic keyword labeler: urgency tier, topical context tags, free-text
//! tags and an event-velocity display hint, all derived from the lowercased
//! title + body. Rules live in data tables (loadable from TOML, with a
//! compiled-in seed), not in control flow. Deterministic and total; it is a
//! labeler, not a truth oracle.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::item::{ContextKind, ContextTag, UrgencyLevel};

/// Output of one classification. Pure function of the input text.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub urgency: UrgencyLevel,
    pub context: Vec<ContextTag>,
    pub tags: Vec<String>,
    pub event_velocity: u32,
}

/// One context-tag rule: category plus the keywords that trigger it.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextRule {
    pub kind: ContextKind,
    pub keywords: Vec<String>,
}

/// One free-text tag rule: any keyword match attaches the display tag.
#[derive(Debug, Clone, Deserialize)]
pub struct TagRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

/// The full rule set. Keyword lists are product tuning, kept as data.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Acute-incident terms; first tier of the cascade.
    pub flash: Vec<String>,
    /// Security/military/actor terms; second tier.
    pub priority: Vec<String>,
    /// Governance/diplomatic/economic terms; third tier.
    pub monitor: Vec<String>,
    #[serde(default)]
    pub context_rules: Vec<ContextRule>,
    #[serde(default)]
    pub tag_rules: Vec<TagRule>,
}

impl ClassifierConfig {
    /// Load rules from a TOML file.
    /// Falls back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    pub fn default_seed() -> Self {
        fn words(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        fn ctx(kind: ContextKind, keywords: &[&str]) -> ContextRule {
            ContextRule {
                kind,
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
            }
        }
        fn tag(tag: &str, keywords: &[&str]) -> TagRule {
            TagRule {
                tag: tag.to_string(),
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
            }
        }

        Self {
            flash: words(&[
                "breaking",
                "urgent",
                "explosion",
                "attack",
                "siren",
                "missile",
                "rocket",
                "strike",
                "killed",
                "casualties",
                "intercepted",
                "ballistic",
                "drone attack",
                "air raid",
            ]),
            priority: words(&[
                "idf",
                "military",
                "security",
                "operation",
                "iran",
                "hezbollah",
                "hamas",
                "pentagon",
                "deployment",
                "retaliation",
                "escalation",
                "nuclear",
                "uranium",
                "irgc",
                "revolutionary guard",
            ]),
            monitor: words(&[
                "minister",
                "government",
                "economy",
                "sanctions",
                "diplomatic",
                "united nations",
                "biden",
                "netanyahu",
                "khamenei",
            ]),
            context_rules: vec![
                ctx(ContextKind::Military, &["military", "idf", "army", "soldier", "operation"]),
                ctx(ContextKind::Economic, &["economic", "shekel", "market", "trade", "export"]),
                ctx(
                    ContextKind::Diplomatic,
                    &["diplomatic", "ambassador", "foreign", "summit"],
                ),
                ctx(ContextKind::Cyber, &["cyber", "hack", "malware", "breach"]),
                ctx(
                    ContextKind::Social,
                    &["protest", "demonstration", "evacuation", "civilians"],
                ),
            ],
            tag_rules: vec![
                // Locations
                tag("Gaza", &["gaza"]),
                tag("West Bank", &["west bank"]),
                tag("Lebanon", &["lebanon"]),
                tag("Iran", &["iran"]),
                tag("Syria", &["syria"]),
                tag("Yemen", &["yemen"]),
                tag("Iraq", &["iraq"]),
                tag("Jerusalem", &["jerusalem"]),
                tag("Tel Aviv", &["tel aviv"]),
                tag("Tehran", &["tehran"]),
                // Organizations
                tag("IDF", &["idf"]),
                tag("Hamas", &["hamas"]),
                tag("Hezbollah", &["hezbollah"]),
                tag("IRGC", &["irgc", "revolutionary guard"]),
                tag("Houthis", &["houthis"]),
                // Weapon systems
                tag("Missiles", &["missile"]),
                tag("Drones", &["drone"]),
                tag("Nuclear", &["nuclear"]),
                tag("F-35", &["f-35", "f35"]),
                tag("Iron Dome", &["iron dome"]),
                // Conflict terms
                tag("Escalation", &["escalation"]),
                tag("Retaliation", &["retaliation"]),
                tag("Casualties", &["casualties"]),
                // Key figures
                tag("Netanyahu", &["netanyahu"]),
                tag("Khamenei", &["khamenei"]),
                tag("Biden", &["biden"]),
            ],
        }
    }
}

/// Keyword classifier over the loaded rule tables.
#[derive(Debug, Clone)]
pub struct Classifier {
    cfg: ClassifierConfig,
}

impl Classifier {
    pub fn new(cfg: ClassifierConfig) -> Self {
        Self { cfg }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default_seed())
    }

    /// Classify one entry's text. Same text always yields the same result.
    pub fn classify(&self, title: &str, summary: &str) -> Classification {
        let text = format!("{title} {summary}").to_lowercase();
        let urgency = self.urgency_of(&text);
        Classification {
            urgency,
            context: self.context_tags(&text),
            tags: self.free_tags(&text),
            event_velocity: event_velocity(urgency),
        }
    }

    /// Priority cascade: first matching tier wins, in fixed order.
    fn urgency_of(&self, text: &str) -> UrgencyLevel {
        if contains_any(text, &self.cfg.flash) {
            UrgencyLevel::Flash
        } else if contains_any(text, &self.cfg.priority) {
            UrgencyLevel::Priority
        } else if contains_any(text, &self.cfg.monitor) {
            UrgencyLevel::Monitor
        } else {
            UrgencyLevel::Context
        }
    }

    /// Context categories are evaluated independently, not as a cascade.
    fn context_tags(&self, text: &str) -> Vec<ContextTag> {
        self.cfg
            .context_rules
            .iter()
            .filter(|r| contains_any(text, &r.keywords))
            .map(|r| ContextTag::for_kind(r.kind))
            .collect()
    }

    fn free_tags(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for rule in &self.cfg.tag_rules {
            if contains_any(text, &rule.keywords) && !out.contains(&rule.tag) {
                out.push(rule.tag.clone());
            }
        }
        out
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Display-only intensity hint; carries no scheduling meaning.
fn event_velocity(urgency: UrgencyLevel) -> u32 {
    match urgency {
        UrgencyLevel::Flash => 10,
        UrgencyLevel::Priority => 6,
        UrgencyLevel::Monitor | UrgencyLevel::Context => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clf() -> Classifier {
        Classifier::with_defaults()
    }

    #[test]
    fn flash_tier_wins_over_priority() {
        // Both a flash keyword (rocket) and a priority keyword (idf).
        let c = clf().classify("IDF confirms rocket fire", "");
        assert_eq!(c.urgency, UrgencyLevel::Flash);
    }

    #[test]
    fn cascade_falls_through_to_context() {
        let c = clf().classify("Museum reopens after renovation", "ticket sales resume");
        assert_eq!(c.urgency, UrgencyLevel::Context);
        assert_eq!(c.event_velocity, 3);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = clf().classify("Explosion reported near port", "casualties feared");
        let b = clf().classify("Explosion reported near port", "casualties feared");
        assert_eq!(a, b);
    }

    #[test]
    fn context_tags_are_independent() {
        let c = clf().classify(
            "Military operation shakes market",
            "cyber breach suspected",
        );
        let kinds: Vec<_> = c.context.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ContextKind::Military));
        assert!(kinds.contains(&ContextKind::Economic));
        assert!(kinds.contains(&ContextKind::Cyber));
    }

    #[test]
    fn tags_come_deduplicated() {
        // "irgc" and "revolutionary guard" both map to IRGC; tag appears once.
        let c = clf().classify("IRGC statement", "revolutionary guard comments on iran");
        let irgc = c.tags.iter().filter(|t| *t == "IRGC").count();
        assert_eq!(irgc, 1);
        assert!(c.tags.contains(&"Iran".to_string()));
    }

    #[test]
    fn velocity_scales_with_urgency() {
        assert_eq!(clf().classify("breaking now", "").event_velocity, 10);
        assert_eq!(clf().classify("military drill", "").event_velocity, 6);
        assert_eq!(clf().classify("minister speaks", "").event_velocity, 3);
    }

    #[test]
    fn toml_rules_load() {
        let doc = r#"
            flash = ["boom"]
            priority = ["army"]
            monitor = ["budget"]

            [[context_rules]]
            kind = "military"
            keywords = ["army"]

            [[tag_rules]]
            tag = "Army"
            keywords = ["army"]
        "#;
        let cfg: ClassifierConfig = toml::from_str(doc).unwrap();
        let c = Classifier::new(cfg).classify("Army boom", "");
        assert_eq!(c.urgency, UrgencyLevel::Flash);
        assert_eq!(c.tags, vec!["Army".to_string()]);
    }
}
