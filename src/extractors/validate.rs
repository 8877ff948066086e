// src/extractors/validate.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use super::locate::element_text;

// --- Constants ---
// The platform's own brand string; a "name" containing it is page chrome.
const BRAND_TOKEN: &str = "LinkedIn";

// Counter keywords in the target language set.
const FOLLOWER_TERMS: &[&str] = &["abonnés", "followers"];
const CONNECTION_TERMS: &[&str] = &["relations", "connections"];

// UI-chrome phrases that disqualify a skill name.
const SKILL_DENYLIST: &[&str] = &[
    "chez",
    "Une personne",
    "Voir",
    "Suivre",
    "étudié",
    "abonnés",
    "relations",
];

static BARE_NUMERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("Failed to compile BARE_NUMERAL_RE"));

/// Per-field validation rules: pure predicates over surface text, with an
/// optional structural context for the counter fields. A rule rejects matches
/// that are structurally found but semantically wrong (boilerplate,
/// decorative text, out-of-range length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Name,
    Role,
    FollowerCount,
    ConnectionCount,
    SkillName,
}

impl FieldRule {
    /// Judges whether `text` is a plausible value for this field.
    pub fn validate(&self, text: &str) -> bool {
        match self {
            FieldRule::Name => {
                let len = text.chars().count();
                len > 2 && len < 100 && !text.contains(BRAND_TOKEN)
            }
            FieldRule::Role => {
                text.chars().count() > 2
                    && !FOLLOWER_TERMS.iter().any(|t| text.contains(t))
                    && !CONNECTION_TERMS.iter().any(|t| text.contains(t))
            }
            FieldRule::FollowerCount => FOLLOWER_TERMS.iter().any(|t| text.contains(t)),
            FieldRule::ConnectionCount => CONNECTION_TERMS.iter().any(|t| text.contains(t)),
            FieldRule::SkillName => {
                let trimmed = text.trim();
                let len = trimmed.chars().count();
                !trimmed.is_empty()
                    && len > 2
                    && len < 50
                    && !SKILL_DENYLIST.iter().any(|t| trimmed.contains(t))
            }
        }
    }

    /// Context-sensitive acceptance. Counter fields additionally accept a bare
    /// numeral when the parent or grandparent element text carries the
    /// keyword; every other rule falls back to the pure text check.
    pub fn validate_in_context(&self, text: &str, node: Option<ElementRef<'_>>) -> bool {
        if self.validate(text) {
            return true;
        }

        let terms = match self {
            FieldRule::FollowerCount => FOLLOWER_TERMS,
            FieldRule::ConnectionCount => CONNECTION_TERMS,
            _ => return false,
        };

        if !BARE_NUMERAL_RE.is_match(text) {
            return false;
        }

        let Some(node) = node else { return false };
        let keyword_in = |level| {
            ancestor_text(node, level)
                .map_or(false, |t| terms.iter().any(|k| t.contains(k)))
        };
        keyword_in(1) || keyword_in(2)
    }
}

/// Text of the n-th element ancestor (1 = parent). `None` when the chain
/// leaves the element tree.
fn ancestor_text(node: ElementRef<'_>, level: usize) -> Option<String> {
    let mut current = node;
    for _ in 0..level {
        current = current.parent().and_then(ElementRef::wrap)?;
    }
    Some(element_text(current))
}
