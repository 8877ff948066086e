// src/extractors/section.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::cascade::{self, FieldSpec};
use super::locate::{element_text, ExtractionCache, Locator, LocatorEval, Scope};

// --- CSS Selectors (Lazy Static) ---
static SECTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section").expect("Failed to compile SECTION_SELECTOR"));

static SECTION_HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2, h3").expect("Failed to compile SECTION_HEADING_SELECTOR")
});

// "Show more N items" affordance inside the skills section
static SHOW_MORE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".pvs-navigation__text, a[href*="details/skills"] .pvs-navigation__text"#)
        .expect("Failed to compile SHOW_MORE_SELECTOR")
});

// Alternate summary link carrying the total
static SKILL_SUMMARY_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="details/skills"]"#)
        .expect("Failed to compile SKILL_SUMMARY_LINK_SELECTOR")
});

// --- Regex Patterns for Count Parsing (Lazy Static) ---
// Tied to the affordance's expected phrasing, e.g. "Afficher les 42 compétences"
static SHOW_MORE_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Afficher\s+les\s+(\d+)\s+compétences")
        .expect("Failed to compile SHOW_MORE_COUNT_RE")
});

// Looser pattern for the summary link, e.g. "42 compétences"
static SUMMARY_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*compétences").expect("Failed to compile SUMMARY_COUNT_RE")
});

// --- Data Structures ---

/// Per-item subfield cascades. The subtitle is split on `delimiter` and only
/// the first segment kept (trailing duration/date metadata is discarded).
#[derive(Debug, Clone)]
pub struct ItemSchema {
    pub title: FieldSpec,
    pub subtitle: Option<FieldSpec>,
    pub delimiter: &'static str,
}

/// A named document region grouping repeated items.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: &'static str,
    pub anchors: Vec<Locator>,
    pub heading_names: Vec<&'static str>,
    pub item_locators: Vec<Locator>,
    pub schema: ItemSchema,
}

/// One repeated entry within a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub title: String,
    pub detail: String,
}

/// Locates the section described by `spec`.
///
/// Phase 1 tries each anchor locator against the whole document and walks up
/// to the nearest enclosing `<section>`. Phase 2 sweeps every section in the
/// document and matches its heading text against the known names
/// (case-sensitive substring). `None` is a normal outcome, not an error: the
/// section is simply absent from this document.
pub fn find_section<'a>(
    eval: &dyn LocatorEval,
    document: &'a Html,
    spec: &SectionSpec,
) -> Option<ElementRef<'a>> {
    for anchor in &spec.anchors {
        match eval.find_one(anchor, Scope::Document(document)) {
            Ok(Some(el)) => {
                if let Some(section) = enclosing_section(el) {
                    tracing::debug!(
                        "Section '{}' found via anchor '{}'",
                        spec.name,
                        anchor.identity()
                    );
                    return Some(section);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    "Anchor '{}' failed for section '{}': {}",
                    anchor.identity(),
                    spec.name,
                    e
                );
            }
        }
    }

    for section in document.select(&SECTION_SELECTOR) {
        if let Some(heading) = section.select(&SECTION_HEADING_SELECTOR).next() {
            let heading_text = element_text(heading);
            if spec.heading_names.iter().any(|name| heading_text.contains(name)) {
                tracing::debug!("Section '{}' found via heading '{}'", spec.name, heading_text);
                return Some(section);
            }
        }
    }

    tracing::debug!("Section '{}' not present in document", spec.name);
    None
}

/// The element itself if it is a `<section>`, else its nearest section ancestor.
fn enclosing_section(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if el.value().name() == "section" {
        return Some(el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "section")
}

/// Extracts item records from a located section.
///
/// The first item locator yielding a non-empty match set is used exclusively;
/// merging across patterns would duplicate items from overlapping selectors.
/// Items whose title fails to resolve are skipped silently: a node without a
/// resolvable title is assumed to be decorative.
pub fn extract_items(
    eval: &dyn LocatorEval,
    section: ElementRef<'_>,
    item_locators: &[Locator],
    schema: &ItemSchema,
    cache: &mut ExtractionCache,
) -> Vec<ItemRecord> {
    let mut nodes = Vec::new();
    for locator in item_locators {
        match eval.find_all(locator, Scope::Node(section)) {
            Ok(matches) if !matches.is_empty() => {
                tracing::debug!(
                    "Item locator '{}' matched {} nodes",
                    locator.identity(),
                    matches.len()
                );
                nodes = matches;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Item locator '{}' failed: {}", locator.identity(), e);
            }
        }
    }

    let mut records = Vec::new();
    for node in nodes {
        let scope = Scope::Node(node);
        let Some(title) = cascade::resolve_field(eval, &schema.title, scope, cache) else {
            continue;
        };
        let detail = schema
            .subtitle
            .as_ref()
            .and_then(|subtitle| cascade::resolve_field(eval, subtitle, scope, cache))
            .map(|text| first_segment(&text, schema.delimiter))
            .unwrap_or_default();
        records.push(ItemRecord { title, detail });
    }
    records
}

/// Keeps the part before the delimiter: "Acme Corp · 2019–2023" → "Acme Corp".
fn first_segment(text: &str, delimiter: &str) -> String {
    text.split(delimiter).next().unwrap_or(text).trim().to_string()
}

/// Resolves the authoritative skill total for a section.
///
/// Preference order: the "show more" affordance, then the summary link, then
/// the count of validated items actually extracted. The visible count is a
/// lower bound, so the result is never smaller than `visible`.
pub fn reconcile_count(section: ElementRef<'_>, visible: usize) -> usize {
    let parsed = section
        .select(&SHOW_MORE_SELECTOR)
        .next()
        .and_then(|el| parse_count(&element_text(el), &SHOW_MORE_COUNT_RE))
        .or_else(|| {
            section
                .select(&SKILL_SUMMARY_LINK_SELECTOR)
                .next()
                .and_then(|el| parse_count(&element_text(el), &SUMMARY_COUNT_RE))
        });

    match parsed {
        // An affordance count below the visible validated count means the
        // document is inconsistent; keep the larger value.
        Some(count) => count.max(visible),
        None => visible,
    }
}

fn parse_count(text: &str, pattern: &Regex) -> Option<usize> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}
