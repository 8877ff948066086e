// src/extractors/locate.rs

// --- Imports ---
use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use crate::utils::error::ExtractError;

// --- Constants ---
// Bound on the scope snippet used for cache keys. Long enough to tell sibling
// items apart, short enough to keep keys cheap.
const SCOPE_SNIPPET_LEN: usize = 100;

/// A pattern describing how to find a candidate node within a scope.
///
/// `Css` is the structural form; `TextContains` is the generic text-scan form
/// that cascades place last as their lowest-confidence fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    TextContains {
        within: &'static str,
        needle: &'static str,
    },
}

impl Locator {
    /// Stable identity string, used for cache keys.
    pub fn identity(&self) -> String {
        match self {
            Locator::Css(css) => (*css).to_string(),
            Locator::TextContains { within, needle } => format!("{within}~{needle}"),
        }
    }
}

/// The node (or whole document) a search is bounded to.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    Document(&'a Html),
    Node(ElementRef<'a>),
}

impl<'a> Scope<'a> {
    pub fn element(&self) -> ElementRef<'a> {
        match self {
            Scope::Document(doc) => doc.root_element(),
            Scope::Node(el) => *el,
        }
    }

    /// Bounded fingerprint for cache keying: whole-document scopes share a
    /// constant token, sub-scopes combine the node's tree identity with a
    /// snippet of their serialized content. Structural identity keeps sibling
    /// items with identical markup prefixes from colliding; the snippet is an
    /// approximation of content equality, not deep equality.
    pub fn fingerprint(&self) -> String {
        match self {
            Scope::Document(_) => String::new(),
            Scope::Node(el) => {
                let snippet: String = el.html().chars().take(SCOPE_SNIPPET_LEN).collect();
                format!("{:?}:{}", el.id(), snippet)
            }
        }
    }
}

/// Capability for evaluating locators against a document scope.
///
/// Injected into the cascade so the engine can be exercised against synthetic
/// trees (or wrapped with a call-counting spy) in tests.
pub trait LocatorEval {
    fn find_one<'a>(
        &self,
        locator: &Locator,
        scope: Scope<'a>,
    ) -> Result<Option<ElementRef<'a>>, ExtractError>;

    fn find_all<'a>(
        &self,
        locator: &Locator,
        scope: Scope<'a>,
    ) -> Result<Vec<ElementRef<'a>>, ExtractError>;
}

/// Production evaluator backed by scraper's CSS selector engine.
pub struct CssEval;

impl CssEval {
    fn compile(css: &str) -> Result<Selector, ExtractError> {
        Selector::parse(css).map_err(|e| ExtractError::BadLocator(format!("{css}: {e}")))
    }
}

impl LocatorEval for CssEval {
    fn find_one<'a>(
        &self,
        locator: &Locator,
        scope: Scope<'a>,
    ) -> Result<Option<ElementRef<'a>>, ExtractError> {
        Ok(self.find_all(locator, scope)?.into_iter().next())
    }

    fn find_all<'a>(
        &self,
        locator: &Locator,
        scope: Scope<'a>,
    ) -> Result<Vec<ElementRef<'a>>, ExtractError> {
        let root = scope.element();
        match locator {
            Locator::Css(css) => {
                let selector = Self::compile(css)?;
                Ok(root.select(&selector).collect())
            }
            Locator::TextContains { within, needle } => {
                let selector = Self::compile(within)?;
                Ok(root
                    .select(&selector)
                    .filter(|el| element_text(*el).contains(needle))
                    .collect())
            }
        }
    }
}

/// Concatenated, whitespace-trimmed text content of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Pass-scoped memo of cascade results, keyed by locator identities plus a
/// scope fingerprint. Created fresh at the start of an extraction pass and
/// discarded at its end; never shared across passes.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: HashMap<String, Option<String>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(locators: &[Locator], scope: &Scope<'_>) -> String {
        let ids: Vec<String> = locators.iter().map(Locator::identity).collect();
        format!("{}{}", ids.join("|"), scope.fingerprint())
    }

    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, value: Option<String>) {
        self.entries.insert(key, value);
    }

    /// Entry count, reported as the pass's cache diagnostic.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_scope_fingerprint_is_constant() {
        let doc_a = Html::parse_document("<body><p>one</p></body>");
        let doc_b = Html::parse_document("<body><p>two</p></body>");
        assert_eq!(
            Scope::Document(&doc_a).fingerprint(),
            Scope::Document(&doc_b).fingerprint()
        );
    }

    #[test]
    fn test_node_scope_fingerprint_is_bounded() {
        let long_text = "x".repeat(5000);
        let html = format!("<body><div id=\"big\">{long_text}</div></body>");
        let doc = Html::parse_document(&html);
        let selector = Selector::parse("#big").unwrap();
        let node = doc.select(&selector).next().unwrap();
        // Tree identity plus the content snippet; the snippet stays bounded.
        let fingerprint = Scope::Node(node).fingerprint();
        let snippet = fingerprint.split_once(':').unwrap().1;
        assert!(snippet.chars().count() <= SCOPE_SNIPPET_LEN);
    }

    #[test]
    fn test_nodes_with_identical_markup_prefix_get_distinct_fingerprints() {
        // Sibling items whose first 100 serialized chars agree must still key
        // separately, or a later item would be served the earlier item's
        // cached value.
        let shared_prefix = "y".repeat(200);
        let html = format!(
            r#"<body>
                <li class="entry"><span class="pad">{shared_prefix}</span><span class="title">first</span></li>
                <li class="entry"><span class="pad">{shared_prefix}</span><span class="title">second</span></li>
            </body>"#
        );
        let doc = Html::parse_document(&html);
        let selector = Selector::parse("li.entry").unwrap();
        let mut items = doc.select(&selector);
        let a = items.next().unwrap();
        let b = items.next().unwrap();
        assert_ne!(Scope::Node(a).fingerprint(), Scope::Node(b).fingerprint());
    }

    #[test]
    fn test_css_eval_finds_nodes() {
        let doc = Html::parse_document(r#"<body><span class="a">first</span><span class="a">second</span></body>"#);
        let eval = CssEval;
        let all = eval.find_all(&Locator::Css("span.a"), Scope::Document(&doc)).unwrap();
        assert_eq!(all.len(), 2);
        let one = eval.find_one(&Locator::Css("span.a"), Scope::Document(&doc)).unwrap().unwrap();
        assert_eq!(element_text(one), "first");
    }

    #[test]
    fn test_text_contains_filters_candidates() {
        let doc = Html::parse_document(
            r#"<body><p>nothing here</p><p>1,204 abonnés</p></body>"#,
        );
        let eval = CssEval;
        let locator = Locator::TextContains { within: "p", needle: "abonnés" };
        let found = eval.find_one(&locator, Scope::Document(&doc)).unwrap().unwrap();
        assert_eq!(element_text(found), "1,204 abonnés");
    }

    #[test]
    fn test_malformed_selector_reports_bad_locator() {
        let doc = Html::parse_document("<body></body>");
        let eval = CssEval;
        // A dangling combinator cannot be parsed as a selector.
        let result = eval.find_one(&Locator::Css("p >"), Scope::Document(&doc));
        assert!(matches!(result, Err(ExtractError::BadLocator(_))));
    }

    #[test]
    fn test_cache_key_depends_on_scope() {
        let doc = Html::parse_document(r#"<body><div id="a">aaa</div><div id="b">bbb</div></body>"#);
        let selector = Selector::parse("div").unwrap();
        let mut divs = doc.select(&selector);
        let a = divs.next().unwrap();
        let b = divs.next().unwrap();
        let locators = [Locator::Css("span")];
        assert_ne!(
            ExtractionCache::key(&locators, &Scope::Node(a)),
            ExtractionCache::key(&locators, &Scope::Node(b))
        );
    }

    #[test]
    fn test_cache_stores_misses_and_clears() {
        let mut cache = ExtractionCache::new();
        cache.insert("k1".to_string(), Some("v".to_string()));
        cache.insert("k2".to_string(), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("k2"), Some(&None));
        cache.clear();
        assert!(cache.is_empty());
    }
}
