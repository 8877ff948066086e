// src/extractors/cascade.rs

// --- Imports ---
use super::locate::{element_text, ExtractionCache, Locator, LocatorEval, Scope};
use super::validate::FieldRule;

/// A field definition: ordered locator cascade plus an optional validator.
///
/// Locator order is fixed at definition time and encodes confidence ranking:
/// most specific/stable pattern first, most generic text-scan last. The
/// resolver never reorders or mixes confidence across calls.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub locators: Vec<Locator>,
    pub validator: Option<FieldRule>,
}

impl FieldSpec {
    pub fn new(name: &'static str, locators: Vec<Locator>, validator: Option<FieldRule>) -> Self {
        Self { name, locators, validator }
    }
}

/// Resolves a locator cascade to at most one text value within `scope`.
///
/// Locators are tried in strict order; the first candidate whose trimmed text
/// is non-empty and passes the validator (accept-all when absent) wins.
/// Locator evaluation failures are logged and treated as non-matches. Both
/// hits and misses are memoized in the pass-scoped cache.
pub fn resolve(
    eval: &dyn LocatorEval,
    locators: &[Locator],
    scope: Scope<'_>,
    validator: Option<FieldRule>,
    cache: &mut ExtractionCache,
) -> Option<String> {
    let key = ExtractionCache::key(locators, &scope);
    if let Some(cached) = cache.get(&key) {
        return cached.clone();
    }

    for locator in locators {
        match eval.find_one(locator, scope) {
            Ok(Some(el)) => {
                let text = element_text(el);
                if text.is_empty() {
                    continue;
                }
                let accepted = validator
                    .map_or(true, |rule| rule.validate_in_context(&text, Some(el)));
                if accepted {
                    cache.insert(key, Some(text.clone()));
                    return Some(text);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Locator '{}' failed in cascade: {}", locator.identity(), e);
            }
        }
    }

    cache.insert(key, None);
    None
}

/// Resolves a full `FieldSpec` against a scope.
pub fn resolve_field(
    eval: &dyn LocatorEval,
    spec: &FieldSpec,
    scope: Scope<'_>,
    cache: &mut ExtractionCache,
) -> Option<String> {
    let value = resolve(eval, &spec.locators, scope, spec.validator, cache);
    tracing::trace!("Field '{}' resolved to {:?}", spec.name, value.as_deref());
    value
}
