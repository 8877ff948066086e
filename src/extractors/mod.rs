// src/extractors/mod.rs
pub mod cascade;
pub mod locate;
pub mod profile;
pub mod section;
pub mod validate;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use locate::{CssEval, ExtractionCache, Locator, LocatorEval, Scope};
#[allow(unused_imports)]
pub use profile::{ProfileExtractor, ProfileRecord};
