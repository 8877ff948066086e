// src/extractors/profile.rs

// --- Imports ---
use std::time::Instant;

use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::Html;
use serde::{Deserialize, Serialize};

use super::cascade::{self, FieldSpec};
use super::locate::{CssEval, ExtractionCache, Locator, LocatorEval, Scope};
use super::section::{self, ItemRecord, ItemSchema, SectionSpec};
use super::validate::FieldRule;
use crate::utils::error::ExtractError;

// --- Constants ---
// Subtitle delimiter: keeps "Acme Corp" out of "Acme Corp · 2019–2023"
const SUBTITLE_DELIMITER: &str = " · ";

// --- Field Tables (Lazy Static) ---
// Ordered cascades over the observed markup variants; most stable pattern
// first, generic text-scan last.

static NAME_FIELD: Lazy<FieldSpec> = Lazy::new(|| {
    FieldSpec::new(
        "name",
        vec![
            Locator::Css("h1.text-heading-xlarge"),
            Locator::Css(".text-heading-xlarge"),
            Locator::Css(r#"[data-anonymize="person-name"]"#),
            Locator::Css(".pv-text-details__left-panel h1"),
            Locator::Css(".ph5 h1"),
        ],
        Some(FieldRule::Name),
    )
});

static ROLE_FIELD: Lazy<FieldSpec> = Lazy::new(|| {
    FieldSpec::new(
        "role",
        vec![
            Locator::Css(".text-body-medium.break-words"),
            Locator::Css(".pv-text-details__left-panel .text-body-medium"),
            Locator::Css(".pv-top-card .text-body-medium"),
            Locator::Css(".ph5 .text-body-medium"),
        ],
        Some(FieldRule::Role),
    )
});

static FOLLOWERS_FIELD: Lazy<FieldSpec> = Lazy::new(|| {
    FieldSpec::new(
        "followers",
        vec![
            Locator::Css(r#"a[href*="followers"] strong"#),
            Locator::Css(r#"a[data-test-app-aware-link][href*="followers"] strong"#),
            Locator::Css(r#".pvs-header__optional-link a[href*="followers"] strong"#),
            Locator::Css(r#"a[href*="followers"] span"#),
            Locator::Css(r#".pv-top-card__connections a[href*="followers"]"#),
            Locator::Css(r#".pvs-entity__caption-wrapper span[aria-hidden="true"]"#),
            Locator::Css(r#".pvs-header__optional-link span[aria-hidden="true"]"#),
            // Widened search across generic containers, lowest confidence
            Locator::TextContains {
                within: r#"a[href*="followers"], span[aria-hidden="true"], p"#,
                needle: "abonnés",
            },
            Locator::TextContains {
                within: r#"a[href*="followers"], span[aria-hidden="true"], p"#,
                needle: "followers",
            },
        ],
        Some(FieldRule::FollowerCount),
    )
});

static CONNECTIONS_FIELD: Lazy<FieldSpec> = Lazy::new(|| {
    FieldSpec::new(
        "connections",
        vec![
            Locator::Css(r#"a[href*="connectionOf"] .t-bold"#),
            Locator::Css(r#"a[href*="network"] .t-bold"#),
            Locator::Css(r#"a[href*="connections"] .t-bold"#),
            Locator::Css(r#"a[href="/mynetwork/invite-connect/connections/"] .t-bold"#),
            Locator::Css(r#".text-body-small a[href*="connections"] .t-bold"#),
            Locator::Css(r#"a[href*="connections"] span"#),
            Locator::Css(r#".pv-top-card__connections a[href*="connections"]"#),
            Locator::TextContains {
                within: r#"a[href*="connections"], span[aria-hidden="true"], p"#,
                needle: "relations",
            },
            Locator::TextContains {
                within: r#"a[href*="connections"], span[aria-hidden="true"], p"#,
                needle: "connections",
            },
        ],
        Some(FieldRule::ConnectionCount),
    )
});

// --- Section Tables (Lazy Static) ---

fn entity_item_locators() -> Vec<Locator> {
    vec![
        Locator::Css(r#".artdeco-list__item[data-view-name="profile-component-entity"]"#),
        Locator::Css(".pvs-list__paged-list-item"),
        Locator::Css(".artdeco-list__item"),
        Locator::Css(r#"li[data-view-name="profile-component-entity"]"#),
        Locator::Css(".pvs-entity"),
    ]
}

fn entity_schema() -> ItemSchema {
    ItemSchema {
        title: FieldSpec::new(
            "item_title",
            vec![
                Locator::Css(r#".mr1.hoverable-link-text.t-bold span[aria-hidden="true"]"#),
                Locator::Css(r#".mr1.t-bold span[aria-hidden="true"]"#),
                Locator::Css(r#".pvs-entity__path-node span[aria-hidden="true"]"#),
                Locator::Css(r#"h3 span[aria-hidden="true"]"#),
                Locator::Css(r#".t-bold span[aria-hidden="true"]"#),
            ],
            None,
        ),
        subtitle: Some(FieldSpec::new(
            "item_subtitle",
            vec![
                Locator::Css(r#".t-14.t-normal span[aria-hidden="true"]"#),
                Locator::Css(r#".pvs-entity__secondary-title span[aria-hidden="true"]"#),
                Locator::Css(r#".t-normal span[aria-hidden="true"]"#),
            ],
            None,
        )),
        delimiter: SUBTITLE_DELIMITER,
    }
}

static EXPERIENCE_SECTION: Lazy<SectionSpec> = Lazy::new(|| SectionSpec {
    name: "experience",
    anchors: vec![
        Locator::Css("#experience"),
        Locator::Css(r#"section h2[id*="experience"]"#),
        Locator::Css(r#"div[id="experience"]"#),
    ],
    heading_names: vec!["Expérience", "Experience"],
    item_locators: entity_item_locators(),
    schema: entity_schema(),
});

static EDUCATION_SECTION: Lazy<SectionSpec> = Lazy::new(|| SectionSpec {
    name: "education",
    anchors: vec![
        Locator::Css("#education + .pvs-list__outer-container"),
        Locator::Css("#education"),
        Locator::Css(r#"div[id="education"]"#),
    ],
    heading_names: vec!["Formation", "Education", "Éducation"],
    item_locators: entity_item_locators(),
    schema: entity_schema(),
});

static CERTIFICATION_SECTION: Lazy<SectionSpec> = Lazy::new(|| SectionSpec {
    name: "certifications",
    anchors: vec![
        Locator::Css("#licenses_and_certifications + .pvs-list__outer-container"),
        Locator::Css("#licenses_and_certifications"),
        Locator::Css("#certifications"),
        Locator::Css(r#"div[id="licenses_and_certifications"]"#),
    ],
    heading_names: vec!["Certifications", "Licences", "Certificates"],
    item_locators: entity_item_locators(),
    schema: entity_schema(),
});

static SKILLS_SECTION: Lazy<SectionSpec> = Lazy::new(|| SectionSpec {
    name: "skills",
    // No stable anchor exists for this section; heading lookup only.
    anchors: vec![],
    heading_names: vec!["Compétences"],
    item_locators: vec![
        Locator::Css(".pvs-list__paged-list-item"),
        Locator::Css(r#"div[data-view-name="profile-component-entity"]"#),
    ],
    schema: ItemSchema {
        title: FieldSpec::new(
            "skill_name",
            vec![
                Locator::Css(r#".mr1.t-bold span[aria-hidden="true"]"#),
                Locator::Css(r#"span[aria-hidden="true"]"#),
            ],
            Some(FieldRule::SkillName),
        ),
        subtitle: None,
        delimiter: SUBTITLE_DELIMITER,
    },
});

// --- Output Structures ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub id: i64,
    #[serde(rename = "timestampISO8601")]
    pub timestamp_iso8601: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub elapsed_ms: u64,
    pub cache_hits: usize,
}

/// Aggregate result of one extraction pass. Every field degrades
/// independently to null/empty/zero when the document lacks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: Option<String>,
    pub role: Option<String>,
    pub follower_count_text: Option<String>,
    pub connection_count_text: Option<String>,
    pub experiences: Vec<ExperienceEntry>,
    pub education_and_certifications: Vec<CredentialEntry>,
    pub skill_count: usize,
    pub skills: Vec<String>,
    pub metadata: ExtractionMetadata,
}

// --- Assembler ---

/// Orchestrates one synchronous extraction pass over a parsed document. Holds
/// no state between passes; the cache lives and dies with a single `extract`
/// call.
pub struct ProfileExtractor<E: LocatorEval = CssEval> {
    eval: E,
}

impl ProfileExtractor<CssEval> {
    pub fn new() -> Self {
        Self { eval: CssEval }
    }
}

impl Default for ProfileExtractor<CssEval> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LocatorEval> ProfileExtractor<E> {
    #[allow(dead_code)]
    pub fn with_eval(eval: E) -> Self {
        Self { eval }
    }

    /// Runs one full extraction pass against `html`.
    ///
    /// Never fails for missing fields; the only fatal condition is an empty
    /// or inaccessible input document.
    pub fn extract(&self, html: &str, source_url: &str) -> Result<ProfileRecord, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::DocumentUnavailable);
        }

        let started = Instant::now();
        let pass_start = Utc::now();
        let document = Html::parse_document(html);
        let mut cache = ExtractionCache::new();

        tracing::info!("Starting extraction pass for {}", source_url);

        let scope = Scope::Document(&document);
        let name = cascade::resolve_field(&self.eval, &NAME_FIELD, scope, &mut cache);
        let role = cascade::resolve_field(&self.eval, &ROLE_FIELD, scope, &mut cache);
        let follower_count_text =
            cascade::resolve_field(&self.eval, &FOLLOWERS_FIELD, scope, &mut cache);
        let connection_count_text =
            cascade::resolve_field(&self.eval, &CONNECTIONS_FIELD, scope, &mut cache)
                .map(format_connection_text);

        let experiences: Vec<ExperienceEntry> = self
            .section_items(&document, &EXPERIENCE_SECTION, &mut cache)
            .into_iter()
            .map(|item| ExperienceEntry { title: item.title, company: item.detail })
            .collect();

        let mut education_and_certifications: Vec<CredentialEntry> = Vec::new();
        for (spec, kind) in [
            (&*EDUCATION_SECTION, "Formation"),
            (&*CERTIFICATION_SECTION, "Certification"),
        ] {
            education_and_certifications.extend(
                self.section_items(&document, spec, &mut cache)
                    .into_iter()
                    .map(|item| CredentialEntry {
                        kind: kind.to_string(),
                        name: item.title,
                        detail: item.detail,
                    }),
            );
        }

        let (skills, skill_count) = self.extract_skills(&document, &mut cache);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let metadata = ExtractionMetadata {
            id: pass_start.timestamp_millis(),
            timestamp_iso8601: pass_start.to_rfc3339(),
            source_url: source_url.to_string(),
            elapsed_ms,
            cache_hits: cache.len(),
        };

        tracing::info!(
            "Extraction pass finished in {}ms ({} cache entries)",
            elapsed_ms,
            cache.len()
        );

        Ok(ProfileRecord {
            name,
            role,
            follower_count_text,
            connection_count_text,
            experiences,
            education_and_certifications,
            skill_count,
            skills,
            metadata,
        })
    }

    fn section_items(
        &self,
        document: &Html,
        spec: &SectionSpec,
        cache: &mut ExtractionCache,
    ) -> Vec<ItemRecord> {
        let Some(found) = section::find_section(&self.eval, document, spec) else {
            return Vec::new();
        };
        section::extract_items(&self.eval, found, &spec.item_locators, &spec.schema, cache)
    }

    /// Skills list (validated, order-preserving dedup) plus the reconciled total.
    fn extract_skills(
        &self,
        document: &Html,
        cache: &mut ExtractionCache,
    ) -> (Vec<String>, usize) {
        let Some(found) = section::find_section(&self.eval, document, &SKILLS_SECTION) else {
            return (Vec::new(), 0);
        };
        let items = section::extract_items(
            &self.eval,
            found,
            &SKILLS_SECTION.item_locators,
            &SKILLS_SECTION.schema,
            cache,
        );
        let skills = dedup_preserving_order(items.into_iter().map(|item| item.title));
        let count = section::reconcile_count(found, skills.len());
        (skills, count)
    }
}

/// First-occurrence dedup, document order preserved.
fn dedup_preserving_order<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// A bare numeral accepted via ancestor context is reported as "<n> relations".
fn format_connection_text(text: String) -> String {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        format!("{text} relations")
    } else {
        text
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_URL: &str = "https://example.com/in/ada";

    fn extract(html: &str) -> ProfileRecord {
        ProfileExtractor::new().extract(html, SOURCE_URL).expect("pass must succeed")
    }

    #[test]
    fn test_empty_document_is_fatal() {
        let result = ProfileExtractor::new().extract("   ", SOURCE_URL);
        assert!(matches!(result, Err(ExtractError::DocumentUnavailable)));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let html = r#"
            <html><body>
            <h1 class="text-heading-xlarge">Ada Lovelace</h1>
            <a href="/in/ada/followers/"><strong>1,204 abonnés</strong></a>
            <section>
                <div id="experience"></div>
                <ul>
                    <li class="artdeco-list__item" data-view-name="profile-component-entity">
                        <span class="mr1 t-bold"><span aria-hidden="true">Engineer</span></span>
                        <span class="t-14 t-normal"><span aria-hidden="true">Acme Corp · 2019–2023</span></span>
                    </li>
                </ul>
            </section>
            </body></html>
        "#;

        let record = extract(html);
        assert_eq!(record.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(record.role, None); // no job element present
        assert_eq!(record.follower_count_text.as_deref(), Some("1,204 abonnés"));
        assert_eq!(
            record.experiences,
            vec![ExperienceEntry {
                title: "Engineer".to_string(),
                company: "Acme Corp".to_string(),
            }]
        );
        assert_eq!(record.metadata.source_url, SOURCE_URL);
    }

    #[test]
    fn test_idempotent_modulo_metadata() {
        let html = r#"
            <html><body>
            <h1 class="text-heading-xlarge">Ada Lovelace</h1>
            <div class="text-body-medium break-words">Analytical Engine Programmer</div>
            <section><h2>Compétences</h2>
                <li class="pvs-list__paged-list-item">
                    <span class="mr1 t-bold"><span aria-hidden="true">Mathématiques</span></span>
                </li>
            </section>
            </body></html>
        "#;

        let first = extract(html);
        let second = extract(html);
        assert_eq!(first.name, second.name);
        assert_eq!(first.role, second.role);
        assert_eq!(first.follower_count_text, second.follower_count_text);
        assert_eq!(first.connection_count_text, second.connection_count_text);
        assert_eq!(first.experiences, second.experiences);
        assert_eq!(
            first.education_and_certifications,
            second.education_and_certifications
        );
        assert_eq!(first.skills, second.skills);
        assert_eq!(first.skill_count, second.skill_count);
        assert_eq!(first.metadata.cache_hits, second.metadata.cache_hits);
        assert_eq!(first.metadata.source_url, second.metadata.source_url);
    }

    #[test]
    fn test_skills_validated_deduped_and_counted() {
        let html = r#"
            <html><body>
            <section>
                <h2><span aria-hidden="true">Compétences</span></h2>
                <ul>
                    <li class="pvs-list__paged-list-item"><span class="mr1 t-bold"><span aria-hidden="true">Rust</span></span></li>
                    <li class="pvs-list__paged-list-item"><span class="mr1 t-bold"><span aria-hidden="true">Rust</span></span></li>
                    <li class="pvs-list__paged-list-item"><span class="mr1 t-bold"><span aria-hidden="true">Voir plus</span></span></li>
                    <li class="pvs-list__paged-list-item"><span class="mr1 t-bold"><span aria-hidden="true">Python</span></span></li>
                </ul>
                <div class="pvs-navigation__text">Afficher les 42 compétences</div>
            </section>
            </body></html>
        "#;

        let record = extract(html);
        assert_eq!(record.skills, vec!["Rust".to_string(), "Python".to_string()]);
        assert_eq!(record.skill_count, 42); // affordance total wins over visible 2
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let deduped = dedup_preserving_order(
            ["Go", "Go", "Rust"].into_iter().map(str::to_string),
        );
        assert_eq!(deduped, vec!["Go".to_string(), "Rust".to_string()]);
    }

    #[test]
    fn test_bare_connection_numeral_gets_keyword_suffix() {
        let html = r#"
            <html><body>
            <a href="/mynetwork/invite-connect/connections/">
                <span class="t-bold">34</span> relations
            </a>
            </body></html>
        "#;

        let record = extract(html);
        assert_eq!(record.connection_count_text.as_deref(), Some("34 relations"));
    }

    #[test]
    fn test_education_and_certifications_are_typed_and_merged() {
        let html = r#"
            <html><body>
            <section>
                <div id="education"></div>
                <li class="pvs-list__paged-list-item">
                    <span class="mr1 t-bold"><span aria-hidden="true">ENS Paris</span></span>
                    <span class="t-14 t-normal"><span aria-hidden="true">Mathématiques · 1840</span></span>
                </li>
            </section>
            <section>
                <div id="licenses_and_certifications"></div>
                <li class="pvs-list__paged-list-item">
                    <span class="mr1 t-bold"><span aria-hidden="true">Charles Babbage Award</span></span>
                </li>
            </section>
            </body></html>
        "#;

        let record = extract(html);
        assert_eq!(
            record.education_and_certifications,
            vec![
                CredentialEntry {
                    kind: "Formation".to_string(),
                    name: "ENS Paris".to_string(),
                    detail: "Mathématiques".to_string(),
                },
                CredentialEntry {
                    kind: "Certification".to_string(),
                    name: "Charles Babbage Award".to_string(),
                    detail: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_bare_document_degrades_to_nulls() {
        let record = extract("<html><body><p>nothing useful</p></body></html>");
        assert_eq!(record.name, None);
        assert_eq!(record.role, None);
        assert_eq!(record.follower_count_text, None);
        assert_eq!(record.connection_count_text, None);
        assert!(record.experiences.is_empty());
        assert!(record.education_and_certifications.is_empty());
        assert!(record.skills.is_empty());
        assert_eq!(record.skill_count, 0);
    }

    #[test]
    fn test_json_shape_matches_contract() {
        let record = extract(r#"<html><body><h1 class="text-heading-xlarge">Ada Lovelace</h1></body></html>"#);
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("name").is_some());
        assert!(json.get("role").is_some());
        assert!(json.get("followerCountText").is_some());
        assert!(json.get("connectionCountText").is_some());
        assert!(json.get("experiences").is_some());
        assert!(json.get("educationAndCertifications").is_some());
        assert!(json.get("skillCount").is_some());
        assert!(json.get("skills").is_some());

        let metadata = json.get("metadata").unwrap();
        assert!(metadata.get("id").is_some());
        assert!(metadata.get("timestampISO8601").is_some());
        assert_eq!(
            metadata.get("sourceURL").and_then(|v| v.as_str()),
            Some(SOURCE_URL)
        );
        assert!(metadata.get("elapsedMs").is_some());
        assert!(metadata.get("cacheHits").is_some());
    }
}
