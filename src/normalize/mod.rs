//! Entity normalization
//!
//! Raw entity strings from the extraction service are noisy: inconsistent
//! casing, stray whitespace, abbreviations, and outright junk. The
//! [`Normalizer`] maps each raw string to a canonical form:
//!
//! 1. trim and collapse interior whitespace (blank input yields `None`)
//! 2. look the lowercase comparison key up in the [`Lexicon`] alias table;
//!    a hit returns the presentation-cased canonical form
//! 3. otherwise return the lowercase key itself
//! 4. optionally drop the result if it matches a false-positive rule
//!
//! Normalization is a pure function of `(raw, filter flag, lexicon)` and is
//! idempotent: `normalize(normalize(x))` is `normalize(x)`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::{AbstractRecord, EntityCategory};

pub mod lexicon;

pub use lexicon::{
    collapse_whitespace, comparison_key, FalsePositiveRules, Lexicon, LexiconError,
    LexiconResult, LexiconSource, BUILTIN_LEXICON,
};

/// A canonical entity and the raw strings that collapsed into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntity {
    pub canonical: String,
    pub sources: BTreeSet<String>,
}

/// Lexicon-backed entity normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    lexicon: Arc<Lexicon>,
}

impl Normalizer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon: Arc::new(lexicon),
        }
    }

    /// Share an already loaded lexicon
    pub fn with_shared(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Canonicalize one raw entity string
    ///
    /// Returns `None` for blank input, and for false positives when
    /// `apply_false_positive_filter` is set.
    pub fn normalize(&self, raw: &str, apply_false_positive_filter: bool) -> Option<String> {
        let key = comparison_key(raw);
        if key.is_empty() {
            return None;
        }

        if apply_false_positive_filter && self.lexicon.is_false_positive(&key) {
            return None;
        }

        let canonical = match self.lexicon.resolve(&key) {
            Some(canonical) => canonical.to_string(),
            None => key,
        };

        // An alias may resolve onto a filtered term even when the source key is clean
        if apply_false_positive_filter && self.lexicon.is_false_positive(&canonical.to_lowercase())
        {
            return None;
        }

        Some(canonical)
    }

    /// Normalize a list and merge entries with the same canonical form
    ///
    /// Output order follows the first occurrence of each canonical entity.
    /// Canonical forms are compared case-insensitively.
    pub fn collapse<'a, I>(&self, raws: I, apply_false_positive_filter: bool) -> Vec<NormalizedEntity>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut entities: Vec<NormalizedEntity> = Vec::new();

        for raw in raws {
            let Some(canonical) = self.normalize(raw, apply_false_positive_filter) else {
                continue;
            };

            let key = canonical.to_lowercase();
            match positions.get(&key) {
                Some(&idx) => {
                    entities[idx].sources.insert(raw.to_string());
                }
                None => {
                    positions.insert(key, entities.len());
                    entities.push(NormalizedEntity {
                        canonical,
                        sources: BTreeSet::from([raw.to_string()]),
                    });
                }
            }
        }

        entities
    }

    /// Normalized occurrences of one category in a record (false positives dropped)
    pub fn category_entities(&self, record: &AbstractRecord, category: EntityCategory) -> Vec<String> {
        record
            .entities
            .get(category)
            .iter()
            .filter_map(|raw| self.normalize(raw, true))
            .collect()
    }

    /// Extractor yielding a record's normalized technologies
    pub fn technology_extractor(&self) -> impl Fn(&AbstractRecord) -> Vec<String> + '_ {
        move |record| self.category_entities(record, EntityCategory::Technology)
    }

    /// Extractor yielding a record's normalized domains
    pub fn domain_extractor(&self) -> impl Fn(&AbstractRecord) -> Vec<String> + '_ {
        move |record| self.category_entities(record, EntityCategory::Domain)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::default()
    }

    #[test]
    fn test_trim_and_lowercase() {
        let n = normalizer();
        assert_eq!(n.normalize("  Python ", true).as_deref(), Some("python"));
        assert_eq!(n.normalize("Graph   Neural\tNetworks", true).as_deref(), Some("graph neural networks"));
    }

    #[test]
    fn test_blank_is_none() {
        let n = normalizer();
        assert_eq!(n.normalize("", false), None);
        assert_eq!(n.normalize(" \t\n ", false), None);
    }

    #[test]
    fn test_alias_resolution() {
        let n = normalizer();
        assert_eq!(n.normalize("ML", true).as_deref(), Some("Machine Learning"));
        assert_eq!(n.normalize("machine learning", true).as_deref(), Some("Machine Learning"));
        assert_eq!(n.normalize("A.I.", false).as_deref(), Some("AI"));
    }

    #[test]
    fn test_false_positive_filter() {
        let n = normalizer();
        assert_eq!(n.normalize("N/A", true), None);
        assert_eq!(n.normalize("Smith et al.", true), None);
        assert_eq!(n.normalize("N/A", false).as_deref(), Some("n/a"));
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        for raw in ["ML", "  Python", "A.I.", "Deep   Learning", "Rust"] {
            let once = n.normalize(raw, true).unwrap();
            let twice = n.normalize(&once, true).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_alias_onto_false_positive_is_dropped() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [aliases]
            "Unknown" = ["tbd"]
            [false_positives]
            exact = ["unknown"]
            "#,
        )
        .unwrap();
        let n = Normalizer::new(lexicon);
        assert_eq!(n.normalize("TBD", true), None);
        assert_eq!(n.normalize("TBD", false).as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_collapse_preserves_first_seen_order() {
        let n = normalizer();
        let collapsed = n.collapse(["Rust", "AI", "rust ", "a.i.", "Go"], false);

        let names: Vec<_> = collapsed.iter().map(|e| e.canonical.as_str()).collect();
        assert_eq!(names, vec!["rust", "AI", "go"]);
        assert_eq!(collapsed[0].sources.len(), 2);
        assert!(collapsed[1].sources.contains("a.i."));
    }

    #[test]
    fn test_category_extractors() {
        let n = normalizer();
        let record = AbstractRecord::approved("a1", Some(2024))
            .with_technologies(["ML", "N/A", "Rust", "rust"])
            .with_domains(["Healthcare"]);

        assert_eq!(n.technology_extractor()(&record), vec!["Machine Learning", "rust", "rust"]);
        assert_eq!(n.domain_extractor()(&record), vec!["healthcare"]);
    }

    #[test]
    fn test_empty_lexicon_only_canonicalizes_case() {
        let n = Normalizer::new(Lexicon::empty());
        assert_eq!(n.normalize("ML", true).as_deref(), Some("ml"));
    }
}
