//! Versioned alias and false-positive tables
//!
//! The lexicon is configuration data: it is loaded from TOML, validated once,
//! and then shared read-only by every [`Normalizer`](super::Normalizer).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Lexicon embedded in the binary, used when no lexicon file is configured
pub const BUILTIN_LEXICON: &str = include_str!("../../lexicon.toml");

/// Errors raised while loading or validating a lexicon
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Alias '{term}' maps to both '{first}' and '{second}'")]
    ConflictingAlias {
        term: String,
        first: String,
        second: String,
    },

    #[error("Empty term in lexicon section '{section}'")]
    EmptyTerm { section: &'static str },

    #[error("Failed to parse lexicon: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read lexicon file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for lexicon operations
pub type LexiconResult<T> = Result<T, LexiconError>;

/// False-positive rules as written in the lexicon file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FalsePositiveRules {
    /// Terms dropped when they equal the whole normalized entity
    #[serde(default)]
    pub exact: Vec<String>,

    /// Terms dropped when they occur anywhere in the normalized entity
    #[serde(default)]
    pub contains: Vec<String>,
}

/// On-disk lexicon layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconSource {
    pub version: String,

    /// Canonical form -> source terms
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub false_positives: FalsePositiveRules,
}

/// Compiled, validated lexicon
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    version: String,

    /// Comparison key -> canonical form
    alias_map: HashMap<String, String>,

    exact_false_positives: HashSet<String>,

    contains_false_positives: Vec<String>,
}

impl Lexicon {
    /// Lexicon with no aliases and no false positives
    pub fn empty() -> Self {
        Self {
            version: "empty".to_string(),
            ..Default::default()
        }
    }

    /// The embedded default lexicon
    ///
    /// `BUILTIN_LEXICON` is compiled in and checked by
    /// `test_builtin_lexicon_is_valid`, so it always parses.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_LEXICON).expect("embedded lexicon.toml must be valid")
    }

    /// Parse and validate a TOML lexicon
    pub fn from_toml_str(content: &str) -> LexiconResult<Self> {
        let source: LexiconSource = toml::from_str(content)?;
        Self::compile(source)
    }

    /// Load and validate a TOML lexicon file
    pub fn from_file(path: &Path) -> LexiconResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LexiconError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let lexicon = Self::from_toml_str(&content)?;

        tracing::info!(
            path = %path.display(),
            version = %lexicon.version,
            aliases = lexicon.alias_map.len(),
            "Loaded lexicon"
        );

        Ok(lexicon)
    }

    /// Validate a lexicon source and build lookup tables
    ///
    /// Canonical forms are registered before source terms so that a source term
    /// colliding with another entry's canonical form is reported as a conflict.
    pub fn compile(source: LexiconSource) -> LexiconResult<Self> {
        let mut alias_map: HashMap<String, String> = HashMap::new();

        for canonical in source.aliases.keys() {
            let canonical = collapse_whitespace(canonical);
            if canonical.is_empty() {
                return Err(LexiconError::EmptyTerm { section: "aliases" });
            }
            insert_alias(&mut alias_map, comparison_key(&canonical), &canonical)?;
        }

        for (canonical, terms) in &source.aliases {
            let canonical = collapse_whitespace(canonical);
            for term in terms {
                let key = comparison_key(term);
                if key.is_empty() {
                    return Err(LexiconError::EmptyTerm { section: "aliases" });
                }
                insert_alias(&mut alias_map, key, &canonical)?;
            }
        }

        let exact_false_positives = source
            .false_positives
            .exact
            .iter()
            .map(|term| non_empty_key(term, "false_positives.exact"))
            .collect::<LexiconResult<HashSet<_>>>()?;

        let mut contains_false_positives = source
            .false_positives
            .contains
            .iter()
            .map(|term| non_empty_key(term, "false_positives.contains"))
            .collect::<LexiconResult<Vec<_>>>()?;
        contains_false_positives.sort();
        contains_false_positives.dedup();

        Ok(Self {
            version: source.version,
            alias_map,
            exact_false_positives,
            contains_false_positives,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of distinct comparison keys with an alias (canonical forms included)
    pub fn alias_count(&self) -> usize {
        self.alias_map.len()
    }

    /// Canonical form for a comparison key, if the key is a known alias
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.alias_map.get(key).map(String::as_str)
    }

    /// Whether a comparison key is known extraction noise
    pub fn is_false_positive(&self, key: &str) -> bool {
        self.exact_false_positives.contains(key)
            || self
                .contains_false_positives
                .iter()
                .any(|term| key.contains(term.as_str()))
    }
}

fn insert_alias(
    alias_map: &mut HashMap<String, String>,
    key: String,
    canonical: &str,
) -> LexiconResult<()> {
    match alias_map.get(&key) {
        Some(existing) if existing != canonical => Err(LexiconError::ConflictingAlias {
            term: key,
            first: existing.clone(),
            second: canonical.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            alias_map.insert(key, canonical.to_string());
            Ok(())
        }
    }
}

fn non_empty_key(term: &str, section: &'static str) -> LexiconResult<String> {
    let key = comparison_key(term);
    if key.is_empty() {
        Err(LexiconError::EmptyTerm { section })
    } else {
        Ok(key)
    }
}

/// Trim and collapse interior whitespace runs to a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and whitespace-insensitive comparison key
pub fn comparison_key(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lexicon_is_valid() {
        let lexicon = Lexicon::from_toml_str(BUILTIN_LEXICON).unwrap();
        assert_eq!(lexicon.resolve("ml"), Some("Machine Learning"));
        assert_eq!(lexicon.resolve("a.i."), Some("AI"));
        assert_eq!(lexicon.resolve("ai"), Some("AI"));
        assert!(!lexicon.version().is_empty());
    }

    #[test]
    fn test_canonical_is_alias_of_itself() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [aliases]
            "Machine Learning" = ["ml"]
            "#,
        )
        .unwrap();
        assert_eq!(lexicon.resolve("machine learning"), Some("Machine Learning"));
        assert_eq!(lexicon.alias_count(), 2);
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let result = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [aliases]
            "Machine Learning" = ["ml"]
            "Markup Language" = ["ML"]
            "#,
        );
        assert!(matches!(result, Err(LexiconError::ConflictingAlias { .. })));
    }

    #[test]
    fn test_source_term_shadowing_canonical_rejected() {
        let result = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [aliases]
            "AI" = ["a.i."]
            "Artificial Intelligence" = ["ai"]
            "#,
        );
        assert!(matches!(result, Err(LexiconError::ConflictingAlias { .. })));
    }

    #[test]
    fn test_empty_term_rejected() {
        let result = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [false_positives]
            exact = ["  "]
            "#,
        );
        assert!(matches!(result, Err(LexiconError::EmptyTerm { .. })));
    }

    #[test]
    fn test_false_positive_matching() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            version = "t1"
            [false_positives]
            exact = ["N/A"]
            contains = ["et al"]
            "#,
        )
        .unwrap();
        assert!(lexicon.is_false_positive("n/a"));
        assert!(!lexicon.is_false_positive("n/a tools"));
        assert!(lexicon.is_false_positive("smith et al. 2020"));
        assert!(!lexicon.is_false_positive("python"));
    }

    #[test]
    fn test_comparison_key() {
        assert_eq!(comparison_key("  Deep \t Learning "), "deep learning");
        assert_eq!(collapse_whitespace("  Deep \t Learning "), "Deep Learning");
    }
}
