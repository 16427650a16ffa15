// Core data structures for trendscope analytics

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Review status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Any status string this crate does not know about
    #[serde(other)]
    Unknown,
}

impl RecordStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity category produced by the extraction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Technology,
    Domain,
    Methodology,
}

impl EntityCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Domain => "domain",
            Self::Methodology => "methodology",
        }
    }

    /// All categories, in the order entities are read from a record
    pub fn all() -> [Self; 3] {
        [Self::Technology, Self::Domain, Self::Methodology]
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw entity lists attached to a record by the extraction service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLists {
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub technologies: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub domains: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub methodologies: Vec<String>,
}

impl EntityLists {
    /// Raw entities of one category
    pub fn get(&self, category: EntityCategory) -> &[String] {
        match category {
            EntityCategory::Technology => &self.technologies,
            EntityCategory::Domain => &self.domains,
            EntityCategory::Methodology => &self.methodologies,
        }
    }

    /// Iterate every raw entity with its category (technologies, domains, methodologies)
    pub fn iter(&self) -> impl Iterator<Item = (EntityCategory, &str)> {
        EntityCategory::all().into_iter().flat_map(move |category| {
            self.get(category)
                .iter()
                .map(move |raw| (category, raw.as_str()))
        })
    }

    /// Total number of raw entities across categories
    pub fn len(&self) -> usize {
        self.technologies.len() + self.domains.len() + self.methodologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One abstract submission with its extracted entities
///
/// Records are immutable inputs to an analytics pass. Missing or malformed
/// entity fields decode as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbstractRecord {
    pub id: String,

    /// Submission year; absent years are skipped by year-keyed analytics
    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: EntityLists,

    /// Extraction confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,

    /// Manually assigned theme labels
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub themes: Vec<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub authors: Vec<String>,
}

impl AbstractRecord {
    /// Create an approved record with no entities
    pub fn approved(id: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            id: id.into(),
            year,
            status: RecordStatus::Approved,
            confidence: 1.0,
            ..Default::default()
        }
    }

    /// Replace the technology list
    pub fn with_technologies<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.technologies = items.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the domain list
    pub fn with_domains<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.domains = items.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the methodology list
    pub fn with_methodologies<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.methodologies = items.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the theme labels
    pub fn with_themes<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = items.into_iter().map(Into::into).collect();
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status == RecordStatus::Approved
    }

    /// Year usable for year-keyed analytics: known and not after `reference_year`
    pub fn dated_year(&self, reference_year: i32) -> Option<i32> {
        self.year.filter(|year| *year <= reference_year)
    }
}

/// Compact paper reference attached to analytics outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRef {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

impl From<&AbstractRecord> for PaperRef {
    fn from(record: &AbstractRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            authors: record.authors.clone(),
            year: record.year,
        }
    }
}

/// Accept `null`, a missing value, a non-array, or an array with non-string items
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
