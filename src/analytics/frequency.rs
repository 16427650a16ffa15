//! Entity frequency aggregation
//!
//! Every normalized entity occurrence in every eligible record is counted;
//! occurrences are never deduplicated, so an entity named in five records (or
//! twice in one) is counted five (or two) times. Top-K truncation is left to
//! the caller via [`FrequencyTable::top`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{eligible_records, percentage};
use crate::config::AnalyticsConfig;
use crate::models::{AbstractRecord, EntityCategory};
use crate::normalize::Normalizer;

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyEntry {
    pub entity: String,
    pub count: u64,
    /// Share of all counted occurrences, rounded to one decimal
    pub percentage: f64,
}

/// Frequency rows sorted by count descending, then entity ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
    total: u64,
}

impl FrequencyTable {
    /// Build a sorted table from raw counts
    pub fn from_counts(counts: &BTreeMap<String, u64>) -> Self {
        let total: u64 = counts.values().sum();

        let mut entries: Vec<FrequencyEntry> = counts
            .iter()
            .map(|(entity, &count)| FrequencyEntry {
                entity: entity.clone(),
                count,
                percentage: percentage(count, total),
            })
            .collect();

        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.entity.cmp(&b.entity)));

        Self { entries, total }
    }

    /// All rows
    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<FrequencyEntry> {
        self.entries
    }

    /// The first `k` rows
    pub fn top(&self, k: usize) -> &[FrequencyEntry] {
        &self.entries[..k.min(self.entries.len())]
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one entity's row
    pub fn get(&self, entity: &str) -> Option<&FrequencyEntry> {
        self.entries.iter().find(|entry| entry.entity == entity)
    }
}

/// Occurrence counts split by entity category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub technologies: BTreeMap<String, u64>,
    pub domains: BTreeMap<String, u64>,
    pub methodologies: BTreeMap<String, u64>,
}

impl CategoryCounts {
    pub fn get(&self, category: EntityCategory) -> &BTreeMap<String, u64> {
        match category {
            EntityCategory::Technology => &self.technologies,
            EntityCategory::Domain => &self.domains,
            EntityCategory::Methodology => &self.methodologies,
        }
    }

    fn get_mut(&mut self, category: EntityCategory) -> &mut BTreeMap<String, u64> {
        match category {
            EntityCategory::Technology => &mut self.technologies,
            EntityCategory::Domain => &mut self.domains,
            EntityCategory::Methodology => &mut self.methodologies,
        }
    }
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Occurrences per normalized entity, across categories
    pub per_entity: BTreeMap<String, u64>,

    pub per_category: CategoryCounts,

    /// Total kept occurrences
    pub total: u64,

    /// Number of records that were aggregated
    pub records: usize,
}

impl Aggregation {
    /// Global frequency table
    pub fn frequency_table(&self) -> FrequencyTable {
        FrequencyTable::from_counts(&self.per_entity)
    }

    /// Frequency table for one category; percentages are relative to that category
    pub fn category_table(&self, category: EntityCategory) -> FrequencyTable {
        FrequencyTable::from_counts(self.per_category.get(category))
    }
}

/// Counts entity occurrences across a record set
#[derive(Debug, Clone)]
pub struct Aggregator {
    normalizer: Normalizer,
    min_confidence: f64,
}

impl Aggregator {
    pub fn new(normalizer: Normalizer, config: &AnalyticsConfig) -> Self {
        Self {
            normalizer,
            min_confidence: config.min_confidence,
        }
    }

    /// Count every normalized, non-false-positive entity occurrence
    pub fn aggregate(&self, records: &[AbstractRecord]) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for record in eligible_records(records, self.min_confidence) {
            aggregation.records += 1;

            for (category, raw) in record.entities.iter() {
                let Some(entity) = self.normalizer.normalize(raw, true) else {
                    continue;
                };

                *aggregation
                    .per_category
                    .get_mut(category)
                    .entry(entity.clone())
                    .or_insert(0) += 1;
                *aggregation.per_entity.entry(entity).or_insert(0) += 1;
                aggregation.total += 1;
            }
        }

        tracing::debug!(
            records = aggregation.records,
            entities = aggregation.per_entity.len(),
            occurrences = aggregation.total,
            "Aggregated entity frequencies"
        );

        aggregation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;

    fn aggregator() -> Aggregator {
        Aggregator::new(Normalizer::default(), &AnalyticsConfig::default())
    }

    #[test]
    fn test_occurrences_not_deduplicated() {
        let records = vec![
            AbstractRecord::approved("a1", Some(2023)).with_technologies(["Python"]),
            AbstractRecord::approved("a2", Some(2024)).with_technologies(["python", "Python "]),
        ];

        let aggregation = aggregator().aggregate(&records);
        assert_eq!(aggregation.per_entity.get("python"), Some(&3));
        assert_eq!(aggregation.total, 3);
        assert_eq!(aggregation.records, 2);
    }

    #[test]
    fn test_only_approved_records_counted() {
        let mut rejected = AbstractRecord::approved("r1", Some(2024)).with_technologies(["Rust"]);
        rejected.status = RecordStatus::Rejected;

        let records = vec![
            rejected,
            AbstractRecord::approved("a1", Some(2024)).with_technologies(["Go"]),
        ];

        let aggregation = aggregator().aggregate(&records);
        assert!(!aggregation.per_entity.contains_key("rust"));
        assert_eq!(aggregation.per_entity.get("go"), Some(&1));
    }

    #[test]
    fn test_false_positives_and_blanks_dropped() {
        let records = vec![AbstractRecord::approved("a1", Some(2024))
            .with_technologies(["N/A", "  ", "Rust"])
            .with_domains(["Smith et al."])];

        let aggregation = aggregator().aggregate(&records);
        assert_eq!(aggregation.total, 1);
        assert_eq!(aggregation.per_entity.len(), 1);
    }

    #[test]
    fn test_per_category_counts() {
        let records = vec![AbstractRecord::approved("a1", Some(2024))
            .with_technologies(["ML", "Rust"])
            .with_domains(["Healthcare"])
            .with_methodologies(["Case Study"])];

        let aggregation = aggregator().aggregate(&records);
        assert_eq!(aggregation.per_category.technologies.get("Machine Learning"), Some(&1));
        assert_eq!(aggregation.per_category.domains.get("healthcare"), Some(&1));
        assert_eq!(aggregation.per_category.methodologies.get("case study"), Some(&1));

        let table = aggregation.category_table(EntityCategory::Technology);
        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 2);
    }

    #[test]
    fn test_table_sorting_and_percentages() {
        let records = vec![
            AbstractRecord::approved("a1", Some(2024)).with_technologies(["Rust", "Go", "Zig"]),
            AbstractRecord::approved("a2", Some(2024)).with_technologies(["Rust"]),
        ];

        let table = aggregator().aggregate(&records).frequency_table();
        let names: Vec<_> = table.entries().iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(names, vec!["rust", "go", "zig"]);
        assert_eq!(table.entries()[0].percentage, 50.0);
        assert_eq!(table.entries()[1].percentage, 25.0);
        assert_eq!(table.top(2).len(), 2);
        assert_eq!(table.top(10).len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let aggregation = aggregator().aggregate(&[]);
        assert_eq!(aggregation.total, 0);
        let table = aggregation.frequency_table();
        assert!(table.is_empty());
        assert_eq!(table.top(15).len(), 0);
    }
}
