//! Full analytics recompute pass
//!
//! [`AnalyticsEngine::recompute`] is the single entry point invoked whenever
//! the record store reports a change. It validates the snapshot, pins the
//! reference year for the whole pass, and runs every component from scratch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use super::emerging::{EmergingTechDetector, EmergingTechnology};
use super::frequency::{Aggregator, FrequencyEntry};
use super::themes::{manual_themes, ThemeFrequency, TrendClassifier, TrendPeriod};
use super::eligible_records;
use crate::config::{AnalyticsConfig, Config};
use crate::error::{Error, Result};
use crate::graph::{GraphModel, GraphModelBuilder, NODE_ID_SEPARATOR};
use crate::metrics;
use crate::models::{AbstractRecord, EntityCategory};
use crate::normalize::{Lexicon, Normalizer};

/// Per-category frequency tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFrequencies {
    pub technologies: Vec<FrequencyEntry>,
    pub domains: Vec<FrequencyEntry>,
    pub methodologies: Vec<FrequencyEntry>,
}

/// Every analytics output derived from one record snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub reference_year: i32,
    pub lexicon_version: String,
    pub eligible_records: usize,

    /// Full frequency table, untruncated
    pub frequencies: Vec<FrequencyEntry>,
    pub category_frequencies: CategoryFrequencies,

    pub themes: Vec<ThemeFrequency>,
    pub timeline: Vec<TrendPeriod>,
    pub emerging: Vec<EmergingTechnology>,

    /// Disjoint per-record subgraphs of all eligible records
    pub graph: GraphModel,
}

/// Runs the normalization and analytics pipeline
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
    normalizer: Normalizer,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig, lexicon: Lexicon) -> Self {
        Self {
            config,
            normalizer: Normalizer::new(lexicon),
        }
    }

    /// Build an engine from full configuration, loading the configured lexicon
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let lexicon = config.lexicon.load()?;
        Ok(Self::new(config.analytics.clone(), lexicon))
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Reject snapshots that would silently corrupt analytics
    pub fn validate(&self, records: &[AbstractRecord]) -> Result<()> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(records.len());

        for record in records {
            if record.id.trim().is_empty() {
                return Err(Error::invalid_record(&record.id, "empty record id"));
            }
            if record.id.contains(NODE_ID_SEPARATOR) {
                return Err(Error::invalid_record(
                    &record.id,
                    format!("record id contains reserved character '{NODE_ID_SEPARATOR}'"),
                ));
            }
            if !ids.insert(record.id.as_str()) {
                return Err(Error::invalid_record(&record.id, "duplicate record id"));
            }
            if !(0.0..=1.0).contains(&record.confidence) {
                return Err(Error::invalid_record(
                    &record.id,
                    format!("confidence {} outside [0, 1]", record.confidence),
                ));
            }
        }

        Ok(())
    }

    /// Recompute every analytics output from a complete record snapshot
    ///
    /// The snapshot must contain every eligible record; percentages and trends
    /// are relative to what is passed in. Record ids must be non-empty, unique
    /// and free of [`NODE_ID_SEPARATOR`], which entity node ids reserve.
    pub fn recompute(&self, records: &[AbstractRecord]) -> Result<AnalyticsSnapshot> {
        let start = Instant::now();
        let result = self.run_pass(records);

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(snapshot) => {
                metrics::record_recompute(elapsed, snapshot.eligible_records);
                tracing::info!(
                    records = records.len(),
                    eligible = snapshot.eligible_records,
                    entities = snapshot.frequencies.len(),
                    themes = snapshot.themes.len(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Analytics recomputed"
                );
            }
            Err(e) => {
                metrics::record_recompute_failure();
                tracing::warn!(error = %e, records = records.len(), "Analytics recompute failed");
            }
        }

        result
    }

    fn run_pass(&self, records: &[AbstractRecord]) -> Result<AnalyticsSnapshot> {
        self.validate(records)?;

        // One reference year for every component of this pass
        let reference_year = self.config.current_year();
        let config = AnalyticsConfig {
            reference_year: Some(reference_year),
            ..self.config.clone()
        };

        let eligible: Vec<AbstractRecord> = eligible_records(records, config.min_confidence)
            .cloned()
            .collect();

        let aggregation = Aggregator::new(self.normalizer.clone(), &config).aggregate(&eligible);

        let classifier = TrendClassifier::new(self.normalizer.clone(), config.clone());
        let themes = classifier.classify(&eligible, manual_themes);
        let timeline = classifier.build_timeline(&eligible, manual_themes);

        let emerging = EmergingTechDetector::new(config)
            .detect(&eligible, self.normalizer.technology_extractor());

        let graph = GraphModelBuilder::new(self.normalizer.clone()).build_batch(&eligible)?;

        Ok(AnalyticsSnapshot {
            reference_year,
            lexicon_version: self.normalizer.lexicon().version().to_string(),
            eligible_records: eligible.len(),
            frequencies: aggregation.frequency_table().into_entries(),
            category_frequencies: CategoryFrequencies {
                technologies: aggregation
                    .category_table(EntityCategory::Technology)
                    .into_entries(),
                domains: aggregation.category_table(EntityCategory::Domain).into_entries(),
                methodologies: aggregation
                    .category_table(EntityCategory::Methodology)
                    .into_entries(),
            },
            themes,
            timeline,
            emerging,
            graph,
        })
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default(), Lexicon::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(
            AnalyticsConfig::builder().reference_year(2024).build().unwrap(),
            Lexicon::builtin(),
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = engine().recompute(&[]).unwrap();
        assert_eq!(snapshot.eligible_records, 0);
        assert!(snapshot.frequencies.is_empty());
        assert!(snapshot.themes.is_empty());
        assert!(snapshot.timeline.is_empty());
        assert!(snapshot.emerging.is_empty());
        assert!(snapshot.graph.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            AbstractRecord::approved("a1", Some(2024)),
            AbstractRecord::approved("a1", Some(2024)),
        ];
        let err = engine().recompute(&records).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { .. }));
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let mut record = AbstractRecord::approved("a1", Some(2024));
        record.confidence = 1.5;
        assert!(engine().recompute(&[record]).is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let record = AbstractRecord::approved("  ", Some(2024));
        assert!(engine().validate(&[record]).is_err());
    }

    #[test]
    fn test_reserved_separator_in_id_rejected() {
        let records = vec![
            AbstractRecord::approved("sub", Some(2024)).with_technologies(["Rust"]),
            AbstractRecord::approved("sub#e0", Some(2024)),
        ];
        let err = engine().recompute(&records).unwrap_err();
        match err {
            Error::InvalidRecord { id, reason } => {
                assert_eq!(id, "sub#e0");
                assert!(reason.contains('#'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_graph_only_covers_eligible_records() {
        let mut pending = AbstractRecord::approved("p1", Some(2024)).with_technologies(["Rust"]);
        pending.status = RecordStatus::Pending;
        let records = vec![
            pending,
            AbstractRecord::approved("a1", Some(2024)).with_technologies(["Rust"]),
        ];

        let snapshot = engine().recompute(&records).unwrap();
        assert_eq!(snapshot.eligible_records, 1);
        assert!(snapshot.graph.node("p1").is_none());
        assert!(snapshot.graph.node("a1").is_some());
    }

    #[test]
    fn test_reference_year_pinned() {
        let snapshot = engine().recompute(&[]).unwrap();
        assert_eq!(snapshot.reference_year, 2024);
    }
}
