//! Research trend analytics over approved abstract records
//!
//! - [`frequency`] - entity occurrence counts and percentage tables
//! - [`themes`] - year-over-year theme trends and the yearly timeline
//! - [`emerging`] - emerging technology scoring and maturity tiers
//! - [`engine`] - the full recompute pass producing an [`AnalyticsSnapshot`]
//!
//! Every component is a pure function of its input snapshot. Outputs are built
//! from ordered maps and totally ordered sorts, so two passes over the same
//! records serialize identically.

pub mod emerging;
pub mod engine;
pub mod frequency;
pub mod themes;

pub use emerging::{EmergingTechDetector, EmergingTechnology, Maturity};
pub use engine::{AnalyticsEngine, AnalyticsSnapshot, CategoryFrequencies};
pub use frequency::{Aggregation, Aggregator, CategoryCounts, FrequencyEntry, FrequencyTable};
pub use themes::{
    manual_themes, Significance, ThemeFrequency, TrendClassifier, TrendDirection, TrendPeriod,
    YearOverYear,
};

use crate::models::AbstractRecord;

/// Records that take part in analytics: approved and confident enough
pub fn eligible_records(
    records: &[AbstractRecord],
    min_confidence: f64,
) -> impl Iterator<Item = &AbstractRecord> {
    records
        .iter()
        .filter(move |record| record.is_approved() && record.confidence >= min_confidence)
}

/// `part / total * 100` rounded to one decimal, 0 when `total` is 0
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(part as f64 / total as f64 * 100.0)
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
