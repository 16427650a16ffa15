//! Theme trend classification and yearly timeline
//!
//! Themes come from a caller-supplied extractor (manual labels, normalized
//! technologies, ...). A record contributes to every theme its extractor
//! yields; records without themes still count toward the corpus size used for
//! percentages.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{eligible_records, percentage};
use crate::config::AnalyticsConfig;
use crate::models::AbstractRecord;
use crate::normalize::{collapse_whitespace, Normalizer};

/// Number of related domains reported per theme
const RELATED_DOMAIN_LIMIT: usize = 5;

/// Growth beyond which a theme counts as rising or falling (percent)
const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Year-over-year direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

/// Significance tier derived from theme frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

impl Significance {
    /// Classify a frequency against the `high` and `medium` thresholds
    #[must_use]
    pub fn from_frequency(frequency: u64, high: usize, medium: usize) -> Self {
        if frequency >= high as u64 {
            Self::High
        } else if frequency >= medium as u64 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Comparison of a reference-year count with the prior year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearOverYear {
    pub current: u64,
    pub prior: u64,
    pub growth_pct: f64,
    pub direction: TrendDirection,
    /// Signed whole-percent label, e.g. "+6%", "-100%", "0%"
    pub growth: String,
}

impl YearOverYear {
    /// Classify the change from `prior` to `current`
    ///
    /// # Classification
    /// - both zero: `stable`, "0%"
    /// - `prior == 0`: `up`, "+100%"
    /// - `current == 0`: `down`, "-100%"
    /// - otherwise growth > 5%: `up`, growth < -5%: `down`, else `stable`
    #[must_use]
    pub fn classify(current: u64, prior: u64) -> Self {
        let (growth_pct, direction) = match (current, prior) {
            (0, 0) => (0.0, TrendDirection::Stable),
            (_, 0) => (100.0, TrendDirection::Up),
            (0, _) => (-100.0, TrendDirection::Down),
            _ => {
                let growth = (current as f64 - prior as f64) / prior as f64 * 100.0;
                let direction = if growth > TREND_THRESHOLD_PCT {
                    TrendDirection::Up
                } else if growth < -TREND_THRESHOLD_PCT {
                    TrendDirection::Down
                } else {
                    TrendDirection::Stable
                };
                (growth, direction)
            }
        };

        Self {
            current,
            prior,
            growth_pct,
            direction,
            growth: format_growth(growth_pct),
        }
    }
}

fn format_growth(growth_pct: f64) -> String {
    let rounded = growth_pct.round() as i64;
    match rounded {
        r if r > 0 => format!("+{r}%"),
        0 => "0%".to_string(),
        r => format!("{r}%"),
    }
}

/// Aggregated statistics for one theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeFrequency {
    pub theme: String,

    /// Number of (record, theme) occurrences yielded by the extractor
    pub frequency: u64,

    /// Distinct records carrying the theme
    pub unique_papers: usize,

    /// Share of the eligible corpus carrying the theme
    pub percentage: f64,

    pub trend: TrendDirection,
    pub growth: String,
    pub significance: Significance,

    /// Record ids, ascending
    pub papers: Vec<String>,

    /// Most frequent normalized domains among the theme's records
    pub related_domains: Vec<String>,
}

/// One year of the research timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPeriod {
    pub period: i32,

    /// Top themes of the year, most frequent first
    pub topics: Vec<String>,

    pub total_papers: usize,

    /// Rank-1 topic, absent when no record that year has a theme
    pub dominant_theme: Option<String>,

    pub papers: BTreeSet<String>,
}

#[derive(Default)]
struct ThemeAccumulator {
    frequency: u64,
    papers: BTreeSet<String>,
    current: BTreeSet<String>,
    prior: BTreeSet<String>,
    domains: BTreeMap<String, u64>,
}

#[derive(Default)]
struct YearBucket {
    papers: BTreeSet<String>,
    themes: BTreeMap<String, u64>,
}

/// Manual theme labels of a record, trimmed, blanks skipped
pub fn manual_themes(record: &AbstractRecord) -> Vec<String> {
    record
        .themes
        .iter()
        .map(|theme| collapse_whitespace(theme))
        .filter(|theme| !theme.is_empty())
        .collect()
}

/// Classifies theme trends and builds the yearly timeline
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    normalizer: Normalizer,
    config: AnalyticsConfig,
}

impl TrendClassifier {
    pub fn new(normalizer: Normalizer, config: AnalyticsConfig) -> Self {
        Self { normalizer, config }
    }

    /// Per-theme frequency, trend, and significance
    ///
    /// Output is ordered by frequency descending, then theme ascending.
    pub fn classify<F>(&self, records: &[AbstractRecord], theme_extractor: F) -> Vec<ThemeFrequency>
    where
        F: Fn(&AbstractRecord) -> Vec<String>,
    {
        let reference_year = self.config.current_year();
        let mut corpus = 0u64;
        let mut themes: BTreeMap<String, ThemeAccumulator> = BTreeMap::new();

        for record in eligible_records(records, self.config.min_confidence) {
            corpus += 1;
            let year = record.dated_year(reference_year);

            for theme in theme_extractor(record) {
                let theme = collapse_whitespace(&theme);
                if theme.is_empty() {
                    continue;
                }

                let acc = themes.entry(theme).or_default();
                acc.frequency += 1;

                if acc.papers.insert(record.id.clone()) {
                    for domain in self.normalizer.domain_extractor()(record) {
                        *acc.domains.entry(domain).or_insert(0) += 1;
                    }
                }

                match year {
                    Some(y) if y == reference_year => {
                        acc.current.insert(record.id.clone());
                    }
                    Some(y) if y == reference_year.saturating_sub(1) => {
                        acc.prior.insert(record.id.clone());
                    }
                    _ => {}
                }
            }
        }

        let mut results: Vec<ThemeFrequency> = themes
            .into_iter()
            .map(|(theme, acc)| {
                let yoy = YearOverYear::classify(acc.current.len() as u64, acc.prior.len() as u64);
                ThemeFrequency {
                    theme,
                    frequency: acc.frequency,
                    unique_papers: acc.papers.len(),
                    percentage: percentage(acc.papers.len() as u64, corpus),
                    trend: yoy.direction,
                    growth: yoy.growth,
                    significance: Significance::from_frequency(
                        acc.frequency,
                        self.config.significance_high,
                        self.config.significance_medium,
                    ),
                    papers: acc.papers.into_iter().collect(),
                    related_domains: top_ranked(&acc.domains, RELATED_DOMAIN_LIMIT),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.theme.cmp(&b.theme))
        });

        tracing::debug!(
            corpus,
            themes = results.len(),
            reference_year,
            "Classified theme trends"
        );

        results
    }

    /// Records grouped by year with each year's top themes
    ///
    /// Only records with a known year not after the reference year are placed
    /// on the timeline. Years without records are omitted.
    pub fn build_timeline<F>(&self, records: &[AbstractRecord], theme_extractor: F) -> Vec<TrendPeriod>
    where
        F: Fn(&AbstractRecord) -> Vec<String>,
    {
        let reference_year = self.config.current_year();
        let mut years: BTreeMap<i32, YearBucket> = BTreeMap::new();

        for record in eligible_records(records, self.config.min_confidence) {
            let Some(year) = record.dated_year(reference_year) else {
                continue;
            };

            let bucket = years.entry(year).or_default();
            bucket.papers.insert(record.id.clone());

            // A label repeated within one record counts that record once
            let labels: BTreeSet<String> = theme_extractor(record)
                .iter()
                .map(|theme| collapse_whitespace(theme))
                .filter(|theme| !theme.is_empty())
                .collect();
            for theme in labels {
                *bucket.themes.entry(theme).or_insert(0) += 1;
            }
        }

        years
            .into_iter()
            .map(|(period, bucket)| {
                let topics = top_ranked(&bucket.themes, self.config.timeline_top_n);
                TrendPeriod {
                    period,
                    dominant_theme: topics.first().cloned(),
                    topics,
                    total_papers: bucket.papers.len(),
                    papers: bucket.papers,
                }
            })
            .collect()
    }
}

/// Keys ranked by count descending, then name ascending
fn top_ranked(counts: &BTreeMap<String, u64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, &u64)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.clone())
        .collect()
}
