//! Emerging technology detection
//!
//! Scores each technology by how many distinct papers mention it (adoption),
//! how recently it appeared, and how fast its mentions grew between the prior
//! and the reference year (potential).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{eligible_records, round1};
use crate::config::AnalyticsConfig;
use crate::models::{AbstractRecord, PaperRef};
use crate::normalize::collapse_whitespace;

/// Paper count at which adoption saturates at 100
const ADOPTION_SATURATION: f64 = 20.0;

const BASE_POTENTIAL: u32 = 80;
const RECENCY_BONUS: u32 = 10;
const GROWTH_BONUS: u32 = 10;

/// First seen within this many years of the reference year earns the recency bonus
const RECENCY_WINDOW_YEARS: i32 = 2;

/// Growth rate (percent) above which the growth bonus applies
const GROWTH_BONUS_THRESHOLD: f64 = 50.0;

/// Maturity tier by paper volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    /// At most 5 papers
    Experimental,
    /// 6 to 12 papers
    Emerging,
    /// More than 12 papers
    Growing,
}

impl Maturity {
    #[must_use]
    pub fn from_paper_count(papers: usize) -> Self {
        match papers {
            0..=5 => Self::Experimental,
            6..=12 => Self::Emerging,
            _ => Self::Growing,
        }
    }

    /// Expected time to mainstream adoption
    pub fn timeframe(&self) -> &'static str {
        match self {
            Self::Experimental => "3-5 years",
            Self::Emerging => "1-3 years",
            Self::Growing => "1-2 years",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experimental => "experimental",
            Self::Emerging => "emerging",
            Self::Growing => "growing",
        }
    }
}

/// A scored technology candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergingTechnology {
    pub name: String,
    pub maturity: Maturity,

    /// 0-100, saturating at 20 papers
    pub adoption: f64,

    /// 0-100
    pub potential: u32,

    pub timeframe: String,

    /// Number of distinct records mentioning the technology
    pub related_papers: usize,

    /// Percent change in mentions, reference year vs prior year
    pub growth_rate: f64,

    pub first_seen: Option<i32>,
    pub last_seen: Option<i32>,

    /// Contributing records, ordered by id
    pub papers: Vec<PaperRef>,
}

#[derive(Default)]
struct TechAccumulator<'a> {
    papers: BTreeMap<&'a str, &'a AbstractRecord>,
    first_seen: Option<i32>,
    last_seen: Option<i32>,
    mentions_by_year: BTreeMap<i32, u64>,
}

impl<'a> TechAccumulator<'a> {
    fn record(&mut self, record: &'a AbstractRecord, year: Option<i32>) {
        self.papers.entry(record.id.as_str()).or_insert(record);

        if let Some(year) = year {
            self.first_seen = Some(self.first_seen.map_or(year, |y| y.min(year)));
            self.last_seen = Some(self.last_seen.map_or(year, |y| y.max(year)));
            *self.mentions_by_year.entry(year).or_insert(0) += 1;
        }
    }

    fn mentions_in(&self, year: i32) -> u64 {
        self.mentions_by_year.get(&year).copied().unwrap_or(0)
    }
}

/// Growth of `current` over `previous` in percent
///
/// 100 when the technology is new this year, 0 when it has no mentions in either.
pub fn growth_rate(current: u64, previous: u64) -> f64 {
    if previous > 0 {
        (current as f64 - previous as f64) / previous as f64 * 100.0
    } else if current > 0 {
        100.0
    } else {
        0.0
    }
}

/// Scores technologies for novelty and momentum
#[derive(Debug, Clone)]
pub struct EmergingTechDetector {
    config: AnalyticsConfig,
}

impl EmergingTechDetector {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Score every technology the extractor yields
    ///
    /// Sorted by potential descending, then paper count descending, then name.
    pub fn detect<F>(&self, records: &[AbstractRecord], technology_extractor: F) -> Vec<EmergingTechnology>
    where
        F: Fn(&AbstractRecord) -> Vec<String>,
    {
        let reference_year = self.config.current_year();
        let mut technologies: BTreeMap<String, TechAccumulator<'_>> = BTreeMap::new();

        for record in eligible_records(records, self.config.min_confidence) {
            let year = record.dated_year(reference_year);
            for name in technology_extractor(record) {
                let name = collapse_whitespace(&name);
                if name.is_empty() {
                    continue;
                }
                technologies.entry(name).or_default().record(record, year);
            }
        }

        let mut detected: Vec<EmergingTechnology> = technologies
            .into_iter()
            .filter(|(_, acc)| acc.papers.len() >= self.config.min_papers)
            .map(|(name, acc)| self.score(name, acc, reference_year))
            .collect();

        detected.sort_by(|a, b| {
            b.potential
                .cmp(&a.potential)
                .then_with(|| b.related_papers.cmp(&a.related_papers))
                .then_with(|| a.name.cmp(&b.name))
        });

        tracing::debug!(
            technologies = detected.len(),
            reference_year,
            "Detected emerging technologies"
        );

        detected
    }

    fn score(&self, name: String, acc: TechAccumulator<'_>, reference_year: i32) -> EmergingTechnology {
        let paper_count = acc.papers.len();
        let maturity = Maturity::from_paper_count(paper_count);
        let adoption = (paper_count as f64 / ADOPTION_SATURATION * 100.0).min(100.0);
        let growth = growth_rate(
            acc.mentions_in(reference_year),
            acc.mentions_in(reference_year.saturating_sub(1)),
        );

        let mut potential = BASE_POTENTIAL;
        if acc
            .first_seen
            .is_some_and(|first| first >= reference_year.saturating_sub(RECENCY_WINDOW_YEARS))
        {
            potential += RECENCY_BONUS;
        }
        if growth > GROWTH_BONUS_THRESHOLD {
            potential += GROWTH_BONUS;
        }

        EmergingTechnology {
            name,
            maturity,
            adoption: round1(adoption),
            potential: potential.min(100),
            timeframe: maturity.timeframe().to_string(),
            related_papers: paper_count,
            growth_rate: round1(growth),
            first_seen: acc.first_seen,
            last_seen: acc.last_seen,
            papers: acc.papers.values().map(|record| PaperRef::from(*record)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn detector(reference_year: i32) -> EmergingTechDetector {
        EmergingTechDetector::new(
            AnalyticsConfig::builder()
                .reference_year(reference_year)
                .build()
                .unwrap(),
        )
    }

    fn tech(id: &str, year: i32, technologies: &[&str]) -> AbstractRecord {
        AbstractRecord::approved(id, Some(year)).with_technologies(technologies.iter().copied())
    }

    #[test]
    fn test_maturity_tiers() {
        assert_eq!(Maturity::from_paper_count(1), Maturity::Experimental);
        assert_eq!(Maturity::from_paper_count(5), Maturity::Experimental);
        assert_eq!(Maturity::from_paper_count(6), Maturity::Emerging);
        assert_eq!(Maturity::from_paper_count(12), Maturity::Emerging);
        assert_eq!(Maturity::from_paper_count(13), Maturity::Growing);
        assert_eq!(Maturity::Emerging.timeframe(), "1-3 years");
    }

    #[test]
    fn test_growth_rate() {
        assert_eq!(growth_rate(3, 0), 100.0);
        assert_eq!(growth_rate(0, 0), 0.0);
        assert_eq!(growth_rate(3, 2), 50.0);
        assert_eq!(growth_rate(1, 2), -50.0);
    }

    #[test]
    fn test_new_technology_scores_high() {
        let records: Vec<_> = (0..6)
            .map(|i| tech(&format!("r{i}"), 2024, &["Quantum Annealing"]))
            .collect();

        let normalizer = Normalizer::default();
        let detected = detector(2024).detect(&records, normalizer.technology_extractor());
        assert_eq!(detected.len(), 1);

        let quantum = &detected[0];
        assert_eq!(quantum.maturity, Maturity::Emerging);
        assert_eq!(quantum.growth_rate, 100.0);
        assert_eq!(quantum.adoption, 30.0);
        assert_eq!(quantum.potential, 100);
        assert_eq!(quantum.related_papers, 6);
    }

    #[test]
    fn test_paper_count_deduplicates_mentions() {
        let records = vec![tech("r1", 2024, &["Rust", "rust", "RUST"])];
        let normalizer = Normalizer::default();
        let detected = detector(2024).detect(&records, normalizer.technology_extractor());
        assert_eq!(detected[0].related_papers, 1);
        assert_eq!(detected[0].papers.len(), 1);
    }

    #[test]
    fn test_old_declining_technology() {
        let records = vec![
            tech("r1", 2018, &["cobol"]),
            tech("r2", 2023, &["cobol"]),
            tech("r3", 2023, &["cobol"]),
            tech("r4", 2024, &["cobol"]),
        ];

        let detected = detector(2024).detect(&records, |r| r.entities.technologies.clone());
        let cobol = &detected[0];
        assert_eq!(cobol.first_seen, Some(2018));
        assert_eq!(cobol.last_seen, Some(2024));
        assert_eq!(cobol.growth_rate, -50.0);
        assert_eq!(cobol.potential, 80);
    }

    #[test]
    fn test_adoption_caps_at_100() {
        let records: Vec<_> = (0..25)
            .map(|i| tech(&format!("r{i:02}"), 2020, &["python"]))
            .collect();
        let detected = detector(2024).detect(&records, |r| r.entities.technologies.clone());
        assert_eq!(detected[0].adoption, 100.0);
        assert_eq!(detected[0].maturity, Maturity::Growing);
        assert_eq!(detected[0].growth_rate, 0.0);
    }

    #[test]
    fn test_ordering_by_potential_then_papers() {
        let records = vec![
            tech("r1", 2015, &["old"]),
            tech("r2", 2015, &["old"]),
            tech("r3", 2024, &["fresh"]),
            tech("r4", 2024, &["newer", "fresh"]),
        ];

        let detected = detector(2024).detect(&records, |r| r.entities.technologies.clone());
        let names: Vec<_> = detected.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fresh", "newer", "old"]);
    }

    #[test]
    fn test_min_papers_filter() {
        let config = AnalyticsConfig::builder()
            .reference_year(2024)
            .min_papers(2)
            .build()
            .unwrap();
        let records = vec![tech("r1", 2024, &["solo"]), tech("r2", 2024, &["duo"]), tech("r3", 2024, &["duo"])];

        let detected = EmergingTechDetector::new(config).detect(&records, |r| r.entities.technologies.clone());
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].name, "duo");
    }

    #[test]
    fn test_extreme_reference_year_does_not_overflow() {
        let config = AnalyticsConfig::builder()
            .reference_year(i32::MIN)
            .build_unchecked();
        let records = vec![tech("r1", i32::MIN, &["rust"])];

        let detected = EmergingTechDetector::new(config).detect(&records, |r| r.entities.technologies.clone());
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].first_seen, Some(i32::MIN));
    }

    #[test]
    fn test_empty_input() {
        let detected = detector(2024).detect(&[], |r| r.entities.technologies.clone());
        assert!(detected.is_empty());
    }
}
