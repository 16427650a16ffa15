//! Common test utilities

use trendscope::analytics::AnalyticsEngine;
use trendscope::config::AnalyticsConfig;
use trendscope::models::{AbstractRecord, RecordStatus};
use trendscope::normalize::Lexicon;

/// Reference year pinned for every fixture
pub const REFERENCE_YEAR: i32 = 2024;

/// Engine with the built-in lexicon and the fixture reference year
#[allow(dead_code)]
pub fn engine() -> AnalyticsEngine {
    AnalyticsEngine::new(config(), Lexicon::builtin())
}

#[allow(dead_code)]
pub fn config() -> AnalyticsConfig {
    AnalyticsConfig::builder()
        .reference_year(REFERENCE_YEAR)
        .build()
        .unwrap()
}

/// Approved record with technologies only
#[allow(dead_code)]
pub fn tech_record(id: &str, year: i32, technologies: &[&str]) -> AbstractRecord {
    AbstractRecord::approved(id, Some(year)).with_technologies(technologies.iter().copied())
}

/// Approved record with themes and domains
#[allow(dead_code)]
pub fn themed_record(id: &str, year: i32, themes: &[&str], domains: &[&str]) -> AbstractRecord {
    AbstractRecord::approved(id, Some(year))
        .with_themes(themes.iter().copied())
        .with_domains(domains.iter().copied())
}

/// Small mixed corpus covering every category, status and edge case
#[allow(dead_code)]
pub fn sample_corpus() -> Vec<AbstractRecord> {
    let mut pending = tech_record("p-pending", 2024, &["Rust"]);
    pending.status = RecordStatus::Pending;

    let mut rejected = tech_record("p-rejected", 2024, &["Rust"]);
    rejected.status = RecordStatus::Rejected;

    vec![
        AbstractRecord::approved("p1", Some(2022))
            .with_title("Deep nets for crops")
            .with_technologies(["Deep Learning", "Python"])
            .with_domains(["Agriculture"])
            .with_methodologies(["Case Study"])
            .with_themes(["Food Security"]),
        AbstractRecord::approved("p2", Some(2023))
            .with_title("ML in clinics")
            .with_technologies(["machine learning", "python ", "N/A"])
            .with_domains(["Healthcare"])
            .with_methodologies(["RCT"])
            .with_themes(["Digital Health", "Food Security"]),
        AbstractRecord::approved("p3", Some(2024))
            .with_title("Transformers for triage")
            .with_technologies(["ML", "LLMs", "Python"])
            .with_domains(["Healthcare", "healthcare"])
            .with_methodologies(["Systematic Review"])
            .with_themes(["Digital Health"]),
        AbstractRecord::approved("p4", Some(2024))
            .with_technologies(["A.I.", "IoT"])
            .with_domains(["Agriculture"])
            .with_themes(["Digital Health", "Smart Farming"]),
        AbstractRecord::approved("p5", None)
            .with_technologies(["Blockchain"])
            .with_themes(["Supply Chains"]),
        AbstractRecord::approved("p6", Some(2031))
            .with_technologies(["Quantum Annealing"])
            .with_themes(["Smart Farming"]),
        pending,
        rejected,
    ]
}
