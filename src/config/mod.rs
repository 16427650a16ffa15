//! Configuration management for trendscope
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::normalize::Lexicon;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analytics thresholds and presentation limits
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Lexicon source
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Recompute trigger settings
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Accepted range for a pinned reference year
pub const MIN_REFERENCE_YEAR: i32 = 1;
pub const MAX_REFERENCE_YEAR: i32 = 9999;

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Year treated as "current" by trend and emerging analytics (None = this UTC year)
    pub reference_year: Option<i32>,

    /// Rows kept by top-K presentation of frequency tables
    pub top_k: usize,

    /// Topics listed per timeline period
    pub timeline_top_n: usize,

    /// Minimum theme frequency for `high` significance
    pub significance_high: usize,

    /// Minimum theme frequency for `medium` significance
    pub significance_medium: usize,

    /// Records below this extraction confidence are not analyzed
    pub min_confidence: f64,

    /// Technologies with fewer papers are not reported as emerging
    pub min_papers: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            reference_year: None,
            top_k: 15,
            timeline_top_n: 5,
            significance_high: 10,
            significance_medium: 5,
            min_confidence: 0.0,
            min_papers: 1,
        }
    }
}

impl AnalyticsConfig {
    /// Create a new builder for AnalyticsConfig
    pub fn builder() -> AnalyticsConfigBuilder {
        AnalyticsConfigBuilder::default()
    }

    /// Resolve the reference year
    pub fn current_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(year) = self.reference_year {
            if !(MIN_REFERENCE_YEAR..=MAX_REFERENCE_YEAR).contains(&year) {
                anyhow::bail!(
                    "reference_year must be between {MIN_REFERENCE_YEAR} and {MAX_REFERENCE_YEAR}"
                );
            }
        }

        if self.timeline_top_n == 0 || self.timeline_top_n > 5 {
            anyhow::bail!("timeline_top_n must be between 1 and 5");
        }

        if self.significance_medium > self.significance_high {
            anyhow::bail!("significance_medium must not exceed significance_high");
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            anyhow::bail!("min_confidence must be between 0.0 and 1.0");
        }

        Ok(())
    }
}

/// Builder for AnalyticsConfig with fluent API
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfigBuilder {
    reference_year: Option<i32>,
    top_k: Option<usize>,
    timeline_top_n: Option<usize>,
    significance_high: Option<usize>,
    significance_medium: Option<usize>,
    min_confidence: Option<f64>,
    min_papers: Option<usize>,
}

impl AnalyticsConfigBuilder {
    /// Pin the reference year
    pub fn reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    pub fn timeline_top_n(mut self, n: usize) -> Self {
        self.timeline_top_n = Some(n);
        self
    }

    /// Set the `high` and `medium` significance thresholds
    pub fn significance(mut self, high: usize, medium: usize) -> Self {
        self.significance_high = Some(high);
        self.significance_medium = Some(medium);
        self
    }

    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    pub fn min_papers(mut self, papers: usize) -> Self {
        self.min_papers = Some(papers);
        self
    }

    /// Build the config with validation
    pub fn build(self) -> Result<AnalyticsConfig> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation
    pub fn build_unchecked(self) -> AnalyticsConfig {
        let defaults = AnalyticsConfig::default();
        AnalyticsConfig {
            reference_year: self.reference_year,
            top_k: self.top_k.unwrap_or(defaults.top_k),
            timeline_top_n: self.timeline_top_n.unwrap_or(defaults.timeline_top_n),
            significance_high: self.significance_high.unwrap_or(defaults.significance_high),
            significance_medium: self
                .significance_medium
                .unwrap_or(defaults.significance_medium),
            min_confidence: self.min_confidence.unwrap_or(defaults.min_confidence),
            min_papers: self.min_papers.unwrap_or(defaults.min_papers),
        }
    }
}

/// Lexicon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// TOML lexicon file; the built-in lexicon is used when unset
    pub path: Option<PathBuf>,
}

impl LexiconConfig {
    /// Load the configured lexicon
    pub fn load(&self) -> Result<Lexicon> {
        match &self.path {
            Some(path) => Lexicon::from_file(path)
                .with_context(|| format!("Failed to load lexicon: {}", path.display())),
            None => Ok(Lexicon::builtin()),
        }
    }
}

/// Recompute trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Capacity of the change-notification channel
    pub channel_capacity: usize,

    /// Poll interval for file-backed record sources, in seconds
    pub poll_interval_secs: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            poll_interval_secs: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = AnalyticsConfig::default();

        let reference_year = std::env::var("TRENDSCOPE_REFERENCE_YEAR")
            .ok()
            .and_then(|v| v.parse::<i32>().ok());

        let top_k = std::env::var("TRENDSCOPE_TOP_K")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.top_k);

        let min_confidence = std::env::var("TRENDSCOPE_MIN_CONFIDENCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(defaults.min_confidence);

        let lexicon_path = std::env::var("TRENDSCOPE_LEXICON").ok().map(PathBuf::from);

        let log_level =
            std::env::var("TRENDSCOPE_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("TRENDSCOPE_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            analytics: AnalyticsConfig {
                reference_year,
                top_k,
                min_confidence,
                ..defaults
            },
            lexicon: LexiconConfig { path: lexicon_path },
            trigger: TriggerConfig::default(),
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.analytics.validate()?;

        if self.trigger.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be greater than 0");
        }

        if self.trigger.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than 0");
        }

        Ok(())
    }
}
