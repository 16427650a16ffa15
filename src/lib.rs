//! trendscope - Entity normalization and research trend analytics
//!
//! Turns a corpus of reviewed research-abstract records into entity frequency
//! tables, theme trends, a year-by-year timeline, emerging-technology scores and
//! a per-record entity graph. Every pass is a pure function of one record
//! snapshot and produces byte-identical output for identical input.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`normalize`] - Lexicon-driven entity normalization
//! - [`analytics`] - Frequency, theme, timeline and emerging-technology analysis
//! - [`graph`] - Per-record entity graph model
//! - [`trigger`] - Change notifications and the background recompute worker
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use trendscope::analytics::AnalyticsEngine;
//! use trendscope::config::Config;
//! use trendscope::models::AbstractRecord;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let engine = AnalyticsEngine::from_config(&config)?;
//!     let records = vec![AbstractRecord::approved("a1", Some(2024)).with_technologies(["Python"])];
//!     let snapshot = engine.recompute(&records)?;
//!     println!("{}", serde_json::to_string_pretty(&snapshot)?);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod trigger;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analytics::{AnalyticsEngine, AnalyticsSnapshot};
    pub use crate::config::{AnalyticsConfig, Config};
    pub use crate::error::{Error, ErrorCategory, Result, TrendscopeErrorTrait};
    pub use crate::graph::{GraphModel, GraphModelBuilder};
    pub use crate::models::{AbstractRecord, EntityCategory, RecordStatus};
    pub use crate::normalize::{Lexicon, Normalizer};
    pub use crate::trigger::{
        ChangeKind, ChangeNotification, InMemoryRecordStore, RecomputeTrigger, RecomputeWorker,
        RecordSource,
    };
}

// Direct re-exports for convenience
pub use models::{AbstractRecord, EntityCategory, RecordStatus};
