use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use trendscope::analytics::AnalyticsEngine;
use trendscope::config::Config;
use trendscope::graph::GraphModelBuilder;
use trendscope::models::EntityCategory;

use super::{load_records, write_output};

/// Options shared by every command that builds an engine
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// TOML configuration file (defaults to TRENDSCOPE_* environment variables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// TOML lexicon file overriding the configured one
    #[arg(long, global = true)]
    pub lexicon: Option<PathBuf>,

    /// Pin the reference year instead of using the current year
    #[arg(long, global = true)]
    pub reference_year: Option<i32>,
}

impl EngineArgs {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };

        if let Some(path) = &self.lexicon {
            config.lexicon.path = Some(path.clone());
        }
        if let Some(year) = self.reference_year {
            config.analytics.reference_year = Some(year);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn engine(&self) -> Result<AnalyticsEngine> {
        build_engine(&self.load_config()?)
    }
}

pub fn build_engine(config: &Config) -> Result<AnalyticsEngine> {
    let engine =
        AnalyticsEngine::from_config(config).context("Failed to build analytics engine")?;
    tracing::info!(
        lexicon_version = engine.normalizer().lexicon().version(),
        aliases = engine.normalizer().lexicon().alias_count(),
        "Analytics engine ready"
    );
    Ok(engine)
}

/// Entity category filter for the frequency table
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Technology,
    Domain,
    Methodology,
}

impl From<CategoryArg> for EntityCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Technology => Self::Technology,
            CategoryArg::Domain => Self::Domain,
            CategoryArg::Methodology => Self::Methodology,
        }
    }
}

pub fn analyze(
    input: PathBuf,
    output: Option<PathBuf>,
    compact: bool,
    args: &EngineArgs,
) -> Result<()> {
    let engine = args.engine()?;
    let records = load_records(&input)?;

    let snapshot = engine
        .recompute(&records)
        .context("Analytics recompute failed")?;

    let json = if compact {
        serde_json::to_string(&snapshot)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };

    write_output(output.as_deref(), &json)
}

pub fn frequencies(
    input: PathBuf,
    top: Option<usize>,
    category: Option<CategoryArg>,
    args: &EngineArgs,
) -> Result<()> {
    let engine = args.engine()?;
    let records = load_records(&input)?;
    let snapshot = engine
        .recompute(&records)
        .context("Analytics recompute failed")?;

    let table = match category.map(EntityCategory::from) {
        None => &snapshot.frequencies,
        Some(EntityCategory::Technology) => &snapshot.category_frequencies.technologies,
        Some(EntityCategory::Domain) => &snapshot.category_frequencies.domains,
        Some(EntityCategory::Methodology) => &snapshot.category_frequencies.methodologies,
    };
    let top = top.unwrap_or(engine.config().top_k);

    println!("{:>4}  {:<40} {:>7} {:>7}", "#", "entity", "count", "%");
    for (rank, entry) in table.iter().take(top).enumerate() {
        println!(
            "{:>4}  {:<40} {:>7} {:>6.1}%",
            rank + 1,
            entry.entity,
            entry.count,
            entry.percentage
        );
    }
    println!(
        "{} of {} entities, {} eligible records",
        table.len().min(top),
        table.len(),
        snapshot.eligible_records
    );

    Ok(())
}

pub fn graph(
    input: PathBuf,
    record_id: Option<String>,
    output: Option<PathBuf>,
    args: &EngineArgs,
) -> Result<()> {
    let engine = args.engine()?;
    let records = load_records(&input)?;

    let model = match record_id {
        Some(id) => {
            let record = records
                .iter()
                .find(|record| record.id == id)
                .with_context(|| format!("Record not found: {id}"))?;
            GraphModelBuilder::new(engine.normalizer().clone()).build(record)
        }
        None => {
            engine
                .recompute(&records)
                .context("Analytics recompute failed")?
                .graph
        }
    };

    tracing::info!(
        nodes = model.nodes.len(),
        edges = model.edges.len(),
        "Graph model built"
    );

    write_output(output.as_deref(), &serde_json::to_string_pretty(&model)?)
}
