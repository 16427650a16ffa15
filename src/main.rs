use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CategoryArg, EngineArgs};

#[derive(Parser)]
#[command(
    name = "trendscope",
    version,
    about = "Entity normalization and research trend analytics",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    engine: EngineArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full analytics pass and print the snapshot as JSON
    Analyze {
        /// JSON file containing an array of records
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit compact instead of pretty-printed JSON
        #[arg(long, default_value = "false")]
        compact: bool,
    },

    /// Print the entity frequency table
    Frequencies {
        /// JSON file containing an array of records
        #[arg(short, long)]
        input: PathBuf,

        /// Number of entries to show (defaults to the configured top_k)
        #[arg(short, long)]
        top: Option<usize>,

        /// Restrict to one entity category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Build the entity graph for one record or all eligible records
    Graph {
        /// JSON file containing an array of records
        #[arg(short, long)]
        input: PathBuf,

        /// Record to build the graph for
        #[arg(short, long)]
        record_id: Option<String>,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Watch a records file and recompute on every change
    Watch {
        /// JSON file containing an array of records
        #[arg(short, long)]
        input: PathBuf,

        /// Poll interval in seconds (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    if let Err(e) = trendscope::metrics::init_metrics() {
        tracing::warn!(error = %e, "Continuing without metrics");
    }

    match cli.command {
        Commands::Analyze {
            input,
            output,
            compact,
        } => {
            tracing::info!(
                input = %input.display(),
                output = ?output,
                "Starting analyze command"
            );
            commands::analyze(input, output, compact, &cli.engine)?;
        }

        Commands::Frequencies {
            input,
            top,
            category,
        } => {
            tracing::info!(
                input = %input.display(),
                top = ?top,
                category = ?category,
                "Starting frequencies command"
            );
            commands::frequencies(input, top, category, &cli.engine)?;
        }

        Commands::Graph {
            input,
            record_id,
            output,
        } => {
            tracing::info!(
                input = %input.display(),
                record_id = ?record_id,
                "Starting graph command"
            );
            commands::graph(input, record_id, output, &cli.engine)?;
        }

        Commands::Watch { input, interval } => {
            tracing::info!(
                input = %input.display(),
                interval = ?interval,
                "Starting watch command"
            );
            commands::watch(input, interval, &cli.engine).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("trendscope=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("trendscope=info,warn")
    };

    // Logs go to stderr so JSON output on stdout stays clean
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
