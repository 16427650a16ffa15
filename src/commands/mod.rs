pub mod analyze;
pub mod watch;

// Re-export command functions for convenience
pub use analyze::{analyze, build_engine, frequencies, graph, CategoryArg, EngineArgs};
pub use watch::watch;

use anyhow::{Context, Result};
use std::path::Path;

use trendscope::models::AbstractRecord;

/// Read a JSON array of records
pub fn load_records(path: &Path) -> Result<Vec<AbstractRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))
}

/// Write `content` to `output`, or stdout when unset
pub fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "Output written");
        }
        None => println!("{content}"),
    }
    Ok(())
}
