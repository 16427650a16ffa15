use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use trendscope::models::AbstractRecord;
use trendscope::trigger::{
    ChangeKind, ChangeNotification, RecomputeTrigger, RecomputeWorker, RecordSource,
};

use super::{build_engine, EngineArgs};

/// Record source backed by a JSON file, re-read on every pass
struct FileRecordSource {
    path: PathBuf,
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn snapshot(&self) -> trendscope::error::Result<Vec<AbstractRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Diff two record sets into change notifications, ordered by id
fn diff_records(
    previous: &BTreeMap<String, AbstractRecord>,
    current: &BTreeMap<String, AbstractRecord>,
) -> Vec<ChangeNotification> {
    let mut changes = Vec::new();

    for (id, record) in current {
        match previous.get(id) {
            None => changes.push(ChangeNotification::new(ChangeKind::Insert, id)),
            Some(old) if old != record => {
                changes.push(ChangeNotification::new(ChangeKind::Update, id))
            }
            Some(_) => {}
        }
    }
    for id in previous.keys().filter(|id| !current.contains_key(*id)) {
        changes.push(ChangeNotification::new(ChangeKind::Delete, id));
    }

    changes
}

fn index_records(records: Vec<AbstractRecord>) -> BTreeMap<String, AbstractRecord> {
    records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect()
}

async fn poll_once(
    source: &FileRecordSource,
    known: &mut BTreeMap<String, AbstractRecord>,
    trigger: &RecomputeTrigger,
) -> Result<usize> {
    let current = index_records(source.snapshot().await?);
    let changes = diff_records(known, &current);
    let count = changes.len();

    for change in changes {
        trigger.notify(change).await?;
    }
    *known = current;

    Ok(count)
}

pub async fn watch(input: PathBuf, interval_secs: Option<u64>, args: &EngineArgs) -> Result<()> {
    let config = args.load_config()?;
    let engine = build_engine(&config)?;
    let interval_secs = interval_secs.unwrap_or(config.trigger.poll_interval_secs);
    let interval = Duration::from_secs(interval_secs.max(1));

    let source = Arc::new(FileRecordSource {
        path: input.clone(),
    });
    let (trigger, worker) =
        RecomputeWorker::spawn(engine, source.clone(), config.trigger.channel_capacity);

    // Log every published snapshot
    let mut snapshots = worker.subscribe();
    let reporter = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let latest = snapshots.borrow_and_update().clone();
            if let Some(snapshot) = latest {
                let top = snapshot.frequencies.first();
                tracing::info!(
                    eligible = snapshot.eligible_records,
                    entities = snapshot.frequencies.len(),
                    themes = snapshot.themes.len(),
                    emerging = snapshot.emerging.len(),
                    top_entity = top.map(|e| e.entity.as_str()).unwrap_or("-"),
                    "Snapshot published"
                );
            }
        }
    });

    tracing::info!(
        input = %input.display(),
        interval_secs = interval.as_secs(),
        "Watching records file (Ctrl-C to stop)"
    );

    let mut known = BTreeMap::new();
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poll_once(&source, &mut known, &trigger).await {
                    Ok(0) => {}
                    Ok(changes) => tracing::info!(changes, "Records changed"),
                    Err(e) => tracing::warn!(error = %e, "Failed to poll records file"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    drop(trigger);
    worker.join().await.context("Recompute worker failed")?;
    reporter.await.context("Snapshot reporter failed")?;

    Ok(())
}
