//! Change-driven recompute trigger
//!
//! The record store signals every insert, update and delete on a bounded
//! channel. A single background task turns those signals into full analytics
//! passes: whatever is queued when a pass starts is folded into it, so a burst
//! of changes costs one recompute. Results are published on a watch channel.
//!
//! ```text
//! RecordStore --ChangeNotification--> RecomputeWorker --Arc<AnalyticsSnapshot>--> subscribers
//! ```

mod store;

pub use store::InMemoryRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::analytics::{AnalyticsEngine, AnalyticsSnapshot};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::AbstractRecord;

// ============================================================================
// Notifications
// ============================================================================

/// Kind of change applied to the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Something changed, recompute now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub record_id: String,
    pub at: DateTime<Utc>,
}

impl ChangeNotification {
    pub fn new(kind: ChangeKind, record_id: impl Into<String>) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
            at: Utc::now(),
        }
    }
}

// ============================================================================
// Record source
// ============================================================================

/// Provider of the complete current record set
///
/// Every pass reads a fresh snapshot; the engine never sees partial sets.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<AbstractRecord>>;
}

// ============================================================================
// Trigger handle
// ============================================================================

/// Sending half of the change-notification channel
///
/// Cloneable. The worker stops once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct RecomputeTrigger {
    sender: mpsc::Sender<ChangeNotification>,
}

impl RecomputeTrigger {
    /// Queue a notification, waiting for channel capacity
    pub async fn notify(&self, notification: ChangeNotification) -> Result<()> {
        self.sender
            .send(notification)
            .await
            .map_err(|e| Error::with_source("Recompute worker has stopped", e))
    }

    /// Queue a notification without waiting
    ///
    /// A full channel already guarantees a pending pass that will read the
    /// latest records, so the notification is dropped and `true` returned.
    /// Returns `false` only when the worker has stopped.
    pub fn try_notify(&self, notification: ChangeNotification) -> bool {
        match self.sender.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::debug!(record_id = %dropped.record_id, "Notification channel full, pass already pending");
                metrics::record_coalesced(1);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the worker is still receiving
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Latest published snapshot; `None` until the first successful pass
pub type SnapshotReceiver = watch::Receiver<Option<Arc<AnalyticsSnapshot>>>;

/// Background task that recomputes analytics on change
pub struct RecomputeWorker {
    snapshots: SnapshotReceiver,
    handle: JoinHandle<()>,
}

impl RecomputeWorker {
    /// Spawn the worker on the current tokio runtime
    ///
    /// Returns the trigger feeding it and the worker handle.
    pub fn spawn(
        engine: AnalyticsEngine,
        source: Arc<dyn RecordSource>,
        capacity: usize,
    ) -> (RecomputeTrigger, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (publisher, snapshots) = watch::channel(None);

        let handle = tokio::spawn(run_worker(engine, source, receiver, publisher));

        tracing::info!(capacity, "Recompute worker started");

        (RecomputeTrigger { sender }, Self { snapshots, handle })
    }

    /// New receiver for published snapshots
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Wait for the worker to finish after all triggers are dropped
    pub async fn join(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| Error::with_source("Recompute worker panicked", e))
    }
}

async fn run_worker(
    engine: AnalyticsEngine,
    source: Arc<dyn RecordSource>,
    mut receiver: mpsc::Receiver<ChangeNotification>,
    publisher: watch::Sender<Option<Arc<AnalyticsSnapshot>>>,
) {
    let mut passes: u64 = 0;

    while let Some(first) = receiver.recv().await {
        // Fold everything already queued into this pass
        let mut coalesced = 0usize;
        while receiver.try_recv().is_ok() {
            coalesced += 1;
        }
        metrics::record_coalesced(coalesced);

        tracing::debug!(
            kind = %first.kind,
            record_id = %first.record_id,
            coalesced,
            "Recompute requested"
        );

        let records = match source.snapshot().await {
            Ok(records) => records,
            Err(e) => {
                metrics::record_recompute_failure();
                tracing::warn!(error = %e, "Failed to read record snapshot, keeping last result");
                continue;
            }
        };

        // The engine logs and counts its own failures
        if let Ok(snapshot) = engine.recompute(&records) {
            passes += 1;
            publisher.send_replace(Some(Arc::new(snapshot)));
        }
    }

    tracing::info!(passes, "Recompute worker stopped");
}
