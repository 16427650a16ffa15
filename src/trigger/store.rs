//! In-memory record store that announces its changes

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{ChangeKind, ChangeNotification, RecomputeTrigger, RecordSource};
use crate::error::{Error, Result};
use crate::models::AbstractRecord;

/// Record store keyed by id
///
/// Each mutation sends a [`ChangeNotification`] to the attached trigger after
/// the write lock is released, so the pass it causes always sees the change.
/// The worker holds the store as its source; call [`detach`](Self::detach)
/// before shutdown or the worker never sees its last trigger dropped.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<String, AbstractRecord>>,
    trigger: RwLock<Option<RecomputeTrigger>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with records, without notifications
    pub fn with_records(records: impl IntoIterator<Item = AbstractRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
            trigger: RwLock::new(None),
        }
    }

    /// Start sending change notifications to `trigger`
    pub async fn attach(&self, trigger: RecomputeTrigger) {
        *self.trigger.write().await = Some(trigger);
    }

    /// Stop sending notifications and release the trigger
    pub async fn detach(&self) -> Option<RecomputeTrigger> {
        self.trigger.write().await.take()
    }

    /// Add a new record; fails if the id is already present
    pub async fn insert(&self, record: AbstractRecord) -> Result<()> {
        let id = record.id.clone();
        {
            let mut records = self.records.write().await;
            if records.contains_key(&id) {
                return Err(Error::invalid_record(&id, "duplicate record id"));
            }
            records.insert(id.clone(), record);
        }
        self.announce(ChangeKind::Insert, id).await;
        Ok(())
    }

    /// Replace an existing record; fails if the id is unknown
    pub async fn update(&self, record: AbstractRecord) -> Result<()> {
        let id = record.id.clone();
        {
            let mut records = self.records.write().await;
            let Some(slot) = records.get_mut(&id) else {
                return Err(Error::invalid_record(&id, "unknown record id"));
            };
            *slot = record;
        }
        self.announce(ChangeKind::Update, id).await;
        Ok(())
    }

    /// Remove a record, returning it
    pub async fn delete(&self, id: &str) -> Result<AbstractRecord> {
        let removed = self
            .records
            .write()
            .await
            .remove(id)
            .ok_or_else(|| Error::invalid_record(id, "unknown record id"))?;
        self.announce(ChangeKind::Delete, id).await;
        Ok(removed)
    }

    pub async fn get(&self, id: &str) -> Option<AbstractRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn announce(&self, kind: ChangeKind, record_id: impl Into<String>) {
        let trigger = self.trigger.read().await.clone();
        let Some(trigger) = trigger else {
            return;
        };

        let notification = ChangeNotification::new(kind, record_id);
        let record_id = notification.record_id.clone();
        if let Err(e) = trigger.notify(notification).await {
            // The mutation itself succeeded; only the recompute is lost
            tracing::warn!(error = %e, %kind, %record_id, "Change notification not delivered");
        }
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordStore {
    async fn snapshot(&self) -> Result<Vec<AbstractRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
