use chrono::Utc;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

use crate::record::{SplitId, SplitRecord};
use crate::split::ValidatedSplit;
use crate::store::{KeyValueStore, StoreError};

/// How long a split record stays readable: 30 days.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Key under which the record with the given id is stored.
pub fn storage_key(id: &SplitId) -> String {
    format!("split:{id}")
}

/// Creates and reads split records on top of a [`KeyValueStore`].
///
/// Records are written once under `split:{id}` with an expiry and never updated.
/// Ids are random and collisions are not checked for.
#[derive(Debug, Clone)]
pub struct SplitRecordStore<S> {
    store: S,
    retention: Duration,
}

impl<S> SplitRecordStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}

impl<S: KeyValueStore + Sync> SplitRecordStore<S> {
    /// Persists a new record for a validated split and returns it.
    ///
    /// On [`StoreError::Unavailable`] the record must be assumed not persisted.
    #[instrument(skip_all, err, fields(split_mode = %split.request().split_mode))]
    pub async fn create(&self, split: &ValidatedSplit) -> Result<SplitRecord, StoreError> {
        let record = SplitRecord::new(
            SplitId::generate(),
            split.request(),
            split.outcome().clone(),
            Utc::now(),
        );
        let key = storage_key(&record.id);
        let value = serde_json::to_string(&record)?;
        self.store.set_ex(&key, value, self.retention).await?;
        tracing::info!(id = %record.id, "Split record created");
        Ok(record)
    }

    /// Reads the live record with the given id.
    ///
    /// Returns [`StoreError::NotFound`] for unknown, expired or malformed ids; the latter
    /// never reach the backing store.
    #[instrument(skip_all, err)]
    pub async fn get(&self, id: &str) -> Result<SplitRecord, StoreError> {
        let id = SplitId::from_str(id).map_err(|_| StoreError::NotFound)?;
        let value = self
            .store
            .get(&storage_key(&id))
            .await?
            .ok_or(StoreError::NotFound)?;
        let record: SplitRecord = serde_json::from_str(&value)?;
        Ok(record)
    }
}
