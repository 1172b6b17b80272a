use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use gc_types::{DataError, Dataset, GcResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle to a dataset placed in a [`DatasetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef(Uuid);

impl DatasetRef {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset:{}", self.0)
    }
}

/// Shared read-only store for datasets used by concurrent evaluation tasks.
///
/// A dataset is written once with [`DatasetStore::put`]; every reader gets the
/// same `Arc`, so tasks never copy the table.
#[derive(Debug, Default)]
pub struct DatasetStore {
    entries: DashMap<DatasetRef, Arc<Dataset>>,
    stats: RwLock<StoreStats>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a dataset in the store and return its handle.
    pub fn put(&self, dataset: Dataset) -> DatasetRef {
        self.put_shared(Arc::new(dataset))
    }

    /// Place an already shared dataset in the store without copying it.
    pub fn put_shared(&self, dataset: Arc<Dataset>) -> DatasetRef {
        let handle = DatasetRef(Uuid::new_v4());
        tracing::debug!("Placing {} rows in store as {}", dataset.len(), handle);
        self.entries.insert(handle, dataset);
        self.stats.write().puts += 1;
        handle
    }

    pub fn get(&self, handle: &DatasetRef) -> GcResult<Arc<Dataset>> {
        match self.entries.get(handle) {
            Some(entry) => {
                self.stats.write().hits += 1;
                Ok(Arc::clone(entry.value()))
            }
            None => {
                self.stats.write().misses += 1;
                Err(DataError::NotInStore {
                    id: handle.to_string(),
                }
                .into())
            }
        }
    }

    /// Drop the store's reference. Readers holding an `Arc` keep their copy alive.
    pub fn release(&self, handle: &DatasetRef) -> bool {
        self.entries.remove(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}

/// Store access counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub puts: u64,
    pub hits: u64,
    pub misses: u64,
}
