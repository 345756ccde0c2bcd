//! Per-user dataset history capped at `RETAINED_PER_USER`.
//!
//! `record` holds the user's lock across insert and eviction, so concurrent
//! uploads from one user cannot both see room for one more. Users never
//! share a lock, and a user's entry is dropped once no upload holds it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::error::Result;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{Dataset, DatasetId, NewDataset};
use crate::storage::DatasetStore;

pub const RETAINED_PER_USER: usize = 5;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub dataset: Dataset,
    pub evicted: Vec<DatasetId>,
}

pub struct RetentionManager<S> {
    store: Arc<S>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: DatasetStore> RetentionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn user_lock(&self, user: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(user.to_string()).or_default().clone()
    }

    /// Drop the user's entry when the map and `lock` are its only holders.
    fn release(&self, user: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user);
        }
    }

    /// Store `new` as the user's newest dataset and evict the oldest beyond
    /// the cap.
    pub fn record(&self, user: &str, new: NewDataset) -> Result<Recorded> {
        let lock = self.user_lock(user);
        let stored = {
            let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
            self.store.insert_and_evict(user, new, RETAINED_PER_USER)
        };
        self.release(user, lock);

        let (dataset, evicted) = stored?;
        if !evicted.is_empty() {
            log(
                Level::Info,
                Domain::Retention,
                "evicted",
                obj(&[
                    ("user", v_str(user)),
                    ("dataset_id", json!(dataset.id)),
                    ("evicted", json!(evicted)),
                    ("retained", json!(RETAINED_PER_USER)),
                ]),
            );
        }
        Ok(Recorded { dataset, evicted })
    }

    /// At most `RETAINED_PER_USER` datasets, newest first.
    pub fn list(&self, user: &str) -> Result<Vec<Dataset>> {
        self.store.list(user, Some(RETAINED_PER_USER))
    }
}
