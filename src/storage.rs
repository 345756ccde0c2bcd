use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{EngineError, Result};
use crate::model::{Dataset, DatasetId, EquipmentTable, NewDataset, SummaryRecord};

/// Dataset persistence, scoped by owner.
///
/// Listing is newest first by `uploaded_at`, ties broken by id descending.
pub trait DatasetStore: Send + Sync {
    fn insert(&self, owner: &str, new: NewDataset) -> Result<Dataset>;

    fn list(&self, owner: &str, limit: Option<usize>) -> Result<Vec<Dataset>>;

    fn list_ids(&self, owner: &str) -> Result<Vec<DatasetId>>;

    /// `None` for missing ids and for ids owned by someone else.
    fn get(&self, owner: &str, id: DatasetId) -> Result<Option<Dataset>>;

    fn delete(&self, owner: &str, id: DatasetId) -> Result<bool>;

    /// Insert, then delete everything past the newest `keep`.
    ///
    /// Callers must serialize calls per owner; implementations that can do
    /// this in one transaction should override it.
    fn insert_and_evict(&self, owner: &str, new: NewDataset, keep: usize) -> Result<(Dataset, Vec<DatasetId>)> {
        let ds = self.insert(owner, new)?;
        let mut evicted = Vec::new();
        for id in self.list_ids(owner)?.into_iter().skip(keep) {
            if self.delete(owner, id)? {
                evicted.push(id);
            }
        }
        Ok((ds, evicted))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// SQLite
// =============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Mutex::new(Connection::open(path)?) })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Mutex::new(Connection::open_in_memory()?) })
    }

    pub fn init(&self) -> Result<()> {
        lock(&self.conn).execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS datasets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                uploaded_at INTEGER NOT NULL,
                fingerprint TEXT NOT NULL,
                data TEXT NOT NULL,
                summary TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_datasets_owner_recent
                ON datasets (owner, uploaded_at DESC, id DESC);
            COMMIT;",
        )?;
        Ok(())
    }

    fn insert_on(conn: &Connection, owner: &str, new: NewDataset) -> Result<Dataset> {
        let data = to_json(&new.table)?;
        let summary = to_json(&new.summary)?;
        conn.execute(
            "INSERT INTO datasets (owner, name, uploaded_at, fingerprint, data, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![owner, new.name, new.uploaded_at.timestamp_micros(), new.fingerprint, data, summary],
        )?;
        let id = DatasetId(conn.last_insert_rowid());
        Ok(Dataset::from_new(id, owner, new))
    }

    fn ids_on(conn: &Connection, owner: &str) -> Result<Vec<DatasetId>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM datasets WHERE owner = ?1 ORDER BY uploaded_at DESC, id DESC",
        )?;
        let ids = stmt
            .query_map(params![owner], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(DatasetId).collect())
    }
}

const SELECT_DATASET: &str = "SELECT id, owner, name, uploaded_at, fingerprint, data, summary FROM datasets";

struct StoredRow {
    id: i64,
    owner: String,
    name: String,
    uploaded_at: i64,
    fingerprint: String,
    data: String,
    summary: String,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            uploaded_at: row.get(3)?,
            fingerprint: row.get(4)?,
            data: row.get(5)?,
            summary: row.get(6)?,
        })
    }

    fn decode(self) -> Result<Dataset> {
        let id = DatasetId(self.id);
        let corrupt = |what: &str, e: serde_json::Error| EngineError::consistency(Some(id), format!("stored {} undecodable: {}", what, e));
        let table: EquipmentTable = serde_json::from_str(&self.data).map_err(|e| corrupt("table", e))?;
        let summary: SummaryRecord = serde_json::from_str(&self.summary).map_err(|e| corrupt("summary", e))?;
        let uploaded_at = from_micros(self.uploaded_at)
            .ok_or_else(|| EngineError::consistency(Some(id), format!("bad uploaded_at {}", self.uploaded_at)))?;
        Ok(Dataset {
            id,
            owner: self.owner,
            name: self.name,
            uploaded_at,
            fingerprint: self.fingerprint,
            table,
            summary,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| EngineError::consistency(None, e.to_string()))
}

fn from_micros(us: i64) -> Option<DateTime<Utc>> {
    let secs = us.div_euclid(1_000_000);
    let nanos = (us.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

impl DatasetStore for SqliteStore {
    fn insert(&self, owner: &str, new: NewDataset) -> Result<Dataset> {
        Self::insert_on(&lock(&self.conn), owner, new)
    }

    fn list(&self, owner: &str, limit: Option<usize>) -> Result<Vec<Dataset>> {
        let conn = lock(&self.conn);
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(&format!(
            "{} WHERE owner = ?1 ORDER BY uploaded_at DESC, id DESC LIMIT ?2",
            SELECT_DATASET
        ))?;
        let rows = stmt
            .query_map(params![owner, limit], StoredRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredRow::decode).collect()
    }

    fn list_ids(&self, owner: &str) -> Result<Vec<DatasetId>> {
        Self::ids_on(&lock(&self.conn), owner)
    }

    fn get(&self, owner: &str, id: DatasetId) -> Result<Option<Dataset>> {
        let conn = lock(&self.conn);
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1 AND owner = ?2", SELECT_DATASET),
                params![id.0, owner],
                StoredRow::read,
            )
            .optional()?;
        row.map(StoredRow::decode).transpose()
    }

    fn delete(&self, owner: &str, id: DatasetId) -> Result<bool> {
        let n = lock(&self.conn).execute(
            "DELETE FROM datasets WHERE id = ?1 AND owner = ?2",
            params![id.0, owner],
        )?;
        Ok(n > 0)
    }

    fn insert_and_evict(&self, owner: &str, new: NewDataset, keep: usize) -> Result<(Dataset, Vec<DatasetId>)> {
        let mut conn = lock(&self.conn);
        let tx = conn.transaction()?;
        let ds = Self::insert_on(&tx, owner, new)?;
        let evicted: Vec<DatasetId> = Self::ids_on(&tx, owner)?.into_iter().skip(keep).collect();
        for id in &evicted {
            tx.execute("DELETE FROM datasets WHERE id = ?1", params![id.0])?;
        }
        tx.commit()?;
        Ok((ds, evicted))
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    datasets: Vec<Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, owner: &str) -> Vec<Dataset> {
        let inner = lock(&self.inner);
        let mut mine: Vec<Dataset> = inner.datasets.iter().filter(|d| d.owner == owner).cloned().collect();
        mine.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        mine
    }
}

impl DatasetStore for MemoryStore {
    fn insert(&self, owner: &str, new: NewDataset) -> Result<Dataset> {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let ds = Dataset::from_new(DatasetId(inner.next_id), owner, new);
        inner.datasets.push(ds.clone());
        Ok(ds)
    }

    fn list(&self, owner: &str, limit: Option<usize>) -> Result<Vec<Dataset>> {
        let mut mine = self.sorted(owner);
        if let Some(l) = limit {
            mine.truncate(l);
        }
        Ok(mine)
    }

    fn list_ids(&self, owner: &str) -> Result<Vec<DatasetId>> {
        Ok(self.sorted(owner).iter().map(|d| d.id).collect())
    }

    fn get(&self, owner: &str, id: DatasetId) -> Result<Option<Dataset>> {
        let inner = lock(&self.inner);
        Ok(inner.datasets.iter().find(|d| d.id == id && d.owner == owner).cloned())
    }

    fn delete(&self, owner: &str, id: DatasetId) -> Result<bool> {
        let mut inner = lock(&self.inner);
        let before = inner.datasets.len();
        inner.datasets.retain(|d| !(d.id == id && d.owner == owner));
        Ok(inner.datasets.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EquipmentRecord;
    use crate::summary::summarize;
    use chrono::{Duration, TimeZone};

    fn new_dataset(name: &str, minute: i64) -> NewDataset {
        let table = EquipmentTable::new(vec![
            EquipmentRecord::new("Pump-1", "Pump", 10.0, 2.0, 25.0),
            EquipmentRecord::new("Valve-1", "Valve", 5.0, 1.0, 20.0),
        ]);
        let summary = summarize(&table);
        NewDataset {
            name: name.to_string(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minute),
            fingerprint: format!("fp-{}", name),
            table,
            summary,
        }
    }

    fn sqlite() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    fn exercise_store(store: &dyn DatasetStore) {
        let a = store.insert("alice", new_dataset("a.csv", 1)).unwrap();
        let b = store.insert("alice", new_dataset("b.csv", 3)).unwrap();
        let c = store.insert("alice", new_dataset("c.csv", 2)).unwrap();
        store.insert("bob", new_dataset("bob.csv", 9)).unwrap();

        let names: Vec<String> = store.list("alice", None).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b.csv", "c.csv", "a.csv"]);
        assert_eq!(store.list_ids("alice").unwrap(), vec![b.id, c.id, a.id]);
        assert_eq!(store.list("alice", Some(1)).unwrap().len(), 1);

        let got = store.get("alice", a.id).unwrap().unwrap();
        assert_eq!(got, a);
        assert!(store.get("bob", a.id).unwrap().is_none());
        assert!(!store.delete("bob", a.id).unwrap());
        assert!(store.delete("alice", a.id).unwrap());
        assert!(store.get("alice", a.id).unwrap().is_none());
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        exercise_store(&sqlite());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        exercise_store(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_insert_and_evict_in_one_transaction() {
        let store = sqlite();
        for i in 0..5 {
            store.insert("alice", new_dataset(&format!("{}.csv", i), i)).unwrap();
        }
        let (ds, evicted) = store.insert_and_evict("alice", new_dataset("new.csv", 10), 5).unwrap();
        assert_eq!(evicted.len(), 1);
        let ids = store.list_ids("alice").unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0], ds.id);
        assert!(!ids.contains(&evicted[0]));
    }

    #[test]
    fn test_corrupt_summary_surfaces_as_consistency() {
        let store = sqlite();
        let ds = store.insert("alice", new_dataset("a.csv", 0)).unwrap();
        lock(&store.conn)
            .execute("UPDATE datasets SET summary = '{not json' WHERE id = ?1", params![ds.id.0])
            .unwrap();
        match store.get("alice", ds.id) {
            Err(EngineError::Consistency { id, .. }) => assert_eq!(id, Some(ds.id)),
            other => panic!("expected consistency error, got {:?}", other.map(|d| d.map(|d| d.id))),
        }
    }

    #[test]
    fn test_uploaded_at_survives_storage() {
        let store = sqlite();
        let new = new_dataset("a.csv", 0);
        let at = new.uploaded_at + Duration::microseconds(123_456);
        let ds = store.insert("alice", NewDataset { uploaded_at: at, ..new }).unwrap();
        assert_eq!(store.get("alice", ds.id).unwrap().unwrap().uploaded_at, at);
    }
}
