//! SQLite-backed property store

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::traits::*;
use crate::types::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY,
    payload TEXT NOT NULL
);
"#;

/// Durable store keeping each record's attributes as JSON text
///
/// The connection opens on first use and is dropped by `close`. Every call
/// blocks on SQLite I/O inside the returned future, so drive it from a
/// dedicated runtime or `spawn_blocking`, not from a shared async executor.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

fn store_error(e: rusqlite::Error) -> SyncError {
    SyncError::Store(e.to_string())
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        };
        store.with_connection(|_| Ok(()))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|conn| conn.is_some()).unwrap_or(false)
    }

    /// Number of stored records
    pub fn count(&self) -> SyncResult<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
                .map_err(store_error)?;
            Ok(count as usize)
        })
    }

    /// Look up a stored record
    pub fn get(&self, id: PropertyId) -> SyncResult<Option<Record>> {
        self.with_connection(|conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM properties WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(store_error)?;

            payload
                .map(|payload| -> SyncResult<Record> {
                    let attributes: Attributes = serde_json::from_str(&payload).map_err(|e| {
                        SyncError::Store(format!("corrupt payload for id {id}: {e}"))
                    })?;
                    Ok(Record {
                        id: Some(id),
                        attributes,
                    })
                })
                .transpose()
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| SyncError::Store("sqlite connection lock poisoned".to_string()))?;

        if guard.is_none() {
            let conn = Connection::open(&self.path).map_err(|e| {
                SyncError::Store(format!("cannot open {}: {e}", self.path.display()))
            })?;
            conn.execute_batch(SCHEMA).map_err(store_error)?;
            debug!(path = %self.path.display(), "opened sqlite store");
            *guard = Some(conn);
        }

        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(SyncError::Store("sqlite connection unavailable".to_string())),
        }
    }
}

#[async_trait]
impl PropertyStore for SqliteStore {
    async fn fetch_ids(&self) -> SyncResult<BTreeSet<PropertyId>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT id FROM properties")
                .map_err(store_error)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))
                .map_err(store_error)?
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(store_error)?;
            Ok(ids)
        })
    }

    async fn insert_many(&mut self, records: &[Record]) -> SyncResult<usize> {
        self.with_connection(|conn| {
            let tx = conn.transaction().map_err(store_error)?;
            {
                let mut stmt = tx
                    .prepare("INSERT INTO properties (id, payload) VALUES (?1, ?2)")
                    .map_err(store_error)?;
                for record in records {
                    let id = record.id.ok_or_else(|| {
                        SyncError::Store("cannot insert a record without an identifier".to_string())
                    })?;
                    let payload = serde_json::to_string(&record.attributes).map_err(|e| {
                        SyncError::Store(format!("cannot encode record {id}: {e}"))
                    })?;
                    stmt.execute(params![id, payload]).map_err(store_error)?;
                }
            }
            tx.commit().map_err(store_error)?;
            Ok(records.len())
        })
    }

    async fn close(&mut self) -> SyncResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| SyncError::Store("sqlite connection lock poisoned".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| store_error(e))?;
            debug!(path = %self.path.display(), "closed sqlite store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: PropertyId) -> Record {
        let attributes = json!({"zpid": id, "city": "Austin"})
            .as_object()
            .cloned()
            .unwrap();
        Record {
            id: Some(id),
            attributes,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("props.db")).unwrap();

        assert_eq!(store.insert_many(&[record(1), record(2)]).await.unwrap(), 2);

        let ids: Vec<_> = store.fetch_ids().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.get(2).unwrap(), Some(record(2)));
        assert_eq!(store.get(3).unwrap(), None);
    }

    #[tokio::test]
    async fn test_data_survives_close_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.db");

        let mut store = SqliteStore::open(&path).unwrap();
        store.insert_many(&[record(7)]).await.unwrap();
        store.close().await.unwrap();
        assert!(!store.is_connected());

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.is_connected());

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.fetch_ids().await.unwrap().contains(&7));
    }

    #[tokio::test]
    async fn test_failed_bulk_insert_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("props.db")).unwrap();
        store.insert_many(&[record(1)]).await.unwrap();

        let result = store.insert_many(&[record(2), record(1)]).await;

        assert!(matches!(result, Err(SyncError::Store(_))));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blocking_calls_run_off_the_executor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("props.db");
        let mut store = SqliteStore::open(&path).unwrap();
        store.insert_many(&[record(4), record(5)]).await.unwrap();
        store.close().await.unwrap();

        let count = tokio::task::spawn_blocking(move || SqliteStore::open(path)?.count())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unreachable_database_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteStore::open(dir.path().join("missing").join("props.db"));
        assert!(matches!(result, Err(SyncError::Store(_))));
    }
}
