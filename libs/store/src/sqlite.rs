use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use phonebook_api::{NewPhone, Phone, PhoneId, PhoneStore, StoreError, StoreFuture};

use crate::config::StoreConfig;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS phones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number TEXT NOT NULL
    );
";

// ════════════════════════════════════════════════════════════════
//  SqliteStore
// ════════════════════════════════════════════════════════════════

/// `PhoneStore` over a single SQLite connection.
///
/// The connection sits behind a mutex and every operation runs on the
/// blocking pool, so callers never stall the async runtime. Clones share
/// the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database described by `config`. The schema is
    /// not touched; call [`PhoneStore::migrate`] for that.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = if config.is_memory() {
            Connection::open_in_memory().map_err(unavailable)?
        } else {
            let path = Path::new(&config.path);
            let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(parent) = parent.filter(|p| !p.exists()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("mkdir {}: {e}", parent.display()))
                })?;
            }
            let conn = Connection::open(path).map_err(unavailable)?;
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
                .map_err(store_err)?;
            conn
        };
        conn.busy_timeout(config.busy_timeout()).map_err(store_err)?;

        tracing::info!(path = %config.path, "sqlite store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Run raw SQL statements against the database (maintenance, fixtures).
    pub fn exec(&self, sql: &str) -> Result<(), StoreError> {
        self.lock().execute_batch(sql).map_err(store_err)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("sqlite connection lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Run `f` with exclusive access to the connection on the blocking pool.
    fn with_conn<T, F>(&self, f: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let this = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut conn = this.lock();
                f(&mut *conn)
            })
            .await
            .map_err(|e| StoreError::Backend(format!("blocking task: {e}")))?
        })
    }
}

impl PhoneStore for SqliteStore {
    fn migrate(&self) -> StoreFuture<'_, ()> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(store_err))
    }

    fn insert_batch(&self, phones: Vec<NewPhone>) -> StoreFuture<'_, usize> {
        self.with_conn(move |conn| {
            if phones.is_empty() {
                return Ok(0);
            }
            // Dropping `tx` on any early return rolls the whole batch back.
            let tx = conn.transaction().map_err(store_err)?;
            {
                let mut stmt = tx
                    .prepare_cached("INSERT INTO phones (number) VALUES (?1)")
                    .map_err(store_err)?;
                for phone in &phones {
                    stmt.execute(params![phone.number]).map_err(store_err)?;
                }
            }
            tx.commit().map_err(store_err)?;
            Ok(phones.len())
        })
    }

    fn create(&self, phone: NewPhone) -> StoreFuture<'_, Phone> {
        self.with_conn(move |conn| {
            conn.execute("INSERT INTO phones (number) VALUES (?1)", params![phone.number])
                .map_err(store_err)?;
            let id = conn.last_insert_rowid() as PhoneId;
            Ok(phone.with_id(id))
        })
    }

    fn get(&self, id: PhoneId) -> StoreFuture<'_, Option<Phone>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, number FROM phones WHERE id = ?1",
                params![id as i64],
                row_to_phone,
            )
            .optional()
            .map_err(store_err)
        })
    }

    fn update(&self, id: PhoneId, phone: NewPhone) -> StoreFuture<'_, Option<Phone>> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE phones SET number = ?1 WHERE id = ?2",
                    params![phone.number, id as i64],
                )
                .map_err(store_err)?;
            Ok((changed > 0).then(|| phone.with_id(id)))
        })
    }

    fn delete(&self, id: PhoneId) -> StoreFuture<'_, bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM phones WHERE id = ?1", params![id as i64])
                .map_err(store_err)?;
            Ok(changed > 0)
        })
    }

    fn list(&self, offset: u64, limit: u64) -> StoreFuture<'_, Vec<Phone>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare_cached("SELECT id, number FROM phones ORDER BY id LIMIT ?1 OFFSET ?2")
                .map_err(store_err)?;
            let rows = stmt
                .query_map(params![clamp_i64(limit), clamp_i64(offset)], row_to_phone)
                .map_err(store_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(store_err)
        })
    }

    fn count(&self) -> StoreFuture<'_, u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM phones", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(store_err)
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Helpers
// ════════════════════════════════════════════════════════════════

fn row_to_phone(row: &rusqlite::Row<'_>) -> rusqlite::Result<Phone> {
    Ok(Phone {
        id: row.get::<_, i64>(0)? as PhoneId,
        number: row.get(1)?,
    })
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn store_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) => match err.code {
            ErrorCode::ConstraintViolation => StoreError::Constraint(e.to_string()),
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        },
        _ => StoreError::Backend(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn migrated() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open store");
        store.migrate().await.expect("migrate");
        store
    }

    fn batch(n: usize) -> Vec<NewPhone> {
        (0..n).map(|i| NewPhone::new(format!("555-{i}"))).collect()
    }

    #[tokio::test]
    async fn insert_batch_commits_every_row() {
        let store = migrated().await;

        let inserted = store.insert_batch(batch(200)).await.expect("insert");
        assert_eq!(inserted, 200);
        assert_eq!(store.count().await.unwrap(), 200);

        let all = store.list(0, 1000).await.unwrap();
        let mut ids: Vec<_> = all.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 200, "ids must be unique");
        assert_eq!(all[0].number, "555-0");
        assert_eq!(all[199].number, "555-199");
    }

    #[tokio::test]
    async fn failing_row_rolls_back_whole_batch() {
        let store = migrated().await;
        store
            .exec(
                "CREATE TRIGGER reject_after_ten BEFORE INSERT ON phones
                 WHEN (SELECT COUNT(*) FROM phones) >= 10
                 BEGIN SELECT RAISE(ABORT, 'quota exceeded'); END;",
            )
            .unwrap();

        let err = store.insert_batch(batch(50)).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"), "{err}");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_table_is_an_error_not_a_partial_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.insert_batch(batch(3)).await.is_err());
        store.migrate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let store = migrated().await;
        assert_eq!(store.insert_batch(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn crud_round() {
        let store = migrated().await;

        let created = store.create(NewPhone::new("111")).await.unwrap();
        assert_eq!(created.number, "111");
        assert_eq!(store.get(created.id).await.unwrap(), Some(created.clone()));

        let updated = store.update(created.id, NewPhone::new("222")).await.unwrap();
        assert_eq!(updated, Some(Phone::new(created.id, "222")));
        assert_eq!(store.update(9999, NewPhone::new("x")).await.unwrap(), None);

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert_eq!(store.get(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let store = migrated().await;
        let a = store.create(NewPhone::new("a")).await.unwrap();
        store.delete(a.id).await.unwrap();
        let b = store.create(NewPhone::new("b")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn list_pages_by_offset() {
        let store = migrated().await;
        store.insert_batch(batch(25)).await.unwrap();

        let page = store.list(10, 10).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].number, "555-10");

        let tail = store.list(20, 10).await.unwrap();
        assert_eq!(tail.len(), 5);
        assert!(store.list(100, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = migrated().await;
        store.create(NewPhone::new("keep")).await.unwrap();
        store.migrate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            path: dir.path().join("nested/phones.db").to_string_lossy().into_owned(),
            ..StoreConfig::default()
        };

        {
            let store = SqliteStore::open(&config).unwrap();
            store.migrate().await.unwrap();
            store.insert_batch(batch(5)).await.unwrap();
        }

        let store = SqliteStore::open(&config).unwrap();
        store.migrate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 5);
    }
}
