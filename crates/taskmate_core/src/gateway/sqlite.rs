//! SQLite-backed key-value gateway.
//!
//! # Responsibility
//! - Persist store blobs in the `kv_entries` table.
//! - Keep blocking SQLite work off async executor threads.
//!
//! # Invariants
//! - `set` is an upsert; the previous value is replaced atomically.
//! - One connection is shared; calls are serialized by its mutex.

use super::{GatewayError, GatewayResult, PersistenceGateway};
use crate::db::{open_db, open_db_in_memory};
use async_trait::async_trait;
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable gateway over one SQLite connection.
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Wraps an already bootstrapped connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens the database file at `path`, applying migrations.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> GatewayResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    async fn run<T, F>(&self, op: &'static str, work: F) -> GatewayResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let joined = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| GatewayError::Unavailable("connection lock poisoned".to_string()))?;
            work(&*guard).map_err(GatewayError::from)
        })
        .await;

        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(GatewayError::Worker(err.to_string())),
        };
        if let Err(err) = &result {
            error!("event=kv_{op} module=gateway status=error backend=sqlite error={err}");
        }
        result
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn get(&self, key: &str) -> GatewayResult<Option<String>> {
        let key = key.to_string();
        self.run("get", move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> GatewayResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run("set", move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now') * 1000)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> GatewayResult<()> {
        let key = key.to_string();
        self.run("remove", move |conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key.as_str()])
                .map(|_| ())
        })
        .await
    }
}
