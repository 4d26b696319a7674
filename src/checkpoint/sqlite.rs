//! SQLite 检查点存储
//!
//! 每个线程一行，data 列保存 ThreadCheckpoint 的 JSON；phase 单独成列便于排查挂起中的线程。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::checkpoint::{CheckpointStore, ThreadCheckpoint};
use crate::core::StoreError;

#[derive(Clone)]
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                phase TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("checkpoint store lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &ThreadCheckpoint) -> Result<(), StoreError> {
        let data = serde_json::to_string(checkpoint)?;
        let phase = serde_json::to_value(checkpoint.phase)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let thread_id = checkpoint.thread_id.clone();
        let updated_at = checkpoint.updated_at.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (thread_id, phase, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(thread_id) DO UPDATE SET phase = excluded.phase, data = excluded.data,
                 updated_at = excluded.updated_at",
                params![thread_id, phase, data, updated_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ThreadCheckpoint>, StoreError> {
        let thread_id = thread_id.to_string();
        let data: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT data FROM checkpoints WHERE thread_id = ?1",
                        params![thread_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, StoreError> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute("DELETE FROM checkpoints WHERE thread_id = ?1", params![thread_id])?;
            Ok(n > 0)
        })
        .await
    }

    async fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT thread_id FROM checkpoints ORDER BY thread_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }
}
