//! 长期记忆的 SQLite 持久化
//!
//! rusqlite 为同步接口：连接放在 Mutex 中，所有语句通过 spawn_blocking 执行，避免阻塞 async 运行时。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::StoreError;
use crate::memory::{MemoryCategory, MemoryRecord, MemoryStore, MemoryValue};

/// SQLite 长期记忆：(scope, category, key) 为主键
#[derive(Clone)]
pub struct SqliteMemoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMemoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memories (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                scope TEXT NOT NULL,
                category TEXT NOT NULL,
                key TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (scope, category, key)
            );
            CREATE INDEX IF NOT EXISTS idx_memories_scope ON memories(scope, category);",
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
                .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn put(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
        value: MemoryValue,
    ) -> Result<(), StoreError> {
        let (scope, key) = (scope.to_string(), key.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO memories (scope, category, key, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(scope, category, key) DO UPDATE SET text = excluded.text, created_at = excluded.created_at",
                params![scope, category.as_str(), key, value.text, value.created_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
    ) -> Result<Option<MemoryValue>, StoreError> {
        let (scope, key) = (scope.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT text, created_at FROM memories WHERE scope = ?1 AND category = ?2 AND key = ?3",
                    params![scope, category.as_str(), key],
                    |row| {
                        Ok(MemoryValue {
                            text: row.get(0)?,
                            created_at: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn list(&self, scope: &str, category: MemoryCategory) -> Result<Vec<MemoryRecord>, StoreError> {
        let scope = scope.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, text, created_at FROM memories WHERE scope = ?1 AND category = ?2 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![scope, category.as_str()], |row| {
                Ok(MemoryRecord {
                    user: scope.clone(),
                    category,
                    key: row.get(0)?,
                    value: MemoryValue {
                        text: row.get(1)?,
                        created_at: row.get(2)?,
                    },
                })
            })?;
            let mut records = Vec::new();
            for r in rows {
                records.push(r?);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");
        {
            let store = SqliteMemoryStore::open(&path).unwrap();
            store
                .put("alice", MemoryCategory::Specialization, "k1", MemoryValue::new("算法工程师"))
                .await
                .unwrap();
            store
                .put("alice", MemoryCategory::Specialization, "k2", MemoryValue::new("老师"))
                .await
                .unwrap();
        }

        let reopened = SqliteMemoryStore::open(&path).unwrap();
        let v = reopened
            .get("alice", MemoryCategory::Specialization, "k1")
            .await
            .unwrap();
        assert_eq!(v.unwrap().text, "算法工程师");
        let all = reopened
            .list("alice", MemoryCategory::Specialization)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].key, "k2");
        assert!(reopened
            .list("alice", MemoryCategory::Interest)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = SqliteMemoryStore::in_memory().unwrap();
        assert!(store
            .get("nobody", MemoryCategory::Interest, "k")
            .await
            .unwrap()
            .is_none());
    }
}
