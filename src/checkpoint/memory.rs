//! 内存检查点存储：保存序列化后的 JSON 快照，读取时反序列化，调用方拿到的永远是独立副本

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::{CheckpointStore, ThreadCheckpoint};
use crate::core::StoreError;

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    snapshots: RwLock<HashMap<String, String>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &ThreadCheckpoint) -> Result<(), StoreError> {
        let json = serde_json::to_string(checkpoint)?;
        self.snapshots
            .write()
            .await
            .insert(checkpoint.thread_id.clone(), json);
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ThreadCheckpoint>, StoreError> {
        let snapshots = self.snapshots.read().await;
        match snapshots.get(thread_id) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, StoreError> {
        Ok(self.snapshots.write().await.remove(thread_id).is_some())
    }

    async fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.snapshots.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
