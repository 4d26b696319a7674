//! 长期记忆存储：按 (用户, 类别) 分区的键值存储
//!
//! 每次写入都是新键，历史只追加不覆盖；存储在进程启动时构造一次，显式注入 MemoryWriter。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::StoreError;

/// 记忆类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// 兴趣爱好（运动、音乐、书籍等）
    Interest,
    /// 专业/职业（学生、医生、算法工程师等）
    Specialization,
}

impl MemoryCategory {
    pub const ALL: [MemoryCategory; 2] = [MemoryCategory::Interest, MemoryCategory::Specialization];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Interest => "interest",
            MemoryCategory::Specialization => "specialization",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "interest" => Some(MemoryCategory::Interest),
            "specialization" => Some(MemoryCategory::Specialization),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 存储的值：提取出的事实文本与写入时间
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryValue {
    pub text: String,
    pub created_at: String,
}

impl MemoryValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 一条记忆记录（含键）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub user: String,
    pub category: MemoryCategory,
    pub key: String,
    pub value: MemoryValue,
}

/// 长期记忆存储接口
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn put(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
        value: MemoryValue,
    ) -> Result<(), StoreError>;

    async fn get(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
    ) -> Result<Option<MemoryValue>, StoreError>;

    /// 按写入顺序列出某用户某类别下的全部记录
    async fn list(&self, scope: &str, category: MemoryCategory) -> Result<Vec<MemoryRecord>, StoreError>;
}

type Partition = Arc<RwLock<Vec<(String, MemoryValue)>>>;

/// 内存实现：外层表只在新建分区时加写锁，分区之间互不阻塞
#[derive(Default)]
pub struct InMemoryMemoryStore {
    partitions: RwLock<HashMap<(String, MemoryCategory), Partition>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn partition(&self, scope: &str, category: MemoryCategory) -> Partition {
        let key = (scope.to_string(), category);
        {
            let partitions = self.partitions.read().await;
            if let Some(p) = partitions.get(&key) {
                return Arc::clone(p);
            }
        }
        let mut partitions = self.partitions.write().await;
        Arc::clone(partitions.entry(key).or_default())
    }

    async fn existing(&self, scope: &str, category: MemoryCategory) -> Option<Partition> {
        self.partitions
            .read()
            .await
            .get(&(scope.to_string(), category))
            .cloned()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn put(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
        value: MemoryValue,
    ) -> Result<(), StoreError> {
        let partition = self.partition(scope, category).await;
        let mut entries = partition.write().await;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key.to_string(), value)),
        }
        Ok(())
    }

    async fn get(
        &self,
        scope: &str,
        category: MemoryCategory,
        key: &str,
    ) -> Result<Option<MemoryValue>, StoreError> {
        let Some(partition) = self.existing(scope, category).await else {
            return Ok(None);
        };
        let entries = partition.read().await;
        Ok(entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    async fn list(&self, scope: &str, category: MemoryCategory) -> Result<Vec<MemoryRecord>, StoreError> {
        let Some(partition) = self.existing(scope, category).await else {
            return Ok(Vec::new());
        };
        let entries = partition.read().await;
        Ok(entries
            .iter()
            .map(|(k, v)| MemoryRecord {
                user: scope.to_string(),
                category,
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }
}
