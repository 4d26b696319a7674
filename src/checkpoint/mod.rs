//! 线程检查点：每个线程一份可序列化快照
//!
//! 挂起时写入完整状态与待审批请求，恢复时从存储读取，因此进程重启后仍可继续。

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{ApprovalRequest, ConversationState, StoreError, ThreadPhase, TurnReport};

pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// 单个线程的持久化记录
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCheckpoint {
    pub thread_id: String,
    pub state: ConversationState,
    pub phase: ThreadPhase,
    /// 挂起中的审批请求（phase 为 AwaitingApproval 时存在）
    #[serde(default)]
    pub pending_approval: Option<ApprovalRequest>,
    /// 已开始的轮次数
    pub turn: u64,
    /// 本轮已挂起次数，不超过 1
    #[serde(default)]
    pub suspensions_in_turn: u32,
    /// 长期记忆作用域
    pub user_name: String,
    #[serde(default)]
    pub last_report: Option<TurnReport>,
    pub updated_at: String,
}

impl ThreadCheckpoint {
    pub fn new(thread_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            state: ConversationState::new(),
            phase: ThreadPhase::Idle,
            pending_approval: None,
            turn: 0,
            suspensions_in_turn: 0,
            user_name: user_name.into(),
            last_report: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == ThreadPhase::AwaitingApproval
    }
}

/// 检查点存储
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// 覆盖写入
    async fn save(&self, checkpoint: &ThreadCheckpoint) -> Result<(), StoreError>;

    async fn load(&self, thread_id: &str) -> Result<Option<ThreadCheckpoint>, StoreError>;

    /// 返回是否存在并被删除
    async fn delete(&self, thread_id: &str) -> Result<bool, StoreError>;

    async fn list_threads(&self) -> Result<Vec<String>, StoreError>;
}
