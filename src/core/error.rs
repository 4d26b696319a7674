//! 编排错误与降级记录
//!
//! 致命错误（OrchestratorError）中止当前轮并返回给调用方；
//! 可恢复错误在本地吸收，只以 Degradation 的形式出现在 TurnReport 与日志中。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 编排层致命错误
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 分类值不在封闭集合内（路由表无此项），绝不默认回退
    #[error("Unknown classification: {0}")]
    UnknownClassification(String),

    /// 人工审批给出的替换分类不在封闭集合内
    #[error("Invalid approval override: {0}")]
    InvalidApprovalOverride(String),

    /// resume 时找不到处于等待审批的线程
    #[error("No suspended state for thread: {0}")]
    MissingSuspendedState(String),

    /// 同一轮出现第二次挂起，或未经审批门直接分派
    #[error("Approval gate invariant violated: {0}")]
    GateInvariant(String),

    #[error("Workflow not registered: {0}")]
    WorkflowNotRegistered(String),

    #[error("Checkpoint store error: {0}")]
    Checkpoint(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// 检查点存储 / 长期记忆存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 可恢复错误被吸收后留下的记录（轮次仍然完成）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Degradation {
    /// 子流程失败，回复以降级文本代替
    SubWorkflowFailure(String),
    /// 长期记忆提取或写入失败
    MemoryWriteFailure(String),
    /// 协作方无法解析输入（如不支持的文件类型），以空文档集继续
    UnsupportedInputFormat(String),
}
