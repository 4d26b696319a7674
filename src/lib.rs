//! Hive - Rust 对话式请求路由
//!
//! 模块划分：
//! - **checkpoint**: 线程检查点与存储（内存 / SQLite）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 意图分类、人工审批门、分派表、主控编排
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话消息、文档归约、长期记忆
//! - **tools**: 工具循环使用的工具与执行器
//! - **workflow**: 子流程契约与内置适配器

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod tools;
pub mod workflow;

pub use crate::core::{
    ApprovalResponse, ClassificationType, OrchestratorError, Supervisor, SupervisorBuilder,
    TurnFlags, TurnOutcome, TurnReport,
};
pub use crate::memory::Message;
