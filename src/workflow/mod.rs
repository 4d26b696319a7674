//! 子流程：统一的调用契约与各专用流程的适配器
//!
//! 编排核心只依赖 `SubWorkflow` trait：invoke(请求片段) -> 结果片段（新消息 / 新文档 / 结果文本）。
//! 子流程内部错误以 WorkflowError 返回，不会以 panic 形式穿过编排边界。

pub mod address_book;
pub mod executor;
pub mod file;
pub mod general;
pub mod research;
pub mod retrieval;
pub mod tool_loop;
pub mod travel;
pub mod web_search;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Classification, Degradation};
use crate::memory::{Document, DocumentUpdate, Message};

pub use address_book::{AddressBookWorkflow, Contact};
pub use executor::{WorkflowExecutor, WorkflowRegistry};
pub use file::FileWorkflow;
pub use general::{MoreInfoWorkflow, RespondGeneralWorkflow};
pub use research::ResearchWorkflow;
pub use retrieval::{KeywordRetriever, RetrievalWorkflow, Retriever};
pub use tool_loop::{ToolLoop, ToolLoopResult};
pub use travel::TravelWorkflow;
pub use web_search::WebSearchWorkflow;

/// 子流程标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowId {
    Retrieval,
    Research,
    File,
    AddressBook,
    WebSearch,
    Travel,
    /// 终端：追问更多信息
    AskForMoreInfo,
    /// 终端：直接回复常规问题
    RespondGeneral,
}

impl WorkflowId {
    pub const ALL: [WorkflowId; 8] = [
        WorkflowId::Retrieval,
        WorkflowId::Research,
        WorkflowId::File,
        WorkflowId::AddressBook,
        WorkflowId::WebSearch,
        WorkflowId::Travel,
        WorkflowId::AskForMoreInfo,
        WorkflowId::RespondGeneral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowId::Retrieval => "retrieval_agent",
            WorkflowId::Research => "researcher_agent",
            WorkflowId::File => "file_agent",
            WorkflowId::AddressBook => "address_book_agent",
            WorkflowId::WebSearch => "conduct_web_search",
            WorkflowId::Travel => "conduct_travel_search",
            WorkflowId::AskForMoreInfo => "ask_for_more_info",
            WorkflowId::RespondGeneral => "respond_to_general_query",
        }
    }

    /// 终端节点只产生一条回复，不访问外部资源
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowId::AskForMoreInfo | WorkflowId::RespondGeneral)
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 子流程错误
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 超时时长（毫秒）
    #[error("Workflow timed out after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Failed(String),
}

/// 交给子流程的请求片段（对话状态的子集）
#[derive(Clone, Debug)]
pub struct WorkflowRequest {
    pub thread_id: String,
    /// 完整历史，最后一条为本轮用户消息
    pub messages: Vec<Message>,
    pub classification: Classification,
    pub documents: Vec<Document>,
    pub user_name: String,
}

impl WorkflowRequest {
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn latest_text(&self) -> &str {
        self.latest().map(|m| m.content.as_str()).unwrap_or("")
    }
}

/// 子流程结果片段；三者至少其一非空
#[derive(Clone, Debug, Default)]
pub struct WorkflowOutput {
    /// 追加到对话的新消息
    pub messages: Vec<Message>,
    /// 依次交给文档归约器的更新
    pub documents: Vec<DocumentUpdate>,
    /// 结果文本，编排层包装为一条助手消息
    pub result_text: Option<String>,
    /// 子流程内部已吸收的可恢复问题
    pub degradations: Vec<Degradation>,
}

impl WorkflowOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            result_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn message(msg: Message) -> Self {
        Self {
            messages: vec![msg],
            ..Self::default()
        }
    }

    pub fn with_documents(mut self, update: DocumentUpdate) -> Self {
        self.documents.push(update);
        self
    }

    pub fn with_degradation(mut self, d: Degradation) -> Self {
        self.degradations.push(d);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.documents.is_empty() && self.result_text.is_none()
    }
}

/// 子流程统一契约
#[async_trait]
pub trait SubWorkflow: Send + Sync {
    fn id(&self) -> WorkflowId;

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError>;
}
