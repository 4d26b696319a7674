//! 对话状态与轮次结果
//!
//! ConversationState 归所属线程独占，是检查点的最小单位；TurnOutcome 是 submit / resume 对外的返回。

use serde::{Deserialize, Serialize};

use crate::core::{ApprovalRequest, Classification, Degradation, SuspensionPayload};
use crate::memory::{merge_messages, reduce_documents, Document, DocumentUpdate, Message};

/// 单个线程的对话状态
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// 本轮用户是否指定走网页搜索
    #[serde(default)]
    pub choose_web_search: bool,
    #[serde(default)]
    pub router: Classification,
    /// 待审批（或已审批）动作的描述
    #[serde(default)]
    pub proposed_action_details: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    /// 审批记录：被人工替换的分类在此保留原始理由
    #[serde(default)]
    pub approval_history: Vec<ApprovalRecord>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn apply_messages(&mut self, incoming: impl IntoIterator<Item = Message>) {
        merge_messages(&mut self.messages, incoming);
    }

    pub fn apply_documents(&mut self, update: DocumentUpdate) {
        self.documents = reduce_documents(&self.documents, update);
    }
}

/// 一次审批的审计记录
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub turn: u64,
    pub proposed: Classification,
    pub approved: bool,
    /// reject 时生效的分类
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<Classification>,
}

/// submit 时附带的轮次标志
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFlags {
    /// 用户是否选择网页搜索
    #[serde(default)]
    pub web_search: bool,
    /// 长期记忆的用户作用域；未提供时用配置中的 app.user_name
    #[serde(default)]
    pub user_name: Option<String>,
}

impl TurnFlags {
    pub fn web_search() -> Self {
        Self {
            web_search: true,
            ..Self::default()
        }
    }

    pub fn for_user(mut self, user: impl Into<String>) -> Self {
        self.user_name = Some(user.into());
        self
    }
}

/// 线程在轮次状态机中的位置
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadPhase {
    /// 尚无进行中的轮次
    Idle,
    /// 已挂起，等待人工审批
    AwaitingApproval,
    /// 上一轮已完成
    Completed,
}

/// 完成一轮后的报告
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub thread_id: String,
    pub turn: u64,
    pub classification: Classification,
    /// 实际分派到的子流程 id
    pub workflow: String,
    /// 本轮新增的助手回复
    pub reply: Option<String>,
    pub document_count: usize,
    pub memories_written: usize,
    /// 吸收掉的可恢复错误；为空表示完全成功
    pub degradations: Vec<Degradation>,
}

impl TurnReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// submit / resume 的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Suspended(SuspensionPayload),
    Completed(TurnReport),
}

impl TurnOutcome {
    pub fn suspended(req: &ApprovalRequest) -> Self {
        TurnOutcome::Suspended(SuspensionPayload::from(req))
    }

    pub fn as_suspension(&self) -> Option<&SuspensionPayload> {
        match self {
            TurnOutcome::Suspended(p) => Some(p),
            TurnOutcome::Completed(_) => None,
        }
    }

    pub fn as_report(&self) -> Option<&TurnReport> {
        match self {
            TurnOutcome::Completed(r) => Some(r),
            TurnOutcome::Suspended(_) => None,
        }
    }
}
