//! 意图分类与审批的数据类型
//!
//! 分类值是一个封闭集合；字符串只在边界处解析，集合外的值一律报错，不做默认回退。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::OrchestratorError;

/// 分类类型（封闭集合）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationType {
    #[serde(rename = "file_question")]
    FileQuestion,
    #[serde(rename = "address_book")]
    AddressBook,
    #[serde(rename = "more-info")]
    MoreInfo,
    #[serde(rename = "langchain")]
    Langchain,
    #[serde(rename = "general")]
    General,
    #[serde(rename = "web_search")]
    WebSearch,
    #[serde(rename = "langgraph")]
    Langgraph,
    #[serde(rename = "travel")]
    Travel,
}

impl ClassificationType {
    pub const ALL: [ClassificationType; 8] = [
        ClassificationType::FileQuestion,
        ClassificationType::AddressBook,
        ClassificationType::MoreInfo,
        ClassificationType::Langchain,
        ClassificationType::General,
        ClassificationType::WebSearch,
        ClassificationType::Langgraph,
        ClassificationType::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationType::FileQuestion => "file_question",
            ClassificationType::AddressBook => "address_book",
            ClassificationType::MoreInfo => "more-info",
            ClassificationType::Langchain => "langchain",
            ClassificationType::General => "general",
            ClassificationType::WebSearch => "web_search",
            ClassificationType::Langgraph => "langgraph",
            ClassificationType::Travel => "travel",
        }
    }

    /// 供提示文本使用的集合列表，如 "file_question, address_book, ..."
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ClassificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationType {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OrchestratorError::UnknownClassification(s.to_string()))
    }
}

/// 路由决策：类型 + 分类原因
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub kind: ClassificationType,
    pub logic: String,
}

impl Classification {
    pub fn new(kind: ClassificationType, logic: impl Into<String>) -> Self {
        Self {
            kind,
            logic: logic.into(),
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::new(ClassificationType::General, "")
    }
}

/// 挂起时交给调用方的审批请求
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub classification: Classification,
    pub question: String,
}

/// 调用方观察到的挂起载荷
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspensionPayload {
    pub question: String,
    pub classification_type: String,
    pub classification_logic: String,
}

impl From<&ApprovalRequest> for SuspensionPayload {
    fn from(req: &ApprovalRequest) -> Self {
        Self {
            question: req.question.clone(),
            classification_type: req.classification.kind.as_str().to_string(),
            classification_logic: req.classification.logic.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserResponse {
    Approve,
    Reject,
}

/// 人工审批结果；reject 时必须给出替换分类
///
/// `kind` 保持为字符串，以便在审批门处校验并报告 InvalidApprovalOverride。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub user_response: UserResponse,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ApprovalResponse {
    pub fn approve() -> Self {
        Self {
            user_response: UserResponse::Approve,
            kind: None,
        }
    }

    pub fn reject(kind: impl Into<String>) -> Self {
        Self {
            user_response: UserResponse::Reject,
            kind: Some(kind.into()),
        }
    }
}
