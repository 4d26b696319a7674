//! 分派表：分类类型 → 子流程
//!
//! `route` 对封闭集合做穷尽 match，没有默认分支，新增类型时编译器会要求补全；
//! 字符串形式的分类只能经 `route_tag` 进入，在边界处拒绝未知值。

use crate::core::{ClassificationType, OrchestratorError};
use crate::workflow::WorkflowId;

pub fn route(kind: ClassificationType) -> WorkflowId {
    match kind {
        ClassificationType::Langchain => WorkflowId::Retrieval,
        ClassificationType::Langgraph => WorkflowId::Research,
        ClassificationType::MoreInfo => WorkflowId::AskForMoreInfo,
        ClassificationType::FileQuestion => WorkflowId::File,
        ClassificationType::AddressBook => WorkflowId::AddressBook,
        ClassificationType::WebSearch => WorkflowId::WebSearch,
        ClassificationType::Travel => WorkflowId::Travel,
        ClassificationType::General => WorkflowId::RespondGeneral,
    }
}

/// 字符串边界上的路由
pub fn route_tag(tag: &str) -> Result<WorkflowId, OrchestratorError> {
    Ok(route(tag.parse()?))
}
