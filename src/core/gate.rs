//! 人工审批门
//!
//! 每轮只允许一次挂起：进入时生成 ApprovalRequest 作为挂起载荷；恢复时根据 ApprovalResponse
//! 保留或整体替换分类。替换分类不在封闭集合内为致命错误。

use crate::core::{
    ApprovalRecord, ApprovalRequest, ApprovalResponse, Classification, ClassificationType,
    ConversationState, OrchestratorError, UserResponse,
};

/// 人工指定分类时写入的 logic 标记
pub const OVERRIDE_LOGIC: &str = "用户选择的分类";

/// 提出待审批动作的描述
pub fn propose_action(state: &mut ConversationState) {
    state.proposed_action_details = format!(
        " 请审批下列意图分类 '{}'与分类原因'{} '",
        state.router.kind, state.router.logic
    );
}

/// 构造审批请求
pub fn approval_request(classification: &Classification) -> ApprovalRequest {
    ApprovalRequest {
        classification: classification.clone(),
        question: format!(
            "请问同意这个意图分类 '{}'与分类原因'{} '吗?不同意，请选择您需要的分类({})",
            classification.kind,
            classification.logic,
            ClassificationType::choices()
        ),
    }
}

/// 解析审批结果，返回生效的分类（不修改状态）
pub fn resolve(
    current: &Classification,
    response: &ApprovalResponse,
) -> Result<Classification, OrchestratorError> {
    match response.user_response {
        UserResponse::Approve => Ok(current.clone()),
        UserResponse::Reject => {
            let raw = response.kind.as_deref().unwrap_or("").trim();
            let kind: ClassificationType = raw
                .parse()
                .map_err(|_| OrchestratorError::InvalidApprovalOverride(raw.to_string()))?;
            Ok(Classification::new(kind, OVERRIDE_LOGIC))
        }
    }
}

/// 应用审批结果：更新分类、记录审计、标记动作已批准
pub fn apply_response(
    state: &mut ConversationState,
    turn: u64,
    response: &ApprovalResponse,
) -> Result<(), OrchestratorError> {
    let proposed = state.router.clone();
    let effective = resolve(&proposed, response)?;
    let approved = response.user_response == UserResponse::Approve;
    state.approval_history.push(ApprovalRecord {
        turn,
        proposed,
        approved,
        replacement: (!approved).then(|| effective.clone()),
    });
    state.router = effective;
    state.proposed_action_details = format!(
        "意图分类 '{}'与分类原因'{} '已经被人工审核批准",
        state.router.kind, state.router.logic
    );
    Ok(())
}
