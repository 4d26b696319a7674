//! 主控编排：一轮对话的完整流程
//!
//! submit：合并用户消息 → 分类 → 提出待审批动作 → 写检查点并挂起。
//! resume：读取检查点 → 应用审批结果 → 分派到子流程 → 合并结果 → 写长期记忆 → 完成。
//!
//! 同一线程的调用由 ThreadLocks 串行化。resume 直到轮次完成才把线程移出 AwaitingApproval，
//! 中途崩溃时线程仍可再次恢复；完成后重复投递的审批结果直接返回上次的报告。

use std::sync::Arc;

use crate::checkpoint::{CheckpointStore, ThreadCheckpoint};
use crate::core::thread_lock::ThreadLocks;
use crate::core::{
    gate, router, ApprovalRequest, ApprovalResponse, Classifier, ConversationState, Degradation,
    OrchestratorError, ThreadPhase, TurnFlags, TurnOutcome, TurnReport,
};
use crate::memory::{Message, MemoryWriter, Role};
use crate::workflow::{WorkflowExecutor, WorkflowOutput, WorkflowRequest};

/// 子流程失败时代替结果的回复
pub const DEGRADED_REPLY: &str = "抱歉，处理您的请求时出现了问题，请稍后再试。";

pub struct Supervisor {
    classifier: Classifier,
    executor: WorkflowExecutor,
    memory_writer: Option<MemoryWriter>,
    checkpoints: Arc<dyn CheckpointStore>,
    locks: ThreadLocks,
    default_user: String,
}

impl Supervisor {
    pub(crate) fn new(
        classifier: Classifier,
        executor: WorkflowExecutor,
        memory_writer: Option<MemoryWriter>,
        checkpoints: Arc<dyn CheckpointStore>,
        default_user: String,
    ) -> Self {
        Self {
            classifier,
            executor,
            memory_writer,
            checkpoints,
            locks: ThreadLocks::new(),
            default_user,
        }
    }

    pub fn memory_writer(&self) -> Option<&MemoryWriter> {
        self.memory_writer.as_ref()
    }

    /// 开始新的一轮，返回挂起载荷
    pub async fn submit(
        &self,
        thread_id: &str,
        message: Message,
        flags: TurnFlags,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let _guard = self.locks.acquire(thread_id).await;

        let mut cp = match self.checkpoints.load(thread_id).await? {
            Some(cp) => cp,
            None => ThreadCheckpoint::new(thread_id, &self.default_user),
        };
        if cp.is_awaiting() {
            tracing::warn!(thread_id, turn = cp.turn, "new message while awaiting approval, abandoning pending turn");
            cp.pending_approval = None;
        }
        if let Some(user) = flags.user_name {
            cp.user_name = user;
        }

        cp.state.apply_messages([message]);
        cp.state.choose_web_search = flags.web_search;

        let classification = self.classifier.classify(&cp.state).await?;
        tracing::info!(
            thread_id,
            classification = %classification.kind,
            logic = %classification.logic,
            "turn classified"
        );

        cp.turn += 1;
        cp.suspensions_in_turn = 0;
        cp.state.router = classification;
        gate::propose_action(&mut cp.state);
        self.suspend(&mut cp).await
    }

    /// 挂起并写检查点；本轮已挂起过时返回 GateInvariant，检查点不变
    async fn suspend(&self, cp: &mut ThreadCheckpoint) -> Result<TurnOutcome, OrchestratorError> {
        let request = mark_suspended(cp)?;
        self.checkpoints.save(cp).await?;
        tracing::info!(thread_id = %cp.thread_id, turn = cp.turn, "suspended for approval");
        Ok(TurnOutcome::suspended(&request))
    }

    /// 用审批结果恢复挂起的线程并完成本轮
    pub async fn resume(
        &self,
        thread_id: &str,
        response: ApprovalResponse,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let _guard = self.locks.acquire(thread_id).await;

        let mut cp = self
            .checkpoints
            .load(thread_id)
            .await?
            .ok_or_else(|| OrchestratorError::MissingSuspendedState(thread_id.to_string()))?;

        match cp.phase {
            ThreadPhase::AwaitingApproval => {}
            ThreadPhase::Completed => {
                if let Some(report) = cp.last_report.clone() {
                    tracing::info!(thread_id, turn = cp.turn, "approval redelivered after completion");
                    return Ok(TurnOutcome::Completed(report));
                }
                return Err(OrchestratorError::MissingSuspendedState(thread_id.to_string()));
            }
            ThreadPhase::Idle => {
                return Err(OrchestratorError::MissingSuspendedState(thread_id.to_string()));
            }
        }

        let pending = cp.pending_approval.clone().ok_or_else(|| {
            OrchestratorError::GateInvariant(format!("thread {} awaiting approval without a request", thread_id))
        })?;

        // 在副本上执行，轮次完成前不改动检查点
        let mut state = cp.state.clone();
        state.router = pending.classification;
        gate::apply_response(&mut state, cp.turn, &response)?;

        let route = router::route(state.router.kind);
        tracing::info!(thread_id, route = %route, classification = %state.router.kind, "dispatching");

        let request = WorkflowRequest {
            thread_id: thread_id.to_string(),
            messages: state.messages.clone(),
            classification: state.router.clone(),
            documents: state.documents.clone(),
            user_name: cp.user_name.clone(),
        };
        let mut degradations = Vec::new();
        let output = match self.executor.invoke(route, request).await? {
            Ok(out) if !out.is_empty() => out,
            Ok(_) => {
                tracing::warn!(thread_id, route = %route, "workflow returned nothing");
                degradations.push(Degradation::SubWorkflowFailure(format!("{} returned an empty result", route)));
                WorkflowOutput::text(DEGRADED_REPLY)
            }
            Err(e) => {
                tracing::warn!(thread_id, route = %route, error = %e, "workflow failed, degrading");
                degradations.push(Degradation::SubWorkflowFailure(format!("{}: {}", route, e)));
                WorkflowOutput::text(DEGRADED_REPLY)
            }
        };
        let reply = merge_output(&mut state, output, &mut degradations);

        let memories_written = self
            .write_memories(thread_id, &state, &cp.user_name, &mut degradations)
            .await;

        let report = TurnReport {
            thread_id: thread_id.to_string(),
            turn: cp.turn,
            classification: state.router.clone(),
            workflow: route.as_str().to_string(),
            reply,
            document_count: state.documents.len(),
            memories_written,
            degradations,
        };
        if report.is_degraded() {
            tracing::warn!(thread_id, degradations = ?report.degradations, "turn completed with degradations");
        }

        state.choose_web_search = false;
        cp.state = state;
        cp.phase = ThreadPhase::Completed;
        cp.pending_approval = None;
        cp.last_report = Some(report.clone());
        cp.touch();
        self.checkpoints.save(&cp).await?;
        tracing::info!(thread_id, turn = cp.turn, workflow = %route, "turn completed");

        Ok(TurnOutcome::Completed(report))
    }

    async fn write_memories(
        &self,
        thread_id: &str,
        state: &ConversationState,
        user: &str,
        degradations: &mut Vec<Degradation>,
    ) -> usize {
        let Some(writer) = &self.memory_writer else {
            return 0;
        };
        match writer.extract_and_store(&state.messages, user).await {
            Ok(report) => report.count(),
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "memory write failed");
                degradations.push(Degradation::MemoryWriteFailure(e.to_string()));
                0
            }
        }
    }

    /// 线程当前的检查点
    pub async fn thread(&self, thread_id: &str) -> Result<Option<ThreadCheckpoint>, OrchestratorError> {
        Ok(self.checkpoints.load(thread_id).await?)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<bool, OrchestratorError> {
        let removed = {
            let _guard = self.locks.acquire(thread_id).await;
            self.checkpoints.delete(thread_id).await?
        };
        self.locks.forget(thread_id).await;
        Ok(removed)
    }

    pub async fn list_threads(&self) -> Result<Vec<String>, OrchestratorError> {
        Ok(self.checkpoints.list_threads().await?)
    }
}

/// 登记本轮的挂起：每轮至多一次
fn mark_suspended(cp: &mut ThreadCheckpoint) -> Result<ApprovalRequest, OrchestratorError> {
    if cp.suspensions_in_turn >= 1 {
        return Err(OrchestratorError::GateInvariant(format!(
            "thread {} already suspended in turn {}",
            cp.thread_id, cp.turn
        )));
    }
    let request = gate::approval_request(&cp.state.router);
    cp.suspensions_in_turn += 1;
    cp.pending_approval = Some(request.clone());
    cp.phase = ThreadPhase::AwaitingApproval;
    cp.touch();
    Ok(request)
}

/// 把子流程结果合并进状态，返回本轮的助手回复
fn merge_output(
    state: &mut ConversationState,
    output: WorkflowOutput,
    degradations: &mut Vec<Degradation>,
) -> Option<String> {
    let WorkflowOutput {
        mut messages,
        documents,
        result_text,
        degradations: absorbed,
    } = output;

    if let Some(text) = result_text {
        messages.push(Message::assistant(text));
    }
    let reply = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.clone());

    state.apply_messages(messages);
    for update in documents {
        state.apply_documents(update);
    }
    degradations.extend(absorbed);
    reply
}
