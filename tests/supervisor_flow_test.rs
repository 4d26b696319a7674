//! 编排流程集成测试：submit / resume 端到端，子流程用桩实现

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hive::checkpoint::{CheckpointStore, SqliteCheckpointStore};
use hive::core::{
    ApprovalResponse, ClassificationType, Degradation, OrchestratorError, Supervisor,
    SupervisorBuilder, ThreadPhase, TurnFlags, TurnOutcome, TurnReport, DEGRADED_REPLY,
    OVERRIDE_LOGIC,
};
use hive::llm::MockLlmClient;
use hive::memory::{
    last_user_text, DocumentUpdate, InMemoryMemoryStore, MemoryCategory, MemoryStore, Message, Role,
};
use hive::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

const ROUTER: &str = "ROUTER";
const NO_FACTS: &str = r#"{"interest": "无", "specialization": "无"}"#;

#[derive(Clone, Copy)]
enum Behavior {
    Reply,
    Fail,
    /// 每次返回同一段文档
    Docs(&'static str),
}

struct Stub {
    id: WorkflowId,
    calls: Arc<AtomicUsize>,
    behavior: Behavior,
}

#[async_trait]
impl SubWorkflow for Stub {
    fn id(&self) -> WorkflowId {
        self.id
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Reply => Ok(WorkflowOutput::text(format!(
                "{} 已处理: {}",
                self.id,
                request.latest_text()
            ))),
            Behavior::Fail => Err(WorkflowError::Failed("collaborator unavailable".to_string())),
            Behavior::Docs(content) => Ok(WorkflowOutput::text("已检索")
                .with_documents(DocumentUpdate::batch([content]))),
        }
    }
}

/// 按关键词给出分类，其余调用视为记忆提取
fn scripted_llm(memory_reply: &'static str) -> Arc<MockLlmClient> {
    Arc::new(MockLlmClient::with_fallback(move |msgs| {
        let system = msgs
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        if system != ROUTER {
            return memory_reply.to_string();
        }
        let text = last_user_text(msgs).unwrap_or("");
        let kind = if text.contains("电话") {
            "address_book"
        } else if text.contains("旅行") {
            "travel"
        } else if text.contains("未知") {
            "weather"
        } else if text.contains("LangGraph") {
            "langgraph"
        } else {
            "general"
        };
        serde_json::json!({ "type": kind, "logic": format!("关键词判断为 {}", kind) }).to_string()
    }))
}

struct Harness {
    supervisor: Supervisor,
    calls: HashMap<WorkflowId, Arc<AtomicUsize>>,
    llm: Arc<MockLlmClient>,
    memory: Arc<InMemoryMemoryStore>,
}

impl Harness {
    fn calls(&self, id: WorkflowId) -> usize {
        self.calls[&id].load(Ordering::SeqCst)
    }

    fn total_calls(&self) -> usize {
        self.calls.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

fn harness_with(
    memory_reply: &'static str,
    behaviors: &[(WorkflowId, Behavior)],
    checkpoints: Option<Arc<dyn CheckpointStore>>,
) -> Harness {
    let llm = scripted_llm(memory_reply);
    let memory = Arc::new(InMemoryMemoryStore::new());
    let mut builder = SupervisorBuilder::new(llm.clone())
        .with_router_prompt(ROUTER)
        .with_memory_store(memory.clone());
    if let Some(store) = checkpoints {
        builder = builder.with_checkpoint_store(store);
    }

    let mut calls = HashMap::new();
    for id in WorkflowId::ALL {
        let counter = Arc::new(AtomicUsize::new(0));
        calls.insert(id, counter.clone());
        let behavior = behaviors
            .iter()
            .find(|(w, _)| *w == id)
            .map(|(_, b)| *b)
            .unwrap_or(Behavior::Reply);
        builder = builder.register(Stub {
            id,
            calls: counter,
            behavior,
        });
    }

    Harness {
        supervisor: builder.build().unwrap(),
        calls,
        llm,
        memory,
    }
}

fn harness() -> Harness {
    harness_with(NO_FACTS, &[], None)
}

fn completed(outcome: TurnOutcome) -> TurnReport {
    match outcome {
        TurnOutcome::Completed(r) => r,
        TurnOutcome::Suspended(p) => panic!("expected completion, got suspension: {}", p.question),
    }
}

#[tokio::test]
async fn test_address_book_question_suspends_then_dispatches_on_approve() {
    let h = harness();

    let outcome = h
        .supervisor
        .submit("t1", Message::user("张三的电话是什么"), TurnFlags::default())
        .await
        .unwrap();
    let payload = outcome.as_suspension().unwrap().clone();
    assert!(payload.question.contains("address_book"));
    assert_eq!(payload.classification_type, "address_book");
    assert_eq!(h.total_calls(), 0);

    let cp = h.supervisor.thread("t1").await.unwrap().unwrap();
    assert_eq!(cp.phase, ThreadPhase::AwaitingApproval);
    assert_eq!(cp.suspensions_in_turn, 1);

    let report = completed(h.supervisor.resume("t1", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.classification.kind, ClassificationType::AddressBook);
    assert_eq!(report.workflow, "address_book_agent");
    assert_eq!(h.calls(WorkflowId::AddressBook), 1);
    assert_eq!(h.total_calls(), 1);
    assert!(report.reply.as_ref().unwrap().contains("张三的电话是什么"));
    assert!(!report.is_degraded());

    let cp = h.supervisor.thread("t1").await.unwrap().unwrap();
    assert_eq!(cp.phase, ThreadPhase::Completed);
    assert!(cp.pending_approval.is_none());
    assert_eq!(cp.state.messages.len(), 2);
    assert_eq!(cp.state.messages[1].role, Role::Assistant);
    assert!(cp.state.proposed_action_details.contains("已经被人工审核批准"));
}

#[tokio::test]
async fn test_file_attachment_shortcut_skips_reasoning() {
    let h = harness();
    let outcome = h
        .supervisor
        .submit(
            "t-file",
            Message::user("这份文件讲了什么").with_file("docs/report.md"),
            TurnFlags::web_search(),
        )
        .await
        .unwrap();
    let payload = outcome.as_suspension().unwrap();
    assert_eq!(payload.classification_type, "file_question");
    assert_eq!(payload.classification_logic, "docs/report.md");
    assert_eq!(h.llm.call_count(), 0);

    let report = completed(h.supervisor.resume("t-file", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.workflow, "file_agent");
}

#[tokio::test]
async fn test_web_search_flag_shortcut() {
    let h = harness();
    let outcome = h
        .supervisor
        .submit("t-web", Message::user("张三的电话是什么"), TurnFlags::web_search())
        .await
        .unwrap();
    assert_eq!(outcome.as_suspension().unwrap().classification_type, "web_search");
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_reject_replaces_classification_and_keeps_audit() {
    let h = harness();
    h.supervisor
        .submit("t2", Message::user("张三的电话是什么"), TurnFlags::default())
        .await
        .unwrap();

    let report = completed(
        h.supervisor
            .resume("t2", ApprovalResponse::reject("web_search"))
            .await
            .unwrap(),
    );
    assert_eq!(report.classification.kind, ClassificationType::WebSearch);
    assert_eq!(report.classification.logic, OVERRIDE_LOGIC);
    assert_eq!(report.workflow, "conduct_web_search");
    assert_eq!(h.calls(WorkflowId::WebSearch), 1);
    assert_eq!(h.calls(WorkflowId::AddressBook), 0);

    let cp = h.supervisor.thread("t2").await.unwrap().unwrap();
    let record = &cp.state.approval_history[0];
    assert!(!record.approved);
    assert_eq!(record.proposed.kind, ClassificationType::AddressBook);
    assert_eq!(record.proposed.logic, "关键词判断为 address_book");
}

#[tokio::test]
async fn test_invalid_override_is_rejected_and_thread_stays_resumable() {
    let h = harness();
    h.supervisor
        .submit("t3", Message::user("张三的电话是什么"), TurnFlags::default())
        .await
        .unwrap();

    let err = h
        .supervisor
        .resume("t3", ApprovalResponse::reject("weather"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidApprovalOverride(t) if t == "weather"));
    assert_eq!(h.total_calls(), 0);

    let cp = h.supervisor.thread("t3").await.unwrap().unwrap();
    assert_eq!(cp.phase, ThreadPhase::AwaitingApproval);
    assert!(cp.state.approval_history.is_empty());

    let report = completed(h.supervisor.resume("t3", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.workflow, "address_book_agent");
}

#[tokio::test]
async fn test_redelivered_response_does_not_dispatch_twice() {
    let h = harness();
    h.supervisor
        .submit("t4", Message::user("你好"), TurnFlags::default())
        .await
        .unwrap();

    let first = completed(h.supervisor.resume("t4", ApprovalResponse::approve()).await.unwrap());
    let second = completed(h.supervisor.resume("t4", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(first, second);
    assert_eq!(h.calls(WorkflowId::RespondGeneral), 1);

    let cp = h.supervisor.thread("t4").await.unwrap().unwrap();
    assert_eq!(cp.state.messages.len(), 2);
}

#[tokio::test]
async fn test_resume_without_suspension_is_missing_state() {
    let h = harness();
    let err = h
        .supervisor
        .resume("never-seen", ApprovalResponse::approve())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::MissingSuspendedState(t) if t == "never-seen"));
}

#[tokio::test]
async fn test_unknown_classification_is_fatal_and_nothing_saved() {
    let h = harness();
    let err = h
        .supervisor
        .submit("t5", Message::user("未知的问题"), TurnFlags::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::UnknownClassification(t) if t == "weather"));
    assert!(h.supervisor.thread("t5").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_sentinel_writes_nothing() {
    let h = harness();
    h.supervisor
        .submit("t6", Message::user("你好").with_id("m-1"), TurnFlags::default().for_user("张三"))
        .await
        .unwrap();
    let report = completed(h.supervisor.resume("t6", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.memories_written, 0);
    for category in MemoryCategory::ALL {
        assert!(h.memory.list("张三", category).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_memory_facts_are_scoped_to_user() {
    let h = harness_with(r#"{"interest": "羽毛球", "specialization": "无"}"#, &[], None);
    h.supervisor
        .submit("t7", Message::user("我周末喜欢打羽毛球"), TurnFlags::default().for_user("李四"))
        .await
        .unwrap();
    let report = completed(h.supervisor.resume("t7", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.memories_written, 1);

    let interests = h.memory.list("李四", MemoryCategory::Interest).await.unwrap();
    assert_eq!(interests.len(), 1);
    assert_eq!(interests[0].value.text, "羽毛球");
    assert!(h.memory.list("unknown", MemoryCategory::Interest).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sub_workflow_failure_degrades_but_completes() {
    let h = harness_with(NO_FACTS, &[(WorkflowId::Travel, Behavior::Fail)], None);
    h.supervisor
        .submit("t8", Message::user("五一去哪旅行"), TurnFlags::default())
        .await
        .unwrap();
    let report = completed(h.supervisor.resume("t8", ApprovalResponse::approve()).await.unwrap());

    assert_eq!(report.reply.as_deref(), Some(DEGRADED_REPLY));
    assert!(matches!(report.degradations[0], Degradation::SubWorkflowFailure(_)));
    let cp = h.supervisor.thread("t8").await.unwrap().unwrap();
    assert_eq!(cp.phase, ThreadPhase::Completed);
}

#[tokio::test]
async fn test_memory_failure_degrades_but_completes() {
    let h = harness_with("不是 JSON", &[], None);
    h.supervisor
        .submit("t9", Message::user("你好"), TurnFlags::default())
        .await
        .unwrap();
    let report = completed(h.supervisor.resume("t9", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.memories_written, 0);
    assert!(matches!(report.degradations[0], Degradation::MemoryWriteFailure(_)));
    assert!(report.reply.is_some());
}

#[tokio::test]
async fn test_documents_deduplicated_across_turns() {
    let h = harness_with(NO_FACTS, &[(WorkflowId::Research, Behavior::Docs("LangGraph 是状态图框架"))], None);
    for _ in 0..2 {
        h.supervisor
            .submit("t10", Message::user("LangGraph 是什么"), TurnFlags::default())
            .await
            .unwrap();
        let report = completed(h.supervisor.resume("t10", ApprovalResponse::approve()).await.unwrap());
        assert_eq!(report.document_count, 1);
    }
    assert_eq!(h.calls(WorkflowId::Research), 2);
}

#[tokio::test]
async fn test_submit_while_awaiting_abandons_pending_turn() {
    let h = harness();
    h.supervisor
        .submit("t11", Message::user("张三的电话是什么"), TurnFlags::default())
        .await
        .unwrap();
    let outcome = h
        .supervisor
        .submit("t11", Message::user("算了，帮我规划旅行"), TurnFlags::default())
        .await
        .unwrap();
    assert_eq!(outcome.as_suspension().unwrap().classification_type, "travel");

    let report = completed(h.supervisor.resume("t11", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.turn, 2);
    assert_eq!(report.workflow, "conduct_travel_search");
    assert_eq!(h.calls(WorkflowId::AddressBook), 0);
}

#[tokio::test]
async fn test_suspended_thread_resumes_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threads.db");

    {
        let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::open(&path).unwrap());
        let h = harness_with(NO_FACTS, &[], Some(store));
        h.supervisor
            .submit("t12", Message::user("张三的电话是什么"), TurnFlags::default())
            .await
            .unwrap();
    }

    let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::open(&path).unwrap());
    let h = harness_with(NO_FACTS, &[], Some(store));
    let report = completed(h.supervisor.resume("t12", ApprovalResponse::approve()).await.unwrap());
    assert_eq!(report.workflow, "address_book_agent");
    assert_eq!(h.calls(WorkflowId::AddressBook), 1);
}

#[tokio::test]
async fn test_threads_are_independent() {
    let h = Arc::new(harness());
    let mut handles = Vec::new();
    for i in 0..4 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            let thread = format!("par-{}", i);
            h.supervisor
                .submit(&thread, Message::user("你好"), TurnFlags::default())
                .await
                .unwrap();
            completed(h.supervisor.resume(&thread, ApprovalResponse::approve()).await.unwrap())
        }));
    }
    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.turn, 1);
    }
    assert_eq!(h.calls(WorkflowId::RespondGeneral), 4);
    assert_eq!(h.supervisor.list_threads().await.unwrap().len(), 4);

    assert!(h.supervisor.delete_thread("par-0").await.unwrap());
    assert!(h.supervisor.thread("par-0").await.unwrap().is_none());
}
