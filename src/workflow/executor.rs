//! 子流程注册表与执行器
//!
//! WorkflowRegistry 按 WorkflowId 存放 Arc<dyn SubWorkflow>；WorkflowExecutor 在超时内调用，
//! 每次调用输出结构化审计日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::OrchestratorError;
use crate::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<WorkflowId, Arc<dyn SubWorkflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 workflow.id() 注册，同 id 覆盖
    pub fn register(&mut self, workflow: impl SubWorkflow + 'static) {
        self.register_arc(Arc::new(workflow));
    }

    pub fn register_arc(&mut self, workflow: Arc<dyn SubWorkflow>) {
        self.workflows.insert(workflow.id(), workflow);
    }

    pub fn get(&self, id: WorkflowId) -> Option<Arc<dyn SubWorkflow>> {
        self.workflows.get(&id).cloned()
    }

    /// 分派表中的每个目标都必须有实现
    pub fn missing(&self) -> Vec<WorkflowId> {
        WorkflowId::ALL
            .into_iter()
            .filter(|id| !self.workflows.contains_key(id))
            .collect()
    }

    pub fn ensure_complete(&self) -> Result<(), OrchestratorError> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(OrchestratorError::WorkflowNotRegistered(
            missing.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(", "),
        ))
    }
}

/// 子流程执行器：统一超时与审计
pub struct WorkflowExecutor {
    registry: WorkflowRegistry,
    timeout: Duration,
}

impl WorkflowExecutor {
    pub fn new(registry: WorkflowRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// 未注册为致命错误；子流程自身的失败与超时以 Err(WorkflowError) 返回，由编排层降级处理
    pub async fn invoke(
        &self,
        id: WorkflowId,
        request: WorkflowRequest,
    ) -> Result<Result<WorkflowOutput, WorkflowError>, OrchestratorError> {
        let workflow = self
            .registry
            .get(id)
            .ok_or_else(|| OrchestratorError::WorkflowNotRegistered(id.to_string()))?;

        let thread_id = request.thread_id.clone();
        let start = Instant::now();
        let result = match timeout(self.timeout, workflow.invoke(request)).await {
            Ok(r) => r,
            Err(_) => Err(WorkflowError::Timeout(self.timeout.as_millis() as u64)),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(WorkflowError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "workflow_audit",
            "workflow": id.as_str(),
            "thread_id": thread_id,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "workflow");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::Classification;

    struct Fixed(WorkflowId);

    #[async_trait]
    impl SubWorkflow for Fixed {
        fn id(&self) -> WorkflowId {
            self.0
        }

        async fn invoke(&self, _request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
            Ok(WorkflowOutput::text(self.0.as_str()))
        }
    }

    struct Slow;

    #[async_trait]
    impl SubWorkflow for Slow {
        fn id(&self) -> WorkflowId {
            WorkflowId::Travel
        }

        async fn invoke(&self, _request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(WorkflowOutput::text("late"))
        }
    }

    fn request() -> WorkflowRequest {
        WorkflowRequest {
            thread_id: "t".to_string(),
            messages: Vec::new(),
            classification: Classification::default(),
            documents: Vec::new(),
            user_name: "u".to_string(),
        }
    }

    #[test]
    fn test_missing_reports_unregistered() {
        let mut registry = WorkflowRegistry::new();
        registry.register(Fixed(WorkflowId::File));
        assert_eq!(registry.missing().len(), 7);
        assert!(registry.ensure_complete().is_err());

        for id in WorkflowId::ALL {
            registry.register(Fixed(id));
        }
        assert!(registry.ensure_complete().is_ok());
    }

    #[tokio::test]
    async fn test_invoke_unregistered_is_fatal() {
        let executor = WorkflowExecutor::new(WorkflowRegistry::new(), 5);
        let err = executor.invoke(WorkflowId::File, request()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::WorkflowNotRegistered(_)));
    }

    #[tokio::test]
    async fn test_invoke_timeout_is_workflow_error() {
        let mut registry = WorkflowRegistry::new();
        registry.register(Slow);
        let executor = WorkflowExecutor {
            registry,
            timeout: Duration::from_millis(20),
        };
        let inner = executor.invoke(WorkflowId::Travel, request()).await.unwrap();
        let err = inner.unwrap_err();
        assert!(matches!(err, WorkflowError::Timeout(20)));
        assert_eq!(err.to_string(), "Workflow timed out after 20ms");
    }
}
