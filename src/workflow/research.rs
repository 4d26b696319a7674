//! 研究子流程
//!
//! 先由模型制定至多 3 步的研究计划，清空文档集合后逐步检索，最后基于累计文档作答。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::{complete_with_system, parse_structured, LlmClient};
use crate::memory::{format_documents, reduce_documents, DocumentUpdate, Message};
use crate::prompts;
use crate::workflow::{Retriever, SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

pub const MAX_RESEARCH_STEPS: usize = 3;

#[derive(Debug, Deserialize)]
struct ResearchPlan {
    #[serde(default)]
    steps: Vec<String>,
}

pub struct ResearchWorkflow {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    k: usize,
}

impl ResearchWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Arc<dyn Retriever>) -> Self {
        Self { llm, retriever, k: 3 }
    }

    async fn plan(&self, messages: &[Message], fallback: &str) -> Result<Vec<String>, WorkflowError> {
        let reply = complete_with_system(self.llm.as_ref(), prompts::RESEARCH_PLAN_SYSTEM_PROMPT, messages)
            .await
            .map_err(WorkflowError::Llm)?;
        let plan: ResearchPlan = parse_structured(&reply).map_err(WorkflowError::Llm)?;
        let mut steps: Vec<String> = plan
            .steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_RESEARCH_STEPS)
            .collect();
        if steps.is_empty() {
            steps.push(fallback.to_string());
        }
        Ok(steps)
    }
}

#[async_trait]
impl SubWorkflow for ResearchWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::Research
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let steps = self.plan(&request.messages, request.latest_text()).await?;
        tracing::debug!(steps = steps.len(), "research plan");

        let mut updates = vec![DocumentUpdate::DeleteAll];
        let mut collected = Vec::new();
        for step in &steps {
            let docs = self.retriever.retrieve(step, self.k).await?;
            if docs.is_empty() {
                continue;
            }
            let update = DocumentUpdate::batch(docs);
            collected = reduce_documents(&collected, update.clone());
            updates.push(update);
        }

        let system = prompts::fill(prompts::RESPONSE_SYSTEM_PROMPT, &[("context", &format_documents(&collected))]);
        let answer = complete_with_system(self.llm.as_ref(), &system, &request.messages)
            .await
            .map_err(WorkflowError::Llm)?;

        Ok(WorkflowOutput {
            messages: vec![Message::assistant(answer)],
            documents: updates,
            ..WorkflowOutput::default()
        })
    }
}
