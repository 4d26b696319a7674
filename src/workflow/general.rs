//! 终端节点：常规问题直接回复、信息不足时追问
//!
//! 各只调用一次模型，system prompt 中带上分类原因。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{complete_with_system, LlmClient};
use crate::memory::Message;
use crate::prompts;
use crate::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

async fn reply_once(
    llm: &dyn LlmClient,
    template: &str,
    request: &WorkflowRequest,
) -> Result<WorkflowOutput, WorkflowError> {
    let system = prompts::fill(template, &[("logic", &request.classification.logic)]);
    let reply = complete_with_system(llm, &system, &request.messages)
        .await
        .map_err(WorkflowError::Llm)?;
    Ok(WorkflowOutput::message(Message::assistant(reply)))
}

pub struct RespondGeneralWorkflow {
    llm: Arc<dyn LlmClient>,
    template: String,
}

impl RespondGeneralWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            template: prompts::load_prompt("general", prompts::GENERAL_SYSTEM_PROMPT),
        }
    }
}

#[async_trait]
impl SubWorkflow for RespondGeneralWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::RespondGeneral
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        reply_once(self.llm.as_ref(), &self.template, &request).await
    }
}

pub struct MoreInfoWorkflow {
    llm: Arc<dyn LlmClient>,
    template: String,
}

impl MoreInfoWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            template: prompts::load_prompt("more_info", prompts::MORE_INFO_SYSTEM_PROMPT),
        }
    }
}

#[async_trait]
impl SubWorkflow for MoreInfoWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::AskForMoreInfo
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        reply_once(self.llm.as_ref(), &self.template, &request).await
    }
}
