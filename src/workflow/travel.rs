//! 旅行规划子流程：与网页搜索相同的有界工具循环，换用旅行提示词与工具集

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;
use crate::prompts;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::workflow::{SubWorkflow, ToolLoop, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

pub struct TravelWorkflow {
    tool_loop: ToolLoop,
}

impl TravelWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, tool_timeout_secs: u64, iteration_limit: u32) -> Self {
        let template = prompts::load_prompt("travel", prompts::TRAVEL_SYSTEM_PROMPT);
        Self {
            tool_loop: ToolLoop::new(llm, ToolExecutor::new(tools, tool_timeout_secs), &template, iteration_limit),
        }
    }
}

#[async_trait]
impl SubWorkflow for TravelWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::Travel
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let result = self.tool_loop.run(&[Message::user(request.latest_text())]).await?;
        if result.budget_exhausted {
            tracing::info!(thread_id = %request.thread_id, tool_calls = result.tool_calls, "travel answered after tool budget");
        }
        Ok(WorkflowOutput::text(result.answer))
    }
}
