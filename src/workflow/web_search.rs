//! 网页搜索子流程：带白名单抓取工具的有界工具循环

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;
use crate::prompts;
use crate::tools::{SearchTool, ThinkTool, ToolExecutor, ToolRegistry};
use crate::workflow::{SubWorkflow, ToolLoop, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

pub struct WebSearchWorkflow {
    tool_loop: ToolLoop,
}

impl WebSearchWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, tool_timeout_secs: u64, iteration_limit: u32) -> Self {
        let template = prompts::load_prompt("web_search", prompts::WEB_SEARCH_SYSTEM_PROMPT);
        Self {
            tool_loop: ToolLoop::new(llm, ToolExecutor::new(tools, tool_timeout_secs), &template, iteration_limit),
        }
    }

    /// 默认工具集：search + think
    pub fn with_search_tool(llm: Arc<dyn LlmClient>, search: SearchTool, tool_timeout_secs: u64, iteration_limit: u32) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(search);
        tools.register(ThinkTool);
        Self::new(llm, tools, tool_timeout_secs, iteration_limit)
    }
}

#[async_trait]
impl SubWorkflow for WebSearchWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::WebSearch
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let question = Message::user(request.latest_text());
        let result = self.tool_loop.run(&[question]).await?;
        tracing::debug!(
            tool_calls = result.tool_calls,
            budget_exhausted = result.budget_exhausted,
            "web search finished"
        );
        Ok(WorkflowOutput::text(result.answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Classification, ClassificationType};
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_answer_becomes_result_text() {
        let mock = Arc::new(MockLlmClient::with_replies([
            r#"{"tool": "think", "args": {"reflection": "无需搜索"}}"#,
            "Rust 1.0 于 2015 年发布",
        ]));
        let search = SearchTool::new(vec!["zh.wikipedia.org".to_string()], 5, 1000);
        let wf = WebSearchWorkflow::with_search_tool(mock.clone(), search, 5, 3);
        let out = wf
            .invoke(WorkflowRequest {
                thread_id: "t".to_string(),
                messages: vec![Message::user("今天天气"), Message::user("Rust 哪年发布")],
                classification: Classification::new(ClassificationType::WebSearch, "用户选择了网页搜索"),
                documents: Vec::new(),
                user_name: "u".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(out.result_text.as_deref(), Some("Rust 1.0 于 2015 年发布"));
        assert!(mock.system_prompts()[0].contains("- search:"));
    }
}
