//! 有界工具循环
//!
//! 每一步让模型输出工具调用或最终答案；工具调用次数超过上限后不再执行工具，
//! 注入“工具使用次数达到上限”并要求模型基于已有结果作答。预算耗尽不会返回错误。

use std::sync::Arc;

use crate::llm::{complete_with_system, LlmClient};
use crate::memory::Message;
use crate::prompts;
use crate::tools::{parse_tool_output, tool_call_schema_json, ToolExecutor, ToolOutput};
use crate::workflow::WorkflowError;

/// 循环结果
#[derive(Debug, Clone)]
pub struct ToolLoopResult {
    pub answer: String,
    /// 实际执行的工具调用次数
    pub tool_calls: u32,
    pub budget_exhausted: bool,
    /// 循环内部的消息（工具调用与观察）
    pub transcript: Vec<Message>,
}

pub struct ToolLoop {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    system_prompt: String,
    iteration_limit: u32,
}

impl ToolLoop {
    /// `template` 中的 `{tools}` / `{schema}` 按注册的工具填充
    pub fn new(llm: Arc<dyn LlmClient>, executor: ToolExecutor, template: &str, iteration_limit: u32) -> Self {
        let schema = tool_call_schema_json();
        let system_prompt = prompts::fill(
            template,
            &[("tools", &executor.registry().describe()), ("schema", &schema)],
        );
        Self {
            llm,
            executor,
            system_prompt,
            iteration_limit,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub async fn run(&self, history: &[Message]) -> Result<ToolLoopResult, WorkflowError> {
        let mut transcript: Vec<Message> = Vec::new();
        let mut tool_calls = 0u32;

        loop {
            let context: Vec<Message> = history.iter().chain(transcript.iter()).cloned().collect();
            let reply = complete_with_system(self.llm.as_ref(), &self.system_prompt, &context)
                .await
                .map_err(WorkflowError::Llm)?;

            let call = match parse_tool_output(&reply) {
                ToolOutput::Answer(answer) => {
                    return Ok(ToolLoopResult {
                        answer,
                        tool_calls,
                        budget_exhausted: false,
                        transcript,
                    });
                }
                ToolOutput::Call(call) => call,
            };

            if tool_calls >= self.iteration_limit {
                tracing::warn!(limit = self.iteration_limit, tool = %call.tool, "tool budget exhausted");
                return self.answer_with_budget_exhausted(history, transcript, tool_calls).await;
            }

            tool_calls += 1;
            let observation = match self.executor.execute(&call.tool, call.args.clone()).await {
                Ok(out) => out,
                Err(e) => format!("Error: {}", e),
            };
            transcript.push(Message::assistant(reply));
            transcript.push(Message::tool(format!("[{}] {}", call.tool, observation)));
        }
    }

    /// 预算耗尽：注入提示后再调用一次模型，其输出原样作为答案
    async fn answer_with_budget_exhausted(
        &self,
        history: &[Message],
        mut transcript: Vec<Message>,
        tool_calls: u32,
    ) -> Result<ToolLoopResult, WorkflowError> {
        transcript.push(Message::assistant(prompts::TOOL_BUDGET_EXHAUSTED));
        transcript.push(Message::user(prompts::TOOL_LOOP_ANSWER_PROMPT));
        let context: Vec<Message> = history.iter().chain(transcript.iter()).cloned().collect();
        let reply = complete_with_system(self.llm.as_ref(), &self.system_prompt, &context)
            .await
            .map_err(WorkflowError::Llm)?;
        let answer = match parse_tool_output(&reply) {
            ToolOutput::Answer(a) => a,
            // 仍然想调用工具时只能如实说明
            ToolOutput::Call(_) => prompts::TOOL_BUDGET_EXHAUSTED.to_string(),
        };
        Ok(ToolLoopResult {
            answer,
            tool_calls,
            budget_exhausted: true,
            transcript,
        })
    }
}
