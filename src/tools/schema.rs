//! 工具调用格式：schemars 生成的 JSON Schema 注入 system prompt，parse_tool_output 解析模型回复
//!
//! 模型每一步要么输出 `{"tool": "...", "args": {...}}`，要么直接给出最终答案。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::llm::extract_json_block;

/// 工具调用请求格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 search、think
    pub tool: String,
    /// 工具参数，依工具不同而不同（url、reflection 等）
    pub args: HashMap<String, String>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 模型发起的一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// 单步输出
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// 最终答案
    Answer(String),
    Call(ToolCall),
}

/// 含合法且 tool 非空的 JSON 时为 Call，其余一律视为最终答案
pub fn parse_tool_output(output: &str) -> ToolOutput {
    let trimmed = output.trim();
    let call = extract_json_block(trimmed)
        .and_then(|json| serde_json::from_str::<ToolCall>(json).ok())
        .filter(|c| !c.tool.trim().is_empty());
    match call {
        Some(c) => ToolOutput::Call(c),
        None => ToolOutput::Answer(trimmed.to_string()),
    }
}
