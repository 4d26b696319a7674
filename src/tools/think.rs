//! 反思工具：记录一次阶段性思考，不访问外部资源

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "每次获取结果后用于反思：已经得到哪些关键信息、还缺什么、是否可以作答。Args: {\"reflection\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "reflection": { "type": "string" } },
            "required": ["reflection"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let reflection = args
            .get("reflection")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if reflection.is_empty() {
            return Err("Missing reflection".to_string());
        }
        Ok(format!("Reflection: {}", reflection))
    }
}
