//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：complete 返回整段回复文本。

use async_trait::async_trait;

use crate::memory::Message;

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}

/// 拼接 system + 历史后调用 LLM
pub async fn complete_with_system(
    llm: &dyn LlmClient,
    system: &str,
    history: &[Message],
) -> Result<String, String> {
    let mut full = Vec::with_capacity(history.len() + 1);
    full.push(Message::system(system.to_string()));
    full.extend(history.iter().cloned());
    llm.complete(&full).await
}
