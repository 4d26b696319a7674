//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! 按顺序返回预置回复；预置回复用尽后回退到 fallback。`offline()` 提供一个按提示词类型
//! 给出合法结构化输出的离线版本，便于不联网跑通完整流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{last_user_text, Message, Role};
use crate::prompts;

type Fallback = Box<dyn Fn(&[Message]) -> String + Send + Sync>;

/// 可编排的 Mock 客户端，记录每次调用收到的消息
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
    fallback: Fallback,
}

impl std::fmt::Debug for MockLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLlmClient")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::with_fallback(|messages| {
            format!("Echo from Mock: {}", last_user_text(messages).unwrap_or("(no input)"))
        })
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(f: impl Fn(&[Message]) -> String + Send + Sync + 'static) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fallback: Box::new(f),
        }
    }

    /// 依次返回给定回复
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::default();
        for r in replies {
            mock.push_reply(r);
        }
        mock
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply.into()));
        }
    }

    /// 下一次调用返回错误
    pub fn push_error(&self, err: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err.into()));
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 所有调用中 system 消息的内容（按调用顺序）
    pub fn system_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|msgs| msgs.iter().find(|m| m.role == Role::System))
                    .map(|m| m.content.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 离线模式：按 system 提示词识别调用场景，返回对应的合法输出
    pub fn offline() -> Self {
        Self::with_fallback(offline_reply)
    }
}

fn offline_reply(messages: &[Message]) -> String {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .unwrap_or("");
    let question = last_user_text(messages).unwrap_or("");

    if system == prompts::ROUTER_SYSTEM_PROMPT {
        let kind = if ["电话", "手机", "邮箱", "地址"].iter().any(|k| question.contains(k)) {
            "address_book"
        } else if ["旅行", "路线", "天气"].iter().any(|k| question.contains(k)) {
            "travel"
        } else if question.to_lowercase().contains("langgraph") {
            "langgraph"
        } else if question.to_lowercase().contains("langchain") {
            "langchain"
        } else {
            "general"
        };
        return serde_json::json!({ "type": kind, "logic": "离线关键词分类" }).to_string();
    }
    if system.starts_with("你是一名智能助手，负责从消息历史中提取") {
        return serde_json::json!({ "interest": "无", "specialization": "无" }).to_string();
    }
    if system == prompts::RESEARCH_PLAN_SYSTEM_PROMPT {
        return serde_json::json!({ "steps": [question] }).to_string();
    }
    if system.starts_with("根据对话生成一个用于检索知识库的查询") {
        return serde_json::json!({ "query": question }).to_string();
    }
    format!("Echo from Mock: {}", question)
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let scripted = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match scripted {
            Some(reply) => reply,
            None => Ok((self.fallback)(messages)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_then_fallback() {
        let mock = MockLlmClient::with_replies(["第一条"]);
        let msgs = vec![Message::user("你好")];
        assert_eq!(mock.complete(&msgs).await.unwrap(), "第一条");
        assert_eq!(mock.complete(&msgs).await.unwrap(), "Echo from Mock: 你好");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let mock = MockLlmClient::new();
        mock.push_error("rate limited");
        assert!(mock.complete(&[Message::user("x")]).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_router_keywords() {
        let mock = MockLlmClient::offline();
        let msgs = vec![
            Message::system(prompts::ROUTER_SYSTEM_PROMPT),
            Message::user("张三的电话是什么"),
        ];
        let reply = mock.complete(&msgs).await.unwrap();
        assert!(reply.contains("address_book"));
    }
}
