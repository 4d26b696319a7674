//! 知识检索子流程
//!
//! Retriever 是检索后端的接缝；默认实现 KeywordRetriever 对知识文件分段后按字符二元组重叠打分。
//! 第一轮直接用用户原话检索，之后由模型改写查询。

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::{complete_with_system, parse_structured, LlmClient};
use crate::memory::{format_documents, Document, DocumentUpdate, Message, Role};
use crate::prompts;
use crate::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

/// 检索后端
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, WorkflowError>;
}

/// 关键词重叠检索（中文按字符二元组，英文按小写单词）
#[derive(Debug, Default, Clone)]
pub struct KeywordRetriever {
    docs: Vec<Document>,
}

fn terms(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    let mut out: HashSet<String> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1 && w.is_ascii())
        .map(str::to_string)
        .collect();
    let chars: Vec<char> = lower.chars().filter(|c| !c.is_ascii() && c.is_alphanumeric()).collect();
    for pair in chars.windows(2) {
        out.insert(pair.iter().collect());
    }
    out
}

impl KeywordRetriever {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    /// 以空行分段
    pub fn from_text(text: &str, source: &str) -> Self {
        let docs = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Document::from_content(p).with_metadata("source", source))
            .collect();
        Self { docs }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_text(&text, &path.display().to_string()))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, WorkflowError> {
        let q = terms(query);
        let mut scored: Vec<(usize, usize)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(i, d)| (terms(&d.content).intersection(&q).count(), i))
            .filter(|(score, _)| *score > 0)
            .collect();
        // 分数降序，同分保持原顺序
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().take(k).map(|(_, i)| self.docs[i].clone()).collect())
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    query: String,
}

/// 生成检索查询：首条用户消息原样使用，否则交给模型改写，失败时退回原话
pub(crate) async fn generate_query(llm: &dyn LlmClient, messages: &[Message]) -> String {
    let user_turns: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect();
    let latest = user_turns.last().copied().unwrap_or("").to_string();
    if user_turns.len() <= 1 {
        return latest;
    }
    let previous = user_turns[..user_turns.len() - 1].join("\n- ");
    let system = prompts::fill(prompts::QUERY_SYSTEM_PROMPT, &[("queries", &previous)]);
    match complete_with_system(llm, &system, messages).await {
        Ok(reply) => match parse_structured::<SearchQuery>(&reply) {
            Ok(q) if !q.query.trim().is_empty() => q.query,
            _ => latest,
        },
        Err(e) => {
            tracing::warn!(error = %e, "query rewrite failed, using latest message");
            latest
        }
    }
}

pub struct RetrievalWorkflow {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    k: usize,
}

impl RetrievalWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Arc<dyn Retriever>) -> Self {
        Self { llm, retriever, k: 4 }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }
}

#[async_trait]
impl SubWorkflow for RetrievalWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::Retrieval
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let query = generate_query(self.llm.as_ref(), &request.messages).await;
        let docs = self.retriever.retrieve(&query, self.k).await?;
        tracing::debug!(query = %query, hits = docs.len(), "retrieval");

        let system = prompts::fill(prompts::RESPONSE_SYSTEM_PROMPT, &[("context", &format_documents(&docs))]);
        let answer = complete_with_system(self.llm.as_ref(), &system, &request.messages)
            .await
            .map_err(WorkflowError::Llm)?;

        let mut out = WorkflowOutput::message(Message::assistant(answer));
        if !docs.is_empty() {
            out = out.with_documents(DocumentUpdate::batch(docs));
        }
        Ok(out)
    }
}
