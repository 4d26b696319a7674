//! 长期记忆提取与写入
//!
//! 每轮结束后让模型从对话中提取用户的兴趣与专业，值为“无”或空时跳过；
//! 每条事实以新的 UUID 为键写入，同一用户的历史记录会不断累积。

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::core::StoreError;
use crate::llm::{complete_with_system, parse_structured, LlmClient};
use crate::memory::{MemoryCategory, MemoryRecord, MemoryStore, MemoryValue, Message};
use crate::prompts;

/// 模型表示“没有发现”的哨兵值
pub const NO_FACT_SENTINEL: &str = "无";

#[derive(Error, Debug)]
pub enum MemoryWriteError {
    #[error("memory extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Deserialize)]
struct ExtractedFacts {
    #[serde(default)]
    interest: Option<String>,
    #[serde(default)]
    specialization: Option<String>,
}

impl ExtractedFacts {
    fn get(&self, category: MemoryCategory) -> Option<&str> {
        let value = match category {
            MemoryCategory::Interest => self.interest.as_deref(),
            MemoryCategory::Specialization => self.specialization.as_deref(),
        }?;
        let value = value.trim();
        (!value.is_empty() && value != NO_FACT_SENTINEL).then_some(value)
    }
}

/// 一次写入的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryWriteReport {
    pub written: Vec<MemoryRecord>,
}

impl MemoryWriteReport {
    pub fn count(&self) -> usize {
        self.written.len()
    }
}

pub struct MemoryWriter {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn MemoryStore>,
    template: String,
}

impl MemoryWriter {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            llm,
            store,
            template: prompts::load_prompt("memory", prompts::MEMORY_SYSTEM_PROMPT),
        }
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    pub async fn extract_and_store(
        &self,
        messages: &[Message],
        user_scope: &str,
    ) -> Result<MemoryWriteReport, MemoryWriteError> {
        let system = prompts::fill(&self.template, &[("user_name", user_scope)]);
        let reply = complete_with_system(self.llm.as_ref(), &system, messages)
            .await
            .map_err(MemoryWriteError::Extraction)?;
        let facts: ExtractedFacts = parse_structured(&reply).map_err(MemoryWriteError::Extraction)?;

        let mut report = MemoryWriteReport::default();
        for category in MemoryCategory::ALL {
            let Some(text) = facts.get(category) else {
                continue;
            };
            let key = uuid::Uuid::new_v4().to_string();
            let value = MemoryValue::new(text);
            self.store.put(user_scope, category, &key, value.clone()).await?;
            tracing::info!(user = %user_scope, category = %category, "memory written");
            report.written.push(MemoryRecord {
                user: user_scope.to_string(),
                category,
                key,
                value,
            });
        }
        Ok(report)
    }
}
