//! 通讯录子流程
//!
//! 通讯录为 JSON 数组；按姓名在问题中出现与否检索记录，再只依据检索到的记录作答。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{complete_with_system, LlmClient};
use crate::memory::{Message, Role};
use crate::prompts;
use crate::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub department: String,
}

impl Contact {
    pub async fn load_all(path: impl AsRef<Path>) -> Result<Vec<Contact>, WorkflowError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        serde_json::from_str(&raw).map_err(|e| WorkflowError::Failed(format!("address book: {}", e)))
    }
}

pub struct AddressBookWorkflow {
    llm: Arc<dyn LlmClient>,
    contacts: Vec<Contact>,
    template: String,
}

impl AddressBookWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, contacts: Vec<Contact>) -> Self {
        Self {
            llm,
            contacts,
            template: prompts::load_prompt("address_book", prompts::ADDRESS_BOOK_SYSTEM_PROMPT),
        }
    }

    /// 姓名出现在查询中的记录
    pub fn lookup(&self, query: &str) -> Vec<&Contact> {
        self.contacts
            .iter()
            .filter(|c| !c.name.is_empty() && query.contains(c.name.as_str()))
            .collect()
    }
}

#[async_trait]
impl SubWorkflow for AddressBookWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::AddressBook
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let mut hits = self.lookup(request.latest_text());
        if hits.is_empty() {
            // 追问时姓名常出现在更早的用户消息里
            let earlier: String = request
                .messages
                .iter()
                .filter(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            hits = self.lookup(&earlier);
        }
        tracing::debug!(hits = hits.len(), "address book lookup");

        let records = serde_json::to_string_pretty(&hits).map_err(|e| WorkflowError::Failed(e.to_string()))?;
        let system = prompts::fill(&self.template, &[("records", &records)]);
        let answer = complete_with_system(self.llm.as_ref(), &system, &request.messages)
            .await
            .map_err(WorkflowError::Llm)?;
        Ok(WorkflowOutput::message(Message::assistant(answer)))
    }
}
