//! 文件问答子流程
//!
//! 从沙箱工作区读取附件（.txt / .md / .csv / .json），内容作为文档交给归约器，
//! 再以文件内容为上下文回答问题。不支持的格式或读取失败时以空文档集继续，并记录降级。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Degradation;
use crate::llm::{complete_with_system, LlmClient};
use crate::memory::{format_documents, Document, DocumentUpdate, Message};
use crate::prompts;
use crate::tools::SafeFs;
use crate::workflow::{SubWorkflow, WorkflowError, WorkflowId, WorkflowOutput, WorkflowRequest};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json"];

pub struct FileWorkflow {
    llm: Arc<dyn LlmClient>,
    fs: SafeFs,
    template: String,
}

impl FileWorkflow {
    pub fn new(llm: Arc<dyn LlmClient>, workspace_root: impl AsRef<Path>) -> Self {
        Self {
            llm,
            fs: SafeFs::new(workspace_root),
            template: prompts::load_prompt("file", prompts::FILE_SYSTEM_PROMPT),
        }
    }

    async fn load(&self, path: &str) -> Result<Vec<Document>, WorkflowError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(WorkflowError::UnsupportedInputFormat(path.to_string()));
        }
        let content = self.fs.read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Document::from_content(content).with_metadata("source", path)])
    }
}

#[async_trait]
impl SubWorkflow for FileWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::File
    }

    async fn invoke(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let latest = request.latest();
        let path = latest
            .and_then(|m| m.file_path.clone())
            .unwrap_or_else(|| request.classification.logic.clone());

        let mut degradations = Vec::new();
        let docs = match self.load(&path).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "file not loaded, continuing without content");
                degradations.push(Degradation::UnsupportedInputFormat(format!("{}: {}", path, e)));
                Vec::new()
            }
        };

        let question = latest
            .map(|m| m.content.trim())
            .filter(|q| !q.is_empty())
            .unwrap_or(prompts::FILE_DEFAULT_QUESTION);
        let system = prompts::fill(&self.template, &[("documents", &format_documents(&docs))]);
        let answer = complete_with_system(self.llm.as_ref(), &system, &[Message::user(question)])
            .await
            .map_err(WorkflowError::Llm)?;

        let mut out = WorkflowOutput::message(Message::assistant(answer));
        if !docs.is_empty() {
            out = out.with_documents(DocumentUpdate::batch(docs));
        }
        out.degradations = degradations;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Classification, ClassificationType};
    use crate::llm::MockLlmClient;

    fn request(question: &str, path: &str) -> WorkflowRequest {
        WorkflowRequest {
            thread_id: "t".to_string(),
            messages: vec![Message::user(question).with_file(path)],
            classification: Classification::new(ClassificationType::FileQuestion, path),
            documents: Vec::new(),
            user_name: "u".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reads_file_and_returns_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "# 周报\n完成了路由模块").unwrap();
        let mock = Arc::new(MockLlmClient::with_replies(["本周完成了路由模块"]));
        let wf = FileWorkflow::new(mock.clone(), dir.path());

        let out = wf.invoke(request("", "notes.md")).await.unwrap();
        assert_eq!(out.messages[0].content, "本周完成了路由模块");
        assert_eq!(out.documents.len(), 1);
        assert!(out.degradations.is_empty());
        assert!(mock.system_prompts()[0].contains("完成了路由模块"));
    }

    #[tokio::test]
    async fn test_unsupported_format_yields_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scan.pdf"), "%PDF").unwrap();
        let mock = Arc::new(MockLlmClient::with_replies(["无法读取文件内容"]));
        let wf = FileWorkflow::new(mock, dir.path());

        let out = wf.invoke(request("总结一下", "scan.pdf")).await.unwrap();
        assert!(out.documents.is_empty());
        assert!(matches!(out.degradations[0], Degradation::UnsupportedInputFormat(_)));
        assert_eq!(out.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let wf = FileWorkflow::new(Arc::new(MockLlmClient::new()), dir.path());
        let out = wf.invoke(request("内容是什么", "gone.txt")).await.unwrap();
        assert!(out.documents.is_empty());
        assert_eq!(out.degradations.len(), 1);
    }
}
