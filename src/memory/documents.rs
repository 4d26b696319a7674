//! 文档归约器：按内容寻址合并文档集合
//!
//! 文档 id 优先取 metadata 中显式给出的 `uuid`，否则为内容的 SHA-256 派生 UUID；
//! 同一内容无论何时、由谁产生，id 都一致，因此重复合并是幂等的。

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// metadata 中承载文档 id 的键
pub const DOCUMENT_ID_KEY: &str = "uuid";

/// 内容寻址的文档单元
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// 由内容创建文档，id 为内容哈希
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let id = content_id(&content);
        let mut metadata = BTreeMap::new();
        metadata.insert(DOCUMENT_ID_KEY.to_string(), id.clone());
        Self {
            id,
            content,
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 部分文档：可能缺少 id，合并时补全
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDocument {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// 列表中的单个待合并项
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentItem {
    Text(String),
    Full(Document),
    Partial(PartialDocument),
}

impl From<&str> for DocumentItem {
    fn from(s: &str) -> Self {
        DocumentItem::Text(s.to_string())
    }
}

impl From<String> for DocumentItem {
    fn from(s: String) -> Self {
        DocumentItem::Text(s)
    }
}

impl From<Document> for DocumentItem {
    fn from(d: Document) -> Self {
        DocumentItem::Full(d)
    }
}

/// 归约器输入：清空哨兵、单个字符串、或一批文档
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentUpdate {
    /// 对应输入值 "delete"：清空整个集合
    DeleteAll,
    Single(String),
    Batch(Vec<DocumentItem>),
}

impl DocumentUpdate {
    /// 字符串边界：字面量 "delete" 为清空哨兵，其余视为单个文档
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text == "delete" {
            DocumentUpdate::DeleteAll
        } else {
            DocumentUpdate::Single(text)
        }
    }

    pub fn batch<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DocumentItem>,
    {
        DocumentUpdate::Batch(items.into_iter().map(Into::into).collect())
    }
}

/// 内容哈希 → UUID 格式的稳定 id
pub fn content_id(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Uuid::from_bytes(bytes).to_string()
}

fn explicit_id(metadata: &BTreeMap<String, String>) -> Option<String> {
    metadata
        .get(DOCUMENT_ID_KEY)
        .filter(|id| !id.trim().is_empty())
        .cloned()
}

fn normalize(item: DocumentItem) -> Document {
    match item {
        DocumentItem::Text(text) => Document::from_content(text),
        DocumentItem::Partial(partial) => {
            let id = explicit_id(&partial.metadata).unwrap_or_else(|| content_id(&partial.content));
            let mut metadata = partial.metadata;
            metadata.insert(DOCUMENT_ID_KEY.to_string(), id.clone());
            Document {
                id,
                content: partial.content,
                metadata,
            }
        }
        DocumentItem::Full(mut doc) => {
            let id = explicit_id(&doc.metadata)
                .or_else(|| Some(doc.id.clone()).filter(|id| !id.trim().is_empty()))
                .unwrap_or_else(|| content_id(&doc.content));
            doc.metadata.insert(DOCUMENT_ID_KEY.to_string(), id.clone());
            doc.id = id;
            doc
        }
    }
}

/// 合并文档集合：已有文档保持原顺序在前，新接纳的文档按输入顺序追加
pub fn reduce_documents(existing: &[Document], incoming: DocumentUpdate) -> Vec<Document> {
    let items = match incoming {
        DocumentUpdate::DeleteAll => return Vec::new(),
        DocumentUpdate::Single(text) => vec![DocumentItem::Text(text)],
        DocumentUpdate::Batch(items) => items,
    };

    let mut seen: HashSet<String> = existing.iter().map(|d| d.id.clone()).collect();
    let mut merged = existing.to_vec();
    for item in items {
        let doc = normalize(item);
        if seen.insert(doc.id.clone()) {
            merged.push(doc);
        }
    }
    merged
}

/// 将文档格式化为 LLM 上下文
pub fn format_documents(docs: &[Document]) -> String {
    if docs.is_empty() {
        return "<documents></documents>".to_string();
    }
    let body = docs
        .iter()
        .map(|d| {
            let meta = d
                .metadata
                .iter()
                .filter(|(k, _)| k.as_str() != DOCUMENT_ID_KEY)
                .map(|(k, v)| format!(" {}=\"{}\"", k, v))
                .collect::<String>();
            format!("<document{}>\n{}\n</document>", meta, d.content)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("<documents>\n{}\n</documents>", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(items: &[&str]) -> DocumentUpdate {
        DocumentUpdate::batch(items.iter().copied())
    }

    #[test]
    fn test_repeated_batches_do_not_duplicate() {
        let first = reduce_documents(&[], batch(&["小明在家里做了一个机器人", "小李在家里写作业"]));
        let second = reduce_documents(&first, batch(&["小明在家里做了一个机器人"]));
        assert_eq!(second.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_delete_clears_everything() {
        let docs = reduce_documents(&[], batch(&["a", "b", "c"]));
        assert!(reduce_documents(&docs, DocumentUpdate::from_text("delete")).is_empty());
        assert!(reduce_documents(&[], DocumentUpdate::DeleteAll).is_empty());
    }

    #[test]
    fn test_single_string_is_deduplicated() {
        let docs = reduce_documents(&[], DocumentUpdate::from_text("天气晴"));
        let again = reduce_documents(&docs, DocumentUpdate::from_text("天气晴"));
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, content_id("天气晴"));
    }

    #[test]
    fn test_sequential_batches_equal_combined_batch() {
        let d = reduce_documents(&[], batch(&["x"]));
        let sequential = reduce_documents(&reduce_documents(&d, batch(&["a", "b"])), batch(&["c"]));
        let combined = reduce_documents(&d, batch(&["a", "b", "c"]));
        assert_eq!(sequential, combined);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let docs = reduce_documents(&[], batch(&["同一句话", "同一句话"]));
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_explicit_metadata_id_wins() {
        let mut metadata = BTreeMap::new();
        metadata.insert(DOCUMENT_ID_KEY.to_string(), "fixed-id".to_string());
        let partial = DocumentItem::Partial(PartialDocument {
            content: "内容一".to_string(),
            metadata: metadata.clone(),
        });
        let other = DocumentItem::Partial(PartialDocument {
            content: "内容二".to_string(),
            metadata,
        });
        let docs = reduce_documents(&[], DocumentUpdate::Batch(vec![partial, other]));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "fixed-id");
        assert_eq!(docs[0].content, "内容一");
    }

    #[test]
    fn test_full_document_without_id_gets_content_id() {
        let doc = Document {
            id: String::new(),
            content: "无 id 文档".to_string(),
            metadata: BTreeMap::new(),
        };
        let docs = reduce_documents(&[], DocumentUpdate::batch(vec![doc]));
        assert_eq!(docs[0].id, content_id("无 id 文档"));
        assert_eq!(docs[0].metadata.get(DOCUMENT_ID_KEY), Some(&docs[0].id));
    }

    #[test]
    fn test_existing_order_preserved() {
        let docs = reduce_documents(&[], batch(&["1", "2"]));
        let merged = reduce_documents(&docs, batch(&["3", "1", "4"]));
        let contents: Vec<_> = merged.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_format_documents_hides_id() {
        let doc = Document::from_content("正文").with_metadata("source", "a.txt");
        let text = format_documents(&[doc]);
        assert!(text.contains("source=\"a.txt\""));
        assert!(!text.contains("uuid="));
    }
}
