//! 记忆层：对话消息、文档归约、长期记忆存储与提取

pub mod conversation;
pub mod documents;
pub mod long_term;
pub mod persistence;
pub mod writer;

pub use conversation::{last_user_text, merge_messages, Message, Role};
pub use documents::{
    content_id, format_documents, reduce_documents, Document, DocumentItem, DocumentUpdate,
    PartialDocument,
};
pub use long_term::{InMemoryMemoryStore, MemoryCategory, MemoryRecord, MemoryStore, MemoryValue};
pub use persistence::SqliteMemoryStore;
pub use writer::{MemoryWriteError, MemoryWriteReport, MemoryWriter, NO_FACT_SENTINEL};
