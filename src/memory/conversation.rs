//! 对话消息与消息归约
//!
//! 消息列表默认只追加；若新消息的 id 与已有消息相同，则原地替换（保持位置不变）。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// 单条消息；`file_path` 为用户附带的文件引用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            file_path: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// 附带文件引用（文件问答走快捷分类）
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// 指定稳定 id（同 id 的后续消息会覆盖本条）
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_attachment(&self) -> bool {
        self.file_path
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4())
}

/// 合并消息：同 id 覆盖，新 id 追加；无 id 的消息先分配新 id
pub fn merge_messages(existing: &mut Vec<Message>, incoming: impl IntoIterator<Item = Message>) {
    for mut msg in incoming {
        if msg.id.is_empty() {
            msg.id = new_message_id();
        }
        match existing.iter_mut().find(|m| m.id == msg.id) {
            Some(slot) => *slot = msg,
            None => existing.push(msg),
        }
    }
}

/// 取最后一条 User 消息的文本
pub fn last_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_appends_new_ids() {
        let mut messages = vec![Message::user("你好")];
        merge_messages(&mut messages, vec![Message::assistant("你好，有什么可以帮你？")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_merge_replaces_same_id_in_place() {
        let mut messages = vec![
            Message::user("第一条").with_id("a"),
            Message::assistant("第二条").with_id("b"),
        ];
        merge_messages(&mut messages, vec![Message::user("改写第一条").with_id("a")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "改写第一条");
        assert_eq!(messages[1].id, "b");
    }

    #[test]
    fn test_merge_assigns_missing_id() {
        let mut messages = Vec::new();
        merge_messages(&mut messages, vec![Message::user("x").with_id("")]);
        assert!(!messages[0].id.is_empty());
    }

    #[test]
    fn test_attachment_detection() {
        assert!(Message::user("看看").with_file("report.txt").has_attachment());
        assert!(!Message::user("看看").with_file("  ").has_attachment());
        assert!(!Message::user("看看").has_attachment());
    }
}
