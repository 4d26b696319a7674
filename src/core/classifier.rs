//! 意图分类器
//!
//! 确定性快捷规则优先于模型推理：
//! 1. 最新消息带文件引用 → file_question（logic 为文件路径）
//! 2. 本轮设置了网页搜索标志 → web_search
//! 3. 否则由 LLM 读取完整历史给出 (type, logic)；type 不在封闭集合内即为致命错误

use std::sync::Arc;

use serde::Deserialize;

use crate::core::{Classification, ClassificationType, ConversationState, OrchestratorError};
use crate::llm::{complete_with_system, parse_structured, LlmClient};
use crate::prompts;

/// 选择网页搜索时写入的分类原因
pub const WEB_SEARCH_LOGIC: &str = "用户选择了网页搜索";

/// 模型的原始结构化输出（type 先按字符串接收，在边界处校验）
#[derive(Debug, Deserialize)]
struct RawRouter {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    logic: String,
}

pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: prompts::load_prompt("router", prompts::ROUTER_SYSTEM_PROMPT),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub async fn classify(&self, state: &ConversationState) -> Result<Classification, OrchestratorError> {
        if let Some(c) = Self::shortcut(state) {
            tracing::debug!(classification = %c.kind, "classified by shortcut");
            return Ok(c);
        }

        let reply = complete_with_system(self.llm.as_ref(), &self.system_prompt, &state.messages)
            .await
            .map_err(OrchestratorError::Llm)?;
        let raw: RawRouter = parse_structured(&reply).map_err(OrchestratorError::Llm)?;

        let mut kind: ClassificationType = raw.kind.parse()?;
        // 模型偶尔把 address_book 写进 logic 而 type 填错；其余类别名一律不改写 type
        if raw.logic.trim() == ClassificationType::AddressBook.as_str() {
            kind = ClassificationType::AddressBook;
        }
        tracing::debug!(classification = %kind, "classified by model");
        Ok(Classification::new(kind, raw.logic))
    }

    /// 不调用模型的确定性分类
    fn shortcut(state: &ConversationState) -> Option<Classification> {
        if let Some(path) = state
            .latest_message()
            .filter(|m| m.has_attachment())
            .and_then(|m| m.file_path.clone())
        {
            return Some(Classification::new(ClassificationType::FileQuestion, path));
        }
        if state.choose_web_search {
            return Some(Classification::new(ClassificationType::WebSearch, WEB_SEARCH_LOGIC));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::Message;

    fn state_with(msg: Message) -> ConversationState {
        let mut s = ConversationState::new();
        s.apply_messages(vec![msg]);
        s
    }

    #[tokio::test]
    async fn test_file_shortcut_skips_model() {
        let mock = Arc::new(MockLlmClient::with_replies([r#"{"type":"general","logic":"x"}"#]));
        let classifier = Classifier::new(mock.clone());
        let state = state_with(Message::user("张三的电话是什么").with_file("docs/report.txt"));

        let c = classifier.classify(&state).await.unwrap();
        assert_eq!(c.kind, ClassificationType::FileQuestion);
        assert_eq!(c.logic, "docs/report.txt");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_file_shortcut_beats_web_flag() {
        let mock = Arc::new(MockLlmClient::new());
        let classifier = Classifier::new(mock.clone());
        let mut state = state_with(Message::user("总结一下").with_file("a.md"));
        state.choose_web_search = true;
        let c = classifier.classify(&state).await.unwrap();
        assert_eq!(c.kind, ClassificationType::FileQuestion);
    }

    #[tokio::test]
    async fn test_web_flag_shortcut() {
        let mock = Arc::new(MockLlmClient::new());
        let classifier = Classifier::new(mock.clone());
        let mut state = state_with(Message::user("今天的新闻"));
        state.choose_web_search = true;
        let c = classifier.classify(&state).await.unwrap();
        assert_eq!(c.kind, ClassificationType::WebSearch);
        assert_eq!(c.logic, WEB_SEARCH_LOGIC);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_path() {
        let mock = Arc::new(MockLlmClient::with_replies([
            "```json\n{\"type\": \"address_book\", \"logic\": \"询问电话\"}\n```",
        ]));
        let classifier = Classifier::new(mock.clone());
        let c = classifier
            .classify(&state_with(Message::user("张三的电话是什么")))
            .await
            .unwrap();
        assert_eq!(c.kind, ClassificationType::AddressBook);
        assert_eq!(c.logic, "询问电话");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_address_book_named_in_logic_wins() {
        let mock = Arc::new(MockLlmClient::with_replies([r#"{"type":"general","logic":"address_book"}"#]));
        let classifier = Classifier::new(mock);
        let c = classifier
            .classify(&state_with(Message::user("李四住哪")))
            .await
            .unwrap();
        assert_eq!(c.kind, ClassificationType::AddressBook);
    }

    #[tokio::test]
    async fn test_other_category_in_logic_keeps_model_type() {
        let mock = Arc::new(MockLlmClient::with_replies([r#"{"type":"travel","logic":"general"}"#]));
        let classifier = Classifier::new(mock);
        let c = classifier
            .classify(&state_with(Message::user("帮我规划去杭州的旅行")))
            .await
            .unwrap();
        assert_eq!(c.kind, ClassificationType::Travel);
        assert_eq!(c.logic, "general");
    }

    #[tokio::test]
    async fn test_unknown_type_is_fatal() {
        let mock = Arc::new(MockLlmClient::with_replies([r#"{"type":"weather","logic":"问天气"}"#]));
        let classifier = Classifier::new(mock);
        let err = classifier
            .classify(&state_with(Message::user("明天下雨吗")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownClassification(t) if t == "weather"));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_llm_error() {
        let mock = Arc::new(MockLlmClient::with_replies(["我觉得是常规问题"]));
        let classifier = Classifier::new(mock);
        let err = classifier
            .classify(&state_with(Message::user("你好")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Llm(_)));
    }
}
