//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、结构化输出解析

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod structured;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use structured::{extract_json_block, parse_structured};
pub use traits::{complete_with_system, LlmClient};
