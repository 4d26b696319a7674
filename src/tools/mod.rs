//! 工具：供 web-search / travel 循环调用的 Tool 实现与注册表

pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod schema;
pub mod search;
pub mod think;

pub use executor::ToolExecutor;
pub use filesystem::SafeFs;
pub use registry::{Tool, ToolRegistry};
pub use schema::{parse_tool_output, tool_call_schema_json, ToolCall, ToolOutput};
pub use search::SearchTool;
pub use think::ThinkTool;
