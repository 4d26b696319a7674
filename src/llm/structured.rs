//! 结构化输出解析
//!
//! 模型被要求只输出一个 JSON 对象，但常常包在 ```json 代码块里或夹杂说明文字；
//! 这里统一抽出 JSON 片段再反序列化。

use serde::de::DeserializeOwned;

/// 从文本中提取 JSON 片段（```json ... ``` 或首个 '{' 到最后一个 '}'）
pub fn extract_json_block(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 解析模型的结构化输出
pub fn parse_structured<T: DeserializeOwned>(output: &str) -> Result<T, String> {
    let json = extract_json_block(output).ok_or_else(|| format!("no JSON object in reply: {}", output.trim()))?;
    serde_json::from_str(json).map_err(|e| format!("{}: {}", e, json))
}
