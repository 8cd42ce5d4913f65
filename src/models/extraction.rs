//! logic 脚本的提取结果

use serde_json::Value as JsonValue;

use crate::error::{AppResult, ExtractionError};

/// 结果容器的元素 id
pub const RESULT_CONTAINER_ID: &str = "chouten";

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// logic 写入容器的完整 JSON
    pub payload: JsonValue,
    /// 下一页地址，空字符串视为没有
    pub next_url: Option<String>,
}

impl ExtractionResult {
    /// 从容器文本解析结果
    pub fn parse(raw: &str) -> AppResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyContainer {
                container: RESULT_CONTAINER_ID,
            }
            .into());
        }

        let payload: JsonValue =
            serde_json::from_str(text).map_err(|source| ExtractionError::NotJson { source })?;
        let next_url = payload
            .get("nextUrl")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self { payload, next_url })
    }

    /// 格式化后的 payload，用于日志输出
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| self.payload.to_string())
    }
}
