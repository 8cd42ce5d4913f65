//! 请求描述（requestData() 的返回值）

use serde::Deserialize;

use crate::error::{AppResult, RequestSpecError};

/// 查询词占位符
pub const QUERY_PLACEHOLDER: &str = "<query>";

/// 默认的空格替换符
pub const DEFAULT_SEPARATOR: &str = "%20";

/// 请求目标
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestTarget {
    /// 带 `<query>` 占位符的 URL 模板
    pub url: Option<String>,
}

/// 请求描述
///
/// 每次模块运行只产生一次，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    #[serde(default)]
    request: Option<RequestTarget>,
    #[serde(default)]
    separator: Option<String>,
    #[serde(default)]
    uses_api: Option<bool>,
    #[serde(default)]
    imports: Option<Vec<String>>,
}

impl RequestSpec {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> AppResult<Self> {
        let spec = serde_json::from_str(text).map_err(|source| RequestSpecError::NotJson { source })?;
        Ok(spec)
    }

    /// URL 模板
    pub fn request_url(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.url.as_deref())
    }

    /// 是否走 API 模式
    pub fn uses_api(&self) -> bool {
        self.uses_api.unwrap_or(false)
    }

    /// 空格替换符，默认 `%20`
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    /// 需要额外加载的外部脚本
    pub fn imports(&self) -> &[String] {
        self.imports.as_deref().unwrap_or(&[])
    }

    /// 用查询词填充 URL 模板，并把空格替换为分隔符
    pub fn resolve(&self, query: &str) -> AppResult<String> {
        let template = self.request_url().ok_or(RequestSpecError::MissingUrl)?;
        Ok(template
            .replace(QUERY_PLACEHOLDER, query)
            .replace(' ', self.separator()))
    }
}
