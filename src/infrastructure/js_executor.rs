//! JS 执行器 - 基础设施层
//!
//! 持有一个 page 资源，只暴露"执行 JS"的能力

use std::time::Duration;

use chromiumoxide::Page;
use serde_json::Value as JsonValue;

use crate::error::{AcquisitionError, AppResult};

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源
/// - 暴露 eval() 能力
/// - 不认识模块 / 请求描述
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 取回 page 的所有权（用于关闭页面）
    pub fn into_page(self) -> Page {
        self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// Promise 会被等待，返回值按值传回
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result
            .into_value()
            .map_err(|e| AcquisitionError::Cdp { source: Box::new(e) })?;
        Ok(json_value)
    }

    /// 带超时执行 JS 代码
    pub async fn eval_timeout(
        &self,
        js_code: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<JsonValue> {
        match tokio::time::timeout(timeout, self.eval(js_code)).await {
            Ok(result) => result,
            Err(_) => Err(AcquisitionError::Timeout {
                what: "页面脚本".to_string(),
                secs: timeout.as_secs(),
            }
            .into()),
        }
    }
}
