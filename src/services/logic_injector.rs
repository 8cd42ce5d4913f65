//! logic 注入 - 业务能力层
//!
//! 在页面中创建结果容器，把 logic 片段作为 `<script>` 插入执行，
//! 随后移除脚本元素，读取容器文本作为结果。页面用完即关闭。

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AcquisitionError, AppError, AppResult, ExtractionError};
use crate::models::{ExtractionResult, RESULT_CONTAINER_ID};
use crate::services::AcquiredContent;

#[derive(Debug, Deserialize)]
struct InjectionReport {
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: Option<String>,
}

/// logic 注入器
#[derive(Debug, Clone)]
pub struct LogicInjector {
    timeout: Duration,
}

impl LogicInjector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 在内容页面中执行 logic 片段，返回提取结果
    ///
    /// 无论成功与否，页面都会被关闭
    pub async fn inject(
        &self,
        content: AcquiredContent,
        logic_fragment: &str,
    ) -> AppResult<ExtractionResult> {
        let script = injection_script(logic_fragment)?;
        let page = content.into_page();

        let evaluated = page.evaluate(&script, self.timeout).await;
        if let Err(e) = page.close().await {
            debug!("关闭页面失败: {}", e);
        }

        let value = evaluated.map_err(|e| match e {
            AppError::AcquisitionFailed(AcquisitionError::Timeout { secs, .. }) => {
                AppError::from(ExtractionError::Timeout { secs })
            }
            other => AppError::from(ExtractionError::Evaluation {
                source: Box::new(other),
            }),
        })?;

        let report: InjectionReport = serde_json::from_value(value)
            .map_err(|source| ExtractionError::NotJson { source })?;

        if let Some(message) = report.error {
            return Err(ExtractionError::ScriptError { message }.into());
        }

        ExtractionResult::parse(&report.output)
    }
}

/// 构造注入脚本
///
/// logic 片段以 JSON 字符串字面量嵌入，避免破坏外层脚本
pub fn injection_script(logic_fragment: &str) -> AppResult<String> {
    let logic = serde_json::to_string(logic_fragment)
        .map_err(|source| ExtractionError::NotJson { source })?;
    let container = serde_json::to_string(RESULT_CONTAINER_ID)
        .map_err(|source| ExtractionError::NotJson { source })?;

    Ok(format!(
        r#"(() => {{
    const root = document.body || document.documentElement;
    const container = document.createElement('div');
    container.setAttribute('id', {container});
    root.prepend(container);

    let failure = null;
    const onError = (event) => {{
        failure = event.message || String(event.error);
    }};
    window.addEventListener('error', onError);

    const script = document.createElement('script');
    script.textContent = {logic};
    try {{
        root.appendChild(script);
    }} finally {{
        script.remove();
        window.removeEventListener('error', onError);
    }}

    const output = container.innerText || container.textContent || '';
    return {{ output: output, error: failure }};
}})()"#
    ))
}
