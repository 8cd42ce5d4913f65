//! 测试用的内存实现：不访问网络，不启动浏览器

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value as JsonValue};

use module_harness::browser::{PageRenderer, RenderedPage};
use module_harness::error::{AcquisitionError, AppResult};
use module_harness::infrastructure::ApiFetcher;
use module_harness::services::html_wrapper::{restore, JSON_ELEMENT_ID};

/// 一次外部调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// API 请求
    Fetch(String),
    /// 页面导航
    Navigate(String),
    /// 载入合成 HTML
    LoadHtml(String),
    /// 加载外部脚本
    AddScript(String),
    /// 关闭页面
    ClosePage,
}

/// 共享的调用记录
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fetch(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn html_loads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::LoadHtml(_)))
            .count()
    }

    pub fn closes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ClosePage))
            .count()
    }

    pub fn pages_opened(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Navigate(_) | Call::LoadHtml(_)))
            .count()
    }
}

/// 按 URL 返回固定 JSON 的 API
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, JsonValue>,
    log: CallLog,
}

impl FakeFetcher {
    pub fn new(log: &CallLog) -> Self {
        Self {
            responses: HashMap::new(),
            log: log.clone(),
        }
    }

    pub fn respond(mut self, url: &str, body: JsonValue) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }
}

#[async_trait]
impl ApiFetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> AppResult<JsonValue> {
        self.log.push(Call::Fetch(url.to_string()));
        self.responses.get(url).cloned().ok_or_else(|| {
            AcquisitionError::BadStatus {
                url: url.to_string(),
                status: 404,
            }
            .into()
        })
    }
}

/// 页面中 logic 的执行结果
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// 写入 #chouten 的文本
    Output(String),
    /// logic 抛出异常
    ScriptError(String),
}

/// 浏览器渲染的内存实现
///
/// - 导航：按 URL 查找预设的 logic 结果，未预设的 URL 视为导航失败
/// - 合成 HTML：logic 把 `data-json` 中的 JSON 原样写入结果容器
#[derive(Default)]
pub struct FakeRenderer {
    pages: HashMap<String, PageOutcome>,
    log: CallLog,
}

impl FakeRenderer {
    pub fn new(log: &CallLog) -> Self {
        Self {
            pages: HashMap::new(),
            log: log.clone(),
        }
    }

    /// 预设页面上 logic 写入的结果
    pub fn page(mut self, url: &str, payload: JsonValue, next_url: Option<&str>) -> Self {
        let output = json!({ "payload": payload, "nextUrl": next_url.unwrap_or("") });
        self.pages
            .insert(url.to_string(), PageOutcome::Output(output.to_string()));
        self
    }

    pub fn page_outcome(mut self, url: &str, outcome: PageOutcome) -> Self {
        self.pages.insert(url.to_string(), outcome);
        self
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn open_url(&self, url: &str) -> AppResult<Box<dyn RenderedPage>> {
        self.log.push(Call::Navigate(url.to_string()));
        let outcome = self.pages.get(url).cloned().ok_or_else(|| {
            module_harness::AppError::navigation_failed(
                url,
                std::io::Error::new(std::io::ErrorKind::NotFound, "net::ERR_NAME_NOT_RESOLVED"),
            )
        })?;
        Ok(Box::new(FakePage {
            html: format!("<html><body>{}</body></html>", url),
            outcome,
            log: self.log.clone(),
        }))
    }

    async fn open_html(&self, html: &str) -> AppResult<Box<dyn RenderedPage>> {
        self.log.push(Call::LoadHtml(html.to_string()));
        let document = Html::parse_document(html);
        let selector = Selector::parse(&format!("#{}", JSON_ELEMENT_ID)).unwrap();
        let embedded = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("data-json"))
            .map(restore)
            .unwrap_or_default();
        Ok(Box::new(FakePage {
            html: html.to_string(),
            outcome: PageOutcome::Output(embedded),
            log: self.log.clone(),
        }))
    }

    async fn shutdown(&self) -> AppResult<()> {
        Ok(())
    }
}

struct FakePage {
    html: String,
    outcome: PageOutcome,
    log: CallLog,
}

#[async_trait]
impl RenderedPage for FakePage {
    async fn add_script_url(&self, url: &str) -> AppResult<()> {
        self.log.push(Call::AddScript(url.to_string()));
        Ok(())
    }

    async fn evaluate(&self, _script: &str, _timeout: Duration) -> AppResult<JsonValue> {
        Ok(match &self.outcome {
            PageOutcome::Output(output) => json!({ "output": output, "error": null }),
            PageOutcome::ScriptError(message) => json!({ "output": "", "error": message }),
        })
    }

    async fn html(&self) -> AppResult<String> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.log.push(Call::ClosePage);
        Ok(())
    }
}

/// 构造模块源码
///
/// `request` 是 requestData() 返回的对象字面量
pub fn module_source(request: &str) -> String {
    format!(
        r#"function requestData() {{
    return JSON.stringify({request});
}}

function logic() {{
    const data = document.getElementById('json-result');
    document.getElementById('chouten').innerText = data ? data.dataset.json : '{{}}';
}}
"#
    )
}

/// 浏览器模式的模块
pub fn browser_module(url_template: &str) -> String {
    module_source(&format!(
        "{{ request: {{ url: {:?} }}, usesApi: false, imports: [] }}",
        url_template
    ))
}

/// API 模式的模块
pub fn api_module(url_template: &str) -> String {
    module_source(&format!(
        "{{ request: {{ url: {:?} }}, usesApi: true, imports: [] }}",
        url_template
    ))
}

/// 写一个最小的项目目录
pub fn write_project(dir: &std::path::Path) {
    std::fs::write(
        dir.join("metadata.json"),
        r#"{"name":"Demo","general":{"author":"tester"},"version":"0.1.0","formatVersion":1}"#,
    )
    .unwrap();
}
