//! chromiumoxide 实现的页面渲染
//!
//! 一次运行只启动一个浏览器，每个周期使用新的页面。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use chromiumoxide::cdp::browser_protocol::network::EventLoadingFailed;
use chromiumoxide::cdp::js_protocol::runtime::{
    EventConsoleApiCalled, EventExceptionThrown, RemoteObject,
};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{connect_to_browser, launch_headless_browser, PageRenderer, RenderedPage};
use crate::error::{AcquisitionError, AppError, AppResult};
use crate::infrastructure::JsExecutor;

/// 浏览器选项
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// 浏览器可执行文件，None 时自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 连接已有浏览器的调试端口，None 时启动新的无头浏览器
    pub debug_port: Option<u16>,
    /// 导航超时
    pub navigation_timeout: Duration,
}

struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
    owned: bool,
}

/// 基于 Chromium 的渲染器
///
/// 浏览器在第一次需要页面时才启动
pub struct ChromiumRenderer {
    options: BrowserOptions,
    handle: Mutex<Option<BrowserHandle>>,
}

impl ChromiumRenderer {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            handle: Mutex::new(None),
        }
    }

    /// 创建一个新的空白页面，必要时先启动浏览器
    async fn new_blank_page(&self) -> AppResult<Page> {
        let mut guard = self.handle.lock().await;

        if guard.is_none() {
            let (browser, handler, owned) = match self.options.debug_port {
                Some(port) => {
                    let (browser, handler) = connect_to_browser(port).await?;
                    (browser, handler, false)
                }
                None => {
                    let (browser, handler) =
                        launch_headless_browser(self.options.chrome_executable.as_deref()).await?;
                    (browser, handler, true)
                }
            };
            *guard = Some(BrowserHandle {
                browser,
                handler,
                owned,
            });
        }

        let handle = guard.as_ref().ok_or_else(|| AcquisitionError::BrowserLaunch {
            message: "浏览器未初始化".to_string(),
        })?;

        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AcquisitionError::PageCreation { source: Box::new(e) })?;

        Ok(page)
    }

    async fn set_scripting(page: &Page, enabled: bool) -> AppResult<()> {
        page.execute(SetScriptExecutionDisabledParams::new(!enabled))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn open_url(&self, url: &str) -> AppResult<Box<dyn RenderedPage>> {
        let page = self.new_blank_page().await?;
        let listeners = forward_page_events(&page).await;
        let timeout = self.options.navigation_timeout;

        let loaded = async {
            Self::set_scripting(&page, false).await?;
            match tokio::time::timeout(timeout, page.goto(url)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(AppError::navigation_failed(url, e)),
                Err(_) => {
                    return Err(AcquisitionError::Timeout {
                        what: format!("导航到 {}", url),
                        secs: timeout.as_secs(),
                    }
                    .into())
                }
            }
            Self::set_scripting(&page, true).await
        }
        .await;

        let rendered = ChromiumPage::new(page, listeners);
        if let Err(e) = loaded {
            let _ = Box::new(rendered).close().await;
            return Err(e);
        }

        debug!("页面已载入: {}", url);
        Ok(Box::new(rendered))
    }

    async fn open_html(&self, html: &str) -> AppResult<Box<dyn RenderedPage>> {
        let page = self.new_blank_page().await?;
        let listeners = forward_page_events(&page).await;

        let loaded = async {
            Self::set_scripting(&page, false).await?;
            page.set_content(html).await?;
            Self::set_scripting(&page, true).await
        }
        .await;

        let rendered = ChromiumPage::new(page, listeners);
        if let Err(e) = loaded {
            let _ = Box::new(rendered).close().await;
            return Err(e);
        }

        debug!("已载入 {} 字节的合成页面", html.len());
        Ok(Box::new(rendered))
    }

    async fn shutdown(&self) -> AppResult<()> {
        let Some(mut handle) = self.handle.lock().await.take() else {
            return Ok(());
        };

        if handle.owned {
            info!("关闭浏览器");
            if let Err(e) = handle.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            let _ = handle.browser.wait().await;
        }
        handle.handler.abort();
        Ok(())
    }
}

/// 一个 Chromium 页面
pub struct ChromiumPage {
    executor: JsExecutor,
    listeners: Vec<JoinHandle<()>>,
}

impl ChromiumPage {
    fn new(page: Page, listeners: Vec<JoinHandle<()>>) -> Self {
        Self {
            executor: JsExecutor::new(page),
            listeners,
        }
    }
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn add_script_url(&self, url: &str) -> AppResult<()> {
        let src = serde_json::to_string(url).map_err(|e| AcquisitionError::Import {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let script = format!(
            r#"
            new Promise((resolve, reject) => {{
                const script = document.createElement('script');
                script.src = {src};
                script.onload = () => resolve(true);
                script.onerror = () => reject(new Error('无法加载脚本 ' + {src}));
                (document.head || document.documentElement).appendChild(script);
            }})
            "#
        );

        self.executor
            .eval(script)
            .await
            .map_err(|e| AcquisitionError::Import {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        debug!("已加载外部脚本: {}", url);
        Ok(())
    }

    async fn evaluate(&self, script: &str, timeout: Duration) -> AppResult<JsonValue> {
        self.executor.eval_timeout(script, timeout).await
    }

    async fn html(&self) -> AppResult<String> {
        Ok(self.executor.page().content().await?)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        for listener in &self.listeners {
            listener.abort();
        }
        let ChromiumPage { executor, .. } = *self;
        executor.into_page().close().await?;
        Ok(())
    }
}

/// 把页面的 console 输出、未捕获异常和失败的请求转发到日志
async fn forward_page_events(page: &Page) -> Vec<JoinHandle<()>> {
    let mut listeners = Vec::new();

    if let Ok(mut events) = page.event_listener::<EventConsoleApiCalled>().await {
        listeners.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind: String = format!("{:?}", event.r#type)
                    .chars()
                    .take(3)
                    .collect::<String>()
                    .to_uppercase();
                let text = event
                    .args
                    .iter()
                    .map(describe_remote_object)
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(target: "page", "{}: {}", kind, text);
            }
        }));
    }

    if let Ok(mut events) = page.event_listener::<EventExceptionThrown>().await {
        listeners.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let details = &event.exception_details;
                let message = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                warn!(target: "page", "页面异常: {}", message);
            }
        }));
    }

    if let Ok(mut events) = page.event_listener::<EventLoadingFailed>().await {
        listeners.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!(target: "page", "请求失败: {}", event.error_text);
            }
        }));
    }

    listeners
}

fn describe_remote_object(object: &RemoteObject) -> String {
    match &object.value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => object.description.clone().unwrap_or_default(),
    }
}
