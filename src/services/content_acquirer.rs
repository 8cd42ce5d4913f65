//! 内容获取 - 业务能力层
//!
//! - API 模式：直接请求 JSON，包装成合成 HTML 后载入页面（不导航）
//! - 浏览器模式：禁用脚本导航到目标页面，再启用脚本并加载 imports（不直接请求）

use std::fmt::{self, Display};

use tracing::debug;

use crate::browser::{PageRenderer, RenderedPage};
use crate::error::{AcquisitionError, AppResult};
use crate::infrastructure::ApiFetcher;
use crate::models::RequestSpec;
use crate::services::html_wrapper;

/// 获取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// 浏览器渲染页面
    Browser,
    /// 直接请求 API
    Api,
}

impl AcquisitionMode {
    pub fn for_spec(spec: &RequestSpec) -> Self {
        if spec.uses_api() {
            AcquisitionMode::Api
        } else {
            AcquisitionMode::Browser
        }
    }
}

impl Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionMode::Browser => f.write_str("browser"),
            AcquisitionMode::Api => f.write_str("api"),
        }
    }
}

/// 获取到的内容
///
/// 持有已载入内容的页面，交给 logic 注入后释放
pub struct AcquiredContent {
    mode: AcquisitionMode,
    url: String,
    html: String,
    page: Box<dyn RenderedPage>,
}

impl AcquiredContent {
    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// 内容来源地址
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 载入时的 HTML 快照（API 模式下为合成文档）
    pub fn html(&self) -> &str {
        &self.html
    }

    pub(crate) fn into_page(self) -> Box<dyn RenderedPage> {
        self.page
    }
}

impl fmt::Debug for AcquiredContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquiredContent")
            .field("mode", &self.mode)
            .field("url", &self.url)
            .field("html_len", &self.html.len())
            .finish()
    }
}

/// 内容获取器
pub struct ContentAcquirer<'a> {
    fetcher: &'a dyn ApiFetcher,
    renderer: &'a dyn PageRenderer,
}

impl<'a> ContentAcquirer<'a> {
    pub fn new(fetcher: &'a dyn ApiFetcher, renderer: &'a dyn PageRenderer) -> Self {
        Self { fetcher, renderer }
    }

    /// 按请求描述获取 `url` 的内容
    pub async fn acquire(&self, spec: &RequestSpec, url: &str) -> AppResult<AcquiredContent> {
        match AcquisitionMode::for_spec(spec) {
            AcquisitionMode::Api => self.acquire_api(url).await,
            AcquisitionMode::Browser => self.acquire_page(spec, url).await,
        }
    }

    async fn acquire_api(&self, url: &str) -> AppResult<AcquiredContent> {
        let json = self.fetcher.fetch_json(url).await?;
        let text = serde_json::to_string(&json).map_err(|source| AcquisitionError::NotJson {
            url: url.to_string(),
            source,
        })?;

        let html = html_wrapper::wrap(&text);
        let page = self.renderer.open_html(&html).await?;

        Ok(AcquiredContent {
            mode: AcquisitionMode::Api,
            url: url.to_string(),
            html,
            page,
        })
    }

    async fn acquire_page(&self, spec: &RequestSpec, url: &str) -> AppResult<AcquiredContent> {
        let page = self.renderer.open_url(url).await?;

        let html = match page.html().await {
            Ok(html) => html,
            Err(e) => {
                let _ = page.close().await;
                return Err(e);
            }
        };

        for import in spec.imports() {
            debug!("加载 import: {}", import);
            if let Err(e) = page.add_script_url(import).await {
                let _ = page.close().await;
                return Err(e);
            }
        }

        Ok(AcquiredContent {
            mode: AcquisitionMode::Browser,
            url: url.to_string(),
            html,
            page,
        })
    }
}
