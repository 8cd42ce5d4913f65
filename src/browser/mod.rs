//! 浏览器层
//!
//! `PageRenderer` 负责创建页面，`RenderedPage` 是一个已载入内容的页面。
//! 两个 trait 把流水线和 chromiumoxide 隔开，测试中可以替换为内存实现。

pub mod connection;
pub mod headless;
pub mod renderer;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;
pub use renderer::{BrowserOptions, ChromiumRenderer};

/// 页面创建能力
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 禁用脚本后导航到 URL，载入完成后重新启用脚本
    async fn open_url(&self, url: &str) -> AppResult<Box<dyn RenderedPage>>;

    /// 禁用脚本后载入一段 HTML，载入完成后重新启用脚本
    ///
    /// 不产生任何导航
    async fn open_html(&self, html: &str) -> AppResult<Box<dyn RenderedPage>>;

    /// 关闭浏览器
    async fn shutdown(&self) -> AppResult<()>;
}

/// 一个已载入内容的页面
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// 以 `<script src>` 方式加载外部脚本，等待加载完成
    async fn add_script_url(&self, url: &str) -> AppResult<()>;

    /// 在页面中执行脚本，返回 JSON 值
    async fn evaluate(&self, script: &str, timeout: Duration) -> AppResult<JsonValue>;

    /// 当前页面的 HTML
    async fn html(&self) -> AppResult<String>;

    /// 关闭页面
    async fn close(self: Box<Self>) -> AppResult<()>;
}
