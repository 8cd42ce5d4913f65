//! API 模式下的直接网络请求

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AcquisitionError, AppError, AppResult};

/// 直接获取 JSON 的能力
#[async_trait]
pub trait ApiFetcher: Send + Sync {
    /// GET 指定 URL 并把响应体解析为 JSON
    async fn fetch_json(&self, url: &str) -> AppResult<JsonValue>;
}

/// 基于 reqwest 的实现
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// 创建新的 HTTP 客户端
    pub fn new(user_agent: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AppError::request_failed("<client>", e))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ApiFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> AppResult<JsonValue> {
        debug!("API 请求: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::from(AcquisitionError::Timeout {
                    what: format!("请求 {}", url),
                    secs: self.timeout.as_secs(),
                })
            } else {
                AppError::request_failed(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::request_failed(url, e))?;

        let json = serde_json::from_str(&body).map_err(|source| AcquisitionError::NotJson {
            url: url.to_string(),
            source,
        })?;

        debug!("API 响应 {} 字节", body.len());
        Ok(json)
    }
}
