//! 流水线事件
//!
//! 核心流程不直接打印，只向 `EventSink` 发送事件；
//! `TracingSink` 把事件输出到 tracing 日志。

use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::error::Stage;
use crate::infrastructure::ConsoleLine;
use crate::models::ExtractionResult;
use crate::services::AcquisitionMode;

/// 流水线事件
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// 开始运行一个模块
    ModuleStarted { module: String },
    /// 请求片段求值完成
    RequestEvaluated {
        module: String,
        uses_api: bool,
        url_template: Option<String>,
        imports: usize,
    },
    /// 沙箱中的 console 输出
    SandboxConsole { module: String, line: ConsoleLine },
    /// 开始获取内容
    Fetching {
        module: String,
        cycle: usize,
        url: String,
        mode: AcquisitionMode,
    },
    /// 内容已载入页面
    ContentAcquired {
        module: String,
        cycle: usize,
        mode: AcquisitionMode,
        url: String,
        bytes: usize,
    },
    /// 得到一页结果
    ResultExtracted {
        module: String,
        cycle: usize,
        result: ExtractionResult,
    },
    /// 达到页数上限，仍有下一页
    PageLimitReached {
        module: String,
        limit: usize,
        pending_url: String,
    },
    /// nextUrl 指向已访问过的地址
    CycleDetected { module: String, url: String },
    /// 模块运行结束
    ModuleFinished { module: String, pages: usize },
    /// 模块运行失败
    ModuleFailed {
        module: String,
        stage: Option<Stage>,
        error: String,
    },
    /// 离线检查通过
    ModuleChecked {
        module: String,
        uses_api: bool,
        url_template: Option<String>,
    },
}

/// 事件接收者
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// 输出到 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::ModuleStarted { module } => {
                info!("▶️ 运行模块 {}", module);
            }
            PipelineEvent::RequestEvaluated {
                module,
                uses_api,
                url_template,
                imports,
            } => {
                debug!(
                    "[{}] 请求描述: usesApi={} url={:?} imports={}",
                    module, uses_api, url_template, imports
                );
            }
            PipelineEvent::SandboxConsole { module, line } => {
                info!(target: "sandbox", "[{}] {}: {}", module, line.level.to_uppercase(), line.message);
            }
            PipelineEvent::Fetching {
                module,
                cycle,
                url,
                mode,
            } => {
                info!("[{}] 🌐 第 {} 页 ({}): {}", module, cycle, mode, url);
            }
            PipelineEvent::ContentAcquired {
                module,
                cycle,
                mode,
                url,
                bytes,
            } => {
                debug!(
                    "[{}] 第 {} 页已载入 ({}, {} 字节): {}",
                    module, cycle, mode, bytes, url
                );
            }
            PipelineEvent::ResultExtracted {
                module,
                cycle,
                result,
            } => {
                info!("[{}] ✓ 第 {} 页结果:\n{}", module, cycle, result.pretty());
            }
            PipelineEvent::PageLimitReached {
                module,
                limit,
                pending_url,
            } => {
                warn!(
                    "[{}] ⚠️ 已达到页数上限 {}，未继续请求: {}",
                    module, limit, pending_url
                );
            }
            PipelineEvent::CycleDetected { module, url } => {
                warn!("[{}] ⚠️ nextUrl 重复出现，停止翻页: {}", module, url);
            }
            PipelineEvent::ModuleFinished { module, pages } => {
                info!("[{}] ✅ 完成，共 {} 页", module, pages);
            }
            PipelineEvent::ModuleFailed {
                module,
                stage,
                error,
            } => match stage {
                Some(stage) => error!("[{}] ❌ {} 阶段失败: {}", module, stage, error),
                None => error!("[{}] ❌ 失败: {}", module, error),
            },
            PipelineEvent::ModuleChecked {
                module,
                uses_api,
                url_template,
            } => {
                info!(
                    "[{}] ✅ 检查通过 (usesApi={}, url={})",
                    module,
                    uses_api,
                    url_template.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

/// 记录所有事件，用于测试和汇总
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录事件的副本
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
