//! # Module Harness
//!
//! 在无头浏览器中运行模块脚本（请求片段 + logic 片段）并检查提取结果的工具
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `JsExecutor` - 页面的唯一 owner，提供 eval() 能力
//! - `Sandbox` - 隔离的 JS 解释器，执行不可信的请求片段
//! - `HttpFetcher` - API 模式下的直接请求
//! - `browser/` - 无头 Chromium 与 `PageRenderer` / `RenderedPage`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个模块的单个步骤
//! - `module_splitter` - 拆分请求片段与 logic 片段
//! - `request_evaluator` - 在沙箱中求值请求描述
//! - `content_acquirer` - API / 浏览器两种获取方式
//! - `html_wrapper` - 把 API 的 JSON 包装成 HTML
//! - `logic_injector` - 注入 logic 并读取 `#chouten`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个模块"的完整翻页流程
//! - `PaginationDriver` - 获取 → 提取 → 跟随 nextUrl
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 检查项目、持有资源、输出统计
//! - `orchestrator/batch_runner` - 逐个运行模块目录中的模块
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{BatchSeedMode, Config};
pub use error::{AppError, AppResult, Stage};
pub use events::{EventSink, PipelineEvent, RecordingSink, TracingSink};
pub use models::{ExtractionResult, ModuleKind, ModuleSource, RequestSpec};
pub use orchestrator::{App, RunMode, RunRequest, RunSummary};
pub use workflow::{ModuleRun, PaginationDriver, PaginationPolicy, Seed, StopReason};
