//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用
//! - 检查项目目录（metadata.json）
//! - 持有 API 客户端、浏览器渲染器和沙箱
//! - 按模式选择模块目录，输出全局统计
//!
//! ### `batch_runner` - 批量运行器
//! - 按文件名顺序逐个运行模块
//! - 单个模块失败只记录，继续下一个
//! - 独立种子或链式种子
//!
//! ## 层次关系
//!
//! ```text
//! app (选择 ModuleCatalog)
//!     ↓
//! batch_runner (处理 Vec<ModuleSource>)
//!     ↓
//! workflow::PaginationDriver (处理单个模块的翻页)
//!     ↓
//! services (拆分 / 求值 / 获取 / 注入)
//!     ↓
//! infrastructure + browser (沙箱、HTTP、Chromium)
//! ```

pub mod app;
pub mod batch_runner;

pub use app::{App, RunMode, RunRequest};
pub use batch_runner::{BatchRunner, FailedModule, RunSummary};
