//! 应用 - 编排层
//!
//! ## 职责
//!
//! 1. **前置检查**：加载 metadata.json，缺失时在任何请求之前中止
//! 2. **资源管理**：持有 API 客户端、浏览器渲染器和沙箱
//! 3. **选择模块**：按 `ModuleKind` 找到要运行的模块
//! 4. **调度运行**：测试模式或离线检查模式，最后输出统计

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::browser::{ChromiumRenderer, PageRenderer};
use crate::config::Config;
use crate::error::{AppResult, ProjectError};
use crate::events::{EventSink, TracingSink};
use crate::infrastructure::{ApiFetcher, HttpFetcher};
use crate::models::{load_metadata, ModuleCatalog, ModuleKind, ProjectMetadata};
use crate::orchestrator::batch_runner::{BatchRunner, RunSummary};
use crate::services::{ContentAcquirer, LogicInjector, RequestEvaluator};
use crate::utils::logging::{log_catalog, log_startup, print_final_stats};
use crate::workflow::PaginationDriver;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 获取内容并提取结果
    Test,
    /// 离线检查
    Build,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Test => write!(f, "测试"),
            RunMode::Build => write!(f, "构建检查"),
        }
    }
}

/// 一次运行请求
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub kind: ModuleKind,
    pub mode: RunMode,
    /// 查询词（Search）或种子 URL（Info / Media）
    pub target: Option<String>,
}

/// 应用主结构
pub struct App {
    config: Config,
    project_dir: PathBuf,
    metadata: ProjectMetadata,
    fetcher: Box<dyn ApiFetcher>,
    renderer: Box<dyn PageRenderer>,
    evaluator: RequestEvaluator,
    injector: LogicInjector,
    sink: Arc<dyn EventSink>,
}

impl App {
    /// 初始化应用
    ///
    /// 浏览器在第一次需要页面时才启动
    pub async fn initialize(mut config: Config, project_dir: &Path) -> AppResult<Self> {
        if config.sandbox_executable.is_none() {
            match std::env::current_exe() {
                Ok(exe) => config.sandbox_executable = Some(exe),
                Err(e) => warn!("⚠️ 无法定位可执行文件，沙箱将在进程内运行: {}", e),
            }
        }

        let fetcher = HttpFetcher::new(&config.user_agent, config.fetch_timeout())?;
        let renderer = ChromiumRenderer::new(config.browser_options());

        Self::with_components(
            config,
            project_dir,
            Box::new(fetcher),
            Box::new(renderer),
            Arc::new(TracingSink),
        )
        .await
    }

    /// 使用给定的获取能力初始化应用
    pub async fn with_components(
        config: Config,
        project_dir: &Path,
        fetcher: Box<dyn ApiFetcher>,
        renderer: Box<dyn PageRenderer>,
        sink: Arc<dyn EventSink>,
    ) -> AppResult<Self> {
        let metadata = load_metadata(project_dir).await?;

        let evaluator = RequestEvaluator::new(config.sandbox());
        let injector = LogicInjector::new(config.script_timeout());

        Ok(Self {
            config,
            project_dir: project_dir.to_path_buf(),
            metadata,
            fetcher,
            renderer,
            evaluator,
            injector,
            sink,
        })
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    /// 运行应用主逻辑
    pub async fn run(&self, request: &RunRequest) -> AppResult<RunSummary> {
        let target = request
            .target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if request.mode == RunMode::Test && target.is_none() {
            return Err(ProjectError::MissingTarget.into());
        }

        log_startup(&self.metadata, request.mode, target);

        let catalog = ModuleCatalog::discover(&self.project_dir, request.kind).await?;
        log_catalog(&catalog);

        let driver = PaginationDriver::new(
            &self.evaluator,
            ContentAcquirer::new(self.fetcher.as_ref(), self.renderer.as_ref()),
            &self.injector,
            self.sink.as_ref(),
        );
        let runner = BatchRunner::new(driver, self.sink.as_ref(), self.config.max_pages);

        let summary = match (request.mode, target) {
            (RunMode::Build, _) => runner.run_build(&catalog).await,
            (RunMode::Test, Some(target)) => {
                runner
                    .run_test(&catalog, target, self.config.batch_seed_mode)
                    .await
            }
            (RunMode::Test, None) => return Err(ProjectError::MissingTarget.into()),
        };

        print_final_stats(&summary);
        Ok(summary)
    }

    /// 释放浏览器
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("🧹 清理资源");
        self.renderer.shutdown().await
    }
}
