//! 批量模块运行器 - 编排层
//!
//! 按顺序逐个运行模块目录中的模块，单个模块失败只记录，不影响后续模块。

use tracing::debug;

use crate::config::BatchSeedMode;
use crate::error::{AppError, Stage};
use crate::events::{EventSink, PipelineEvent};
use crate::models::{load_module, ModuleCatalog, ModuleKind};
use crate::workflow::{PaginationDriver, PaginationPolicy, Seed};

/// 失败的模块
#[derive(Debug, Clone)]
pub struct FailedModule {
    pub module: String,
    pub stage: Option<Stage>,
    pub error: String,
}

/// 一次运行的统计
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 模块总数
    pub total: usize,
    /// 成功的模块数
    pub succeeded: usize,
    /// 获取到的结果页数
    pub pages: usize,
    /// 失败的模块
    pub failed: Vec<FailedModule>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, sink: &dyn EventSink, module: &str, error: &AppError) {
        let stage = error.stage();
        let message = error.root().to_string();
        sink.emit(PipelineEvent::ModuleFailed {
            module: module.to_string(),
            stage,
            error: message.clone(),
        });
        self.failed.push(FailedModule {
            module: module.to_string(),
            stage,
            error: message,
        });
    }
}

/// 批量运行器
pub struct BatchRunner<'a> {
    driver: PaginationDriver<'a>,
    sink: &'a dyn EventSink,
    max_pages: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(driver: PaginationDriver<'a>, sink: &'a dyn EventSink, max_pages: usize) -> Self {
        Self {
            driver,
            sink,
            max_pages,
        }
    }

    /// 测试模式：对每个模块获取内容并提取结果
    ///
    /// `target` 在 Search 中是查询词，在 Info / Media 中是种子 URL
    pub async fn run_test(
        &self,
        catalog: &ModuleCatalog,
        target: &str,
        seed_mode: BatchSeedMode,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let chained = seed_mode == BatchSeedMode::Chained && catalog.kind().is_batch();
        let policy = if chained {
            PaginationPolicy::single_page()
        } else {
            PaginationPolicy::follow(self.max_pages)
        };
        let mut carried: Option<String> = None;

        for path in catalog.iter() {
            summary.total += 1;

            let module = match load_module(path).await {
                Ok(module) => module,
                Err(e) => {
                    summary.record_failure(self.sink, &path.display().to_string(), &e);
                    carried = None;
                    continue;
                }
            };

            let seed = match catalog.kind() {
                ModuleKind::Search => Seed::Query(target.to_string()),
                ModuleKind::Info | ModuleKind::Media => {
                    Seed::Url(carried.take().unwrap_or_else(|| target.to_string()))
                }
            };
            debug!("{} 的起始: {:?}", module.name, seed);

            match self.driver.run(&module, &seed, policy).await {
                Ok(run) => {
                    summary.succeeded += 1;
                    summary.pages += run.results.len();
                    if chained {
                        carried = run.last_next_url().map(str::to_string);
                    }
                }
                Err(e) => summary.record_failure(self.sink, &module.name, &e),
            }
        }

        summary
    }

    /// 构建模式：离线检查每个模块（拆分、入口检查、请求求值），不访问网络
    pub async fn run_build(&self, catalog: &ModuleCatalog) -> RunSummary {
        let mut summary = RunSummary::default();

        for path in catalog.iter() {
            summary.total += 1;

            let module = match load_module(path).await {
                Ok(module) => module,
                Err(e) => {
                    summary.record_failure(self.sink, &path.display().to_string(), &e);
                    continue;
                }
            };

            match self.driver.prepare(&module).await {
                Ok(prepared) => {
                    summary.succeeded += 1;
                    self.sink.emit(PipelineEvent::ModuleChecked {
                        module: prepared.name,
                        uses_api: prepared.spec.uses_api(),
                        url_template: prepared.spec.request_url().map(str::to_string),
                    });
                }
                Err(e) => summary.record_failure(self.sink, &module.name, &e),
            }
        }

        summary
    }
}
