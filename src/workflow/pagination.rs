//! 翻页驱动 - 流程层
//!
//! 状态机：
//! 1. Start：拆分模块 → 入口检查 → 请求求值
//! 2. Fetching：按 usesApi 获取当前 URL 的内容
//! 3. Extracting：注入 logic，得到 ExtractionResult
//! 4. Deciding：nextUrl 非空则回到 Fetching，否则结束
//!
//! nextUrl 来自不可信的模块输出，因此循环有页数上限，
//! 并且遇到已访问过的 URL 时停止。

use std::collections::HashSet;

use crate::error::{AppResult, Stage};
use crate::events::{EventSink, PipelineEvent};
use crate::models::{ExtractionResult, ModuleSource, RequestSpec};
use crate::services::{
    split, AcquisitionMode, ContentAcquirer, LogicInjector, RequestEvaluator,
};

/// 第一页的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    /// 查询词，填入请求模板的 `<query>`
    Query(String),
    /// 直接使用的 URL
    Url(String),
}

/// 翻页策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// 最多获取的页数
    pub max_pages: usize,
    /// 是否跟随 nextUrl；为 false 时只跑一页，nextUrl 留给调用方
    pub follow_next: bool,
}

impl PaginationPolicy {
    pub fn follow(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            follow_next: true,
        }
    }

    pub fn single_page() -> Self {
        Self {
            max_pages: 1,
            follow_next: false,
        }
    }
}

/// 结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 没有下一页
    Exhausted,
    /// 达到页数上限
    PageLimit,
    /// nextUrl 重复
    Cycle,
    /// 只跑一页，nextUrl 交给调用方
    HandedOff,
}

/// 已准备好的模块（Start 阶段的产物）
#[derive(Debug, Clone)]
pub struct PreparedModule {
    pub name: String,
    pub spec: RequestSpec,
    pub logic_fragment: String,
}

/// 一个模块的完整翻页结果
#[derive(Debug, Clone)]
pub struct ModuleRun {
    pub module: String,
    pub results: Vec<ExtractionResult>,
    pub stop: StopReason,
}

impl ModuleRun {
    /// 最后一页给出的 nextUrl
    pub fn last_next_url(&self) -> Option<&str> {
        self.results.last().and_then(|r| r.next_url.as_deref())
    }
}

/// 翻页驱动
pub struct PaginationDriver<'a> {
    evaluator: &'a RequestEvaluator,
    acquirer: ContentAcquirer<'a>,
    injector: &'a LogicInjector,
    sink: &'a dyn EventSink,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        evaluator: &'a RequestEvaluator,
        acquirer: ContentAcquirer<'a>,
        injector: &'a LogicInjector,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            evaluator,
            acquirer,
            injector,
            sink,
        }
    }

    /// Start 阶段：拆分、入口检查、请求求值
    pub async fn prepare(&self, module: &ModuleSource) -> AppResult<PreparedModule> {
        let name = module.name.as_str();

        let split = split(&module.text).map_err(|e| e.in_stage(name, Stage::Split))?;

        self.evaluator
            .inspect(&module.text)
            .await
            .map_err(|e| e.in_stage(name, Stage::Inspect))?;

        let evaluated = self
            .evaluator
            .evaluate(&split.request_fragment)
            .await
            .map_err(|e| e.in_stage(name, Stage::Evaluate))?;

        for line in evaluated.console {
            self.sink.emit(PipelineEvent::SandboxConsole {
                module: name.to_string(),
                line,
            });
        }

        self.sink.emit(PipelineEvent::RequestEvaluated {
            module: name.to_string(),
            uses_api: evaluated.spec.uses_api(),
            url_template: evaluated.spec.request_url().map(str::to_string),
            imports: evaluated.spec.imports().len(),
        });

        Ok(PreparedModule {
            name: name.to_string(),
            spec: evaluated.spec,
            logic_fragment: split.logic_fragment,
        })
    }

    /// 运行一个模块直到没有下一页（或被策略截断）
    pub async fn run(
        &self,
        module: &ModuleSource,
        seed: &Seed,
        policy: PaginationPolicy,
    ) -> AppResult<ModuleRun> {
        self.sink.emit(PipelineEvent::ModuleStarted {
            module: module.name.clone(),
        });

        let prepared = self.prepare(module).await?;
        let name = prepared.name.as_str();

        let mut url = match seed {
            Seed::Query(query) => prepared
                .spec
                .resolve(query)
                .map_err(|e| e.in_stage(name, Stage::Evaluate))?,
            Seed::Url(url) => url.clone(),
        };

        let mode = AcquisitionMode::for_spec(&prepared.spec);
        let mut visited = HashSet::new();
        let mut results: Vec<ExtractionResult> = Vec::new();

        let stop = loop {
            visited.insert(url.clone());
            let cycle = results.len() + 1;

            self.sink.emit(PipelineEvent::Fetching {
                module: name.to_string(),
                cycle,
                url: url.clone(),
                mode,
            });

            let content = self
                .acquirer
                .acquire(&prepared.spec, &url)
                .await
                .map_err(|e| e.in_stage(name, Stage::Acquire))?;

            self.sink.emit(PipelineEvent::ContentAcquired {
                module: name.to_string(),
                cycle,
                mode: content.mode(),
                url: content.url().to_string(),
                bytes: content.html().len(),
            });

            let result = self
                .injector
                .inject(content, &prepared.logic_fragment)
                .await
                .map_err(|e| e.in_stage(name, Stage::Extract))?;

            self.sink.emit(PipelineEvent::ResultExtracted {
                module: name.to_string(),
                cycle,
                result: result.clone(),
            });

            let next = result.next_url.clone();
            results.push(result);

            let Some(next) = next else {
                break StopReason::Exhausted;
            };
            if !policy.follow_next {
                break StopReason::HandedOff;
            }
            if visited.contains(&next) {
                self.sink.emit(PipelineEvent::CycleDetected {
                    module: name.to_string(),
                    url: next,
                });
                break StopReason::Cycle;
            }
            if results.len() >= policy.max_pages {
                self.sink.emit(PipelineEvent::PageLimitReached {
                    module: name.to_string(),
                    limit: policy.max_pages,
                    pending_url: next,
                });
                break StopReason::PageLimit;
            }

            url = next;
        };

        self.sink.emit(PipelineEvent::ModuleFinished {
            module: name.to_string(),
            pages: results.len(),
        });

        Ok(ModuleRun {
            module: name.to_string(),
            results,
            stop,
        })
    }
}
