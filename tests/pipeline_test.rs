mod common;

use std::time::Duration;

use serde_json::json;

use common::{
    api_module, browser_module, module_source, Call, CallLog, FakeFetcher, FakeRenderer,
    PageOutcome,
};
use module_harness::error::{ExtractionError, ModuleError, RequestSpecError};
use module_harness::infrastructure::Sandbox;
use module_harness::services::{
    AcquisitionMode, ContentAcquirer, LogicInjector, RequestEvaluator,
};
use module_harness::{
    AppError, AppResult, ModuleRun, ModuleSource, PaginationDriver, PaginationPolicy,
    PipelineEvent, RecordingSink, Seed, Stage, StopReason,
};

struct Harness {
    log: CallLog,
    fetcher: FakeFetcher,
    renderer: FakeRenderer,
    evaluator: RequestEvaluator,
    injector: LogicInjector,
    sink: RecordingSink,
}

impl Harness {
    fn new(build: impl FnOnce(&CallLog, FakeFetcher, FakeRenderer) -> (FakeFetcher, FakeRenderer)) -> Self {
        let log = CallLog::default();
        let (fetcher, renderer) = build(&log, FakeFetcher::new(&log), FakeRenderer::new(&log));
        Self {
            log,
            fetcher,
            renderer,
            evaluator: RequestEvaluator::new(Sandbox::default()),
            injector: LogicInjector::new(Duration::from_secs(5)),
            sink: RecordingSink::new(),
        }
    }

    async fn run(&self, module: &ModuleSource, seed: Seed, policy: PaginationPolicy) -> AppResult<ModuleRun> {
        let driver = PaginationDriver::new(
            &self.evaluator,
            ContentAcquirer::new(&self.fetcher, &self.renderer),
            &self.injector,
            &self.sink,
        );
        driver.run(module, &seed, policy).await
    }
}

fn url(seed: &str) -> Seed {
    Seed::Url(seed.to_string())
}

#[tokio::test]
async fn test_browser_pagination_follows_next_url_until_empty() {
    let h = Harness::new(|_, f, r| {
        (
            f,
            r.page("https://site.test/a", json!([1]), Some("https://site.test/b"))
                .page("https://site.test/b", json!([2]), Some("https://site.test/c"))
                .page("https://site.test/c", json!([3]), None),
        )
    });
    let module = ModuleSource::new("list.js", browser_module("https://site.test/<query>"));

    let run = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 3);
    assert_eq!(run.stop, StopReason::Exhausted);
    assert_eq!(run.results[2].payload["payload"], json!([3]));
    assert!(run.last_next_url().is_none());
    assert_eq!(
        h.log.navigations(),
        vec!["https://site.test/a", "https://site.test/b", "https://site.test/c"]
    );
    assert!(h.log.fetches().is_empty(), "浏览器模式不应直接请求");
    assert_eq!(h.log.closes(), 3, "每个周期的页面都应关闭");
}

#[tokio::test]
async fn test_empty_next_url_stops_after_one_cycle() {
    let h = Harness::new(|_, f, r| (f, r.page("https://site.test/only", json!({"k": "v"}), None)));
    let module = ModuleSource::new("one.js", browser_module("https://site.test/<query>"));

    let run = h
        .run(&module, url("https://site.test/only"), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].payload["payload"], json!({"k": "v"}));
    assert_eq!(h.log.navigations().len(), 1);
}

#[tokio::test]
async fn test_query_spaces_use_default_separator() {
    let h = Harness::new(|_, f, r| {
        (f, r.page("https://site.test/search?q=foo%20bar", json!([]), None))
    });
    let module = ModuleSource::new(
        "code.js",
        browser_module("https://site.test/search?q=<query>"),
    );

    h.run(&module, Seed::Query("foo bar".into()), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(h.log.navigations(), vec!["https://site.test/search?q=foo%20bar"]);
}

#[tokio::test]
async fn test_query_spaces_use_custom_separator() {
    let h = Harness::new(|_, f, r| {
        (f, r.page("https://site.test/search?q=foo+bar", json!([]), None))
    });
    let module = ModuleSource::new(
        "code.js",
        module_source(
            r#"{ request: { url: "https://site.test/search?q=<query>" }, separator: "+", usesApi: false }"#,
        ),
    );

    h.run(&module, Seed::Query("foo bar".into()), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(h.log.navigations(), vec!["https://site.test/search?q=foo+bar"]);
}

#[tokio::test]
async fn test_api_mode_never_navigates() {
    let api_url = "https://api.test/items?page=1";
    let body = json!({ "payload": { "title": "b's \"c\"" }, "nextUrl": "" });
    let h = Harness::new(|_, f, r| (f.respond(api_url, body), r));
    let module = ModuleSource::new("api.js", api_module("https://api.test/items?page=<query>"));

    let run = h
        .run(&module, Seed::Query("1".into()), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(h.log.fetches(), vec![api_url]);
    assert!(h.log.navigations().is_empty(), "API 模式不应导航");
    assert_eq!(h.log.html_loads(), 1);
    // 引号经过包装和还原后保持不变
    assert_eq!(run.results[0].payload["payload"], json!({ "title": "b's \"c\"" }));
}

#[tokio::test]
async fn test_api_mode_paginates() {
    let h = Harness::new(|_, f, r| {
        (
            f.respond(
                "https://api.test/p1",
                json!({ "payload": [1], "nextUrl": "https://api.test/p2" }),
            )
            .respond("https://api.test/p2", json!({ "payload": [2], "nextUrl": "" })),
            r,
        )
    });
    let module = ModuleSource::new("api.js", api_module("https://api.test/<query>"));

    let run = h
        .run(&module, url("https://api.test/p1"), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 2);
    assert_eq!(h.log.fetches(), vec!["https://api.test/p1", "https://api.test/p2"]);
    assert!(h.log.navigations().is_empty());
}

#[tokio::test]
async fn test_imports_loaded_only_in_browser_mode() {
    let h = Harness::new(|_, f, r| {
        (
            f.respond("https://api.test/x", json!({ "payload": 1, "nextUrl": "" })),
            r.page("https://site.test/x", json!(1), None),
        )
    });
    let browser = ModuleSource::new(
        "b.js",
        module_source(
            r#"{ request: { url: "https://site.test/<query>" }, usesApi: false, imports: ["https://cdn.test/lib.js"] }"#,
        ),
    );
    let api = ModuleSource::new(
        "a.js",
        module_source(
            r#"{ request: { url: "https://api.test/<query>" }, usesApi: true, imports: ["https://cdn.test/lib.js"] }"#,
        ),
    );

    h.run(&browser, url("https://site.test/x"), PaginationPolicy::follow(1))
        .await
        .unwrap();
    h.run(&api, url("https://api.test/x"), PaginationPolicy::follow(1))
        .await
        .unwrap();

    let scripts: Vec<_> = h
        .log
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::AddScript(_)))
        .collect();
    assert_eq!(scripts, vec![Call::AddScript("https://cdn.test/lib.js".into())]);
}

#[tokio::test]
async fn test_page_limit_stops_with_warning() {
    let h = Harness::new(|_, f, r| {
        (
            f,
            r.page("https://site.test/1", json!(1), Some("https://site.test/2"))
                .page("https://site.test/2", json!(2), Some("https://site.test/3"))
                .page("https://site.test/3", json!(3), None),
        )
    });
    let module = ModuleSource::new("long.js", browser_module("https://site.test/<query>"));

    let run = h
        .run(&module, url("https://site.test/1"), PaginationPolicy::follow(2))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 2);
    assert_eq!(run.stop, StopReason::PageLimit);
    assert!(h.sink.events().iter().any(|e| matches!(
        e,
        PipelineEvent::PageLimitReached { limit: 2, pending_url, .. } if pending_url == "https://site.test/3"
    )));
}

#[tokio::test]
async fn test_repeated_next_url_stops_loop() {
    let h = Harness::new(|_, f, r| {
        (
            f,
            r.page("https://site.test/a", json!("a"), Some("https://site.test/b"))
                .page("https://site.test/b", json!("b"), Some("https://site.test/a")),
        )
    });
    let module = ModuleSource::new("loop.js", browser_module("https://site.test/<query>"));

    let run = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap();

    assert_eq!(run.results.len(), 2);
    assert_eq!(run.stop, StopReason::Cycle);
    assert_eq!(h.log.navigations().len(), 2);
}

#[tokio::test]
async fn test_single_page_hands_next_url_back() {
    let h = Harness::new(|_, f, r| {
        (f, r.page("https://site.test/a", json!("a"), Some("https://site.test/b")))
    });
    let module = ModuleSource::new("one.js", browser_module("https://site.test/<query>"));

    let run = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::single_page())
        .await
        .unwrap();

    assert_eq!(run.stop, StopReason::HandedOff);
    assert_eq!(run.last_next_url(), Some("https://site.test/b"));
    assert_eq!(h.log.navigations().len(), 1);
}

#[tokio::test]
async fn test_logic_error_fails_extract_stage_and_closes_page() {
    let h = Harness::new(|_, f, r| {
        (
            f,
            r.page_outcome(
                "https://site.test/a",
                PageOutcome::ScriptError("ReferenceError: x is not defined".into()),
            ),
        )
    });
    let module = ModuleSource::new("bad.js", browser_module("https://site.test/<query>"));

    let err = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Extract));
    assert!(matches!(
        err.root(),
        AppError::ExtractionFailed(ExtractionError::ScriptError { .. })
    ));
    assert_eq!(h.log.closes(), 1);
}

#[tokio::test]
async fn test_empty_container_is_extraction_failure() {
    let h = Harness::new(|_, f, r| {
        (f, r.page_outcome("https://site.test/a", PageOutcome::Output(String::new())))
    });
    let module = ModuleSource::new("empty.js", browser_module("https://site.test/<query>"));

    let err = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        AppError::ExtractionFailed(ExtractionError::EmptyContainer { .. })
    ));
}

#[tokio::test]
async fn test_navigation_failure_is_acquire_stage() {
    let h = Harness::new(|_, f, r| (f, r));
    let module = ModuleSource::new("gone.js", browser_module("https://site.test/<query>"));

    let err = h
        .run(&module, url("https://nowhere.test/"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Acquire));
    assert!(matches!(err.root(), AppError::AcquisitionFailed(_)));
}

#[tokio::test]
async fn test_api_bad_status_never_falls_back_to_browser() {
    let h = Harness::new(|_, f, r| (f, r.page("https://api.test/missing", json!(1), None)));
    let module = ModuleSource::new("api.js", api_module("https://api.test/<query>"));

    let err = h
        .run(&module, url("https://api.test/missing"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Acquire));
    assert!(h.log.navigations().is_empty());
    assert_eq!(h.log.pages_opened(), 0);
}

#[tokio::test]
async fn test_missing_marker_fails_before_any_acquisition() {
    let h = Harness::new(|_, f, r| (f, r));
    let module = ModuleSource::new(
        "nologic.js",
        "function requestData() { return '{}'; }\nfunction parse() {}\n",
    );

    let err = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Split));
    assert!(matches!(
        err.root(),
        AppError::MalformedModule(ModuleError::MissingMarker { .. })
    ));
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn test_throwing_request_data_fails_evaluate_stage() {
    let h = Harness::new(|_, f, r| (f, r));
    let module = ModuleSource::new(
        "throws.js",
        "function requestData() { throw new Error('boom'); }\nfunction logic() {\n}\n",
    );

    let err = h
        .run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Evaluate));
    assert!(matches!(
        err.root(),
        AppError::InvalidRequestSpec(RequestSpecError::Threw { .. })
    ));
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn test_search_without_url_is_invalid_request_spec() {
    let h = Harness::new(|_, f, r| (f, r));
    let module = ModuleSource::new("code.js", module_source("{ usesApi: false }"));

    let err = h
        .run(&module, Seed::Query("q".into()), PaginationPolicy::follow(25))
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        AppError::InvalidRequestSpec(RequestSpecError::MissingUrl)
    ));
}

#[tokio::test]
async fn test_events_follow_pipeline_order() {
    let h = Harness::new(|_, f, r| (f, r.page("https://site.test/a", json!(1), None)));
    let module = ModuleSource::new("order.js", browser_module("https://site.test/<query>"));

    h.run(&module, url("https://site.test/a"), PaginationPolicy::follow(25))
        .await
        .unwrap();

    let kinds: Vec<&str> = h
        .sink
        .events()
        .iter()
        .map(|e| match e {
            PipelineEvent::ModuleStarted { .. } => "started",
            PipelineEvent::RequestEvaluated { .. } => "evaluated",
            PipelineEvent::Fetching { .. } => "fetching",
            PipelineEvent::ContentAcquired { .. } => "acquired",
            PipelineEvent::ResultExtracted { .. } => "extracted",
            PipelineEvent::ModuleFinished { .. } => "finished",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["started", "evaluated", "fetching", "acquired", "extracted", "finished"]
    );
}

#[tokio::test]
async fn test_acquired_event_describes_synthetic_document() {
    let api_url = "https://api.test/items?page=1";
    let h = Harness::new(|_, f, r| (f.respond(api_url, json!({ "payload": 1, "nextUrl": "" })), r));
    let module = ModuleSource::new("api.js", api_module("https://api.test/items?page=<query>"));

    h.run(&module, Seed::Query("1".into()), PaginationPolicy::follow(25))
        .await
        .unwrap();

    let acquired: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::ContentAcquired {
                cycle,
                mode,
                url,
                bytes,
                ..
            } => Some((cycle, mode, url, bytes)),
            _ => None,
        })
        .collect();

    assert_eq!(acquired.len(), 1);
    let (cycle, mode, url, bytes) = &acquired[0];
    assert_eq!(*cycle, 1);
    assert_eq!(*mode, AcquisitionMode::Api);
    assert_eq!(url, api_url);
    assert!(*bytes > 0);
}
