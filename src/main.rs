use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, warn};

use module_harness::cli::Cli;
use module_harness::infrastructure::sandbox::{self, SANDBOX_SUBCOMMAND};
use module_harness::{logger, App, Config};

fn main() -> ExitCode {
    // 沙箱子进程
    if std::env::args_os().nth(1).is_some_and(|arg| arg == SANDBOX_SUBCOMMAND) {
        let limits: Vec<String> = std::env::args_os()
            .skip(2)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        return sandbox::serve_child(&limits, std::io::stdin().lock(), std::io::stdout().lock());
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ 无法创建运行时: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(cli));
    // 不等待仍在运行的阻塞任务
    runtime.shutdown_timeout(Duration::from_secs(1));

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    // 加载配置
    let config = match Config::load(&cli.dir, cli.config.as_deref()) {
        Ok(config) => cli.apply(config),
        Err(e) => {
            logger::init(cli.verbose);
            return Err(e).context("加载配置失败");
        }
    };

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化应用
    let app = App::initialize(config, &cli.dir).await?;
    let request = cli.run_request();

    let outcome = tokio::select! {
        result = app.run(&request) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Err(e) = app.shutdown().await {
        warn!("⚠️ 关闭浏览器失败: {}", e);
    }

    match outcome {
        Some(result) => Ok(result?.is_success()),
        None => {
            warn!("⚠️ 收到中断信号，已取消运行");
            Ok(false)
        }
    }
}
