//! 隔离的 JS 解释器 - 基础设施层
//!
//! 用纯 Rust 的 boa 引擎执行模块提供的不可信代码。
//! 解释器里没有文件系统、网络、进程相关的全局对象；
//! 每次执行都使用新的 Context，执行受循环次数、递归深度和超时限制。
//! `console.*` 的输出被收集起来交给调用方记录。
//!
//! 指定了可执行文件时，脚本在子进程（`module-harness __sandbox`）中执行，
//! 超时后子进程被杀掉；否则在阻塞线程池中执行，超时只停止等待，线程会继续运行到结束。

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitCode, Stdio};
use std::time::Duration;

use boa_engine::{Context, Source};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 子进程模式使用的隐藏子命令
pub const SANDBOX_SUBCOMMAND: &str = "__sandbox";

/// 沙箱限制
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    /// 单个循环允许的最大迭代次数
    pub loop_iteration_limit: u64,
    /// 最大递归深度
    pub recursion_limit: usize,
    /// 整体执行超时
    pub timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 1_000_000,
            recursion_limit: 512,
            timeout: Duration::from_secs(10),
        }
    }
}

/// 沙箱中的一条 console 输出
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleLine {
    pub level: String,
    pub message: String,
}

/// 沙箱执行失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxFailure {
    /// 脚本抛出异常（包括超出运行限制）
    Threw(String),
    /// 执行超时
    Timeout(u64),
    /// 沙箱自身出错
    Internal(String),
}

/// requestData() 的调用结果
#[derive(Debug, Clone)]
pub enum RequestDataCall {
    /// 没有定义 requestData
    Missing { console: Vec<ConsoleLine> },
    /// 返回值（已经是 JSON 文本；返回 undefined 时为 None）
    Returned {
        value: Option<String>,
        console: Vec<ConsoleLine>,
    },
}

/// 模块入口检查结果
#[derive(Debug, Clone)]
pub struct EntryPoints {
    pub request_data: bool,
    pub logic: bool,
    pub console: Vec<ConsoleLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    request_data: Option<String>,
    #[serde(default)]
    logic: Option<String>,
    #[serde(default)]
    console: Vec<ConsoleLine>,
}

/// 替换 console，把输出收集到数组里
const PRELUDE: &str = r#"
var __harnessConsole = [];
var console = (function () {
    function record(level) {
        return function () {
            var parts = [];
            for (var i = 0; i < arguments.length; i++) {
                var arg = arguments[i];
                parts.push(typeof arg === 'string' ? arg : String(JSON.stringify(arg)));
            }
            __harnessConsole.push({ level: level, message: parts.join(' ') });
        };
    }
    return {
        log: record('log'),
        info: record('info'),
        warn: record('warn'),
        error: record('error'),
        debug: record('debug')
    };
})();
"#;

const CALL_REQUEST_DATA: &str = r#"
;(function () {
    if (typeof requestData !== 'function') {
        return JSON.stringify({ status: 'missing', console: __harnessConsole });
    }
    var out = requestData();
    if (typeof out !== 'string') {
        out = JSON.stringify(out);
    }
    return JSON.stringify({ status: 'ok', value: out, console: __harnessConsole });
})();
"#;

const INSPECT_ENTRY_POINTS: &str = r#"
;JSON.stringify({
    status: 'ok',
    requestData: typeof requestData,
    logic: typeof logic,
    console: __harnessConsole
});
"#;

/// 子进程写回的结果
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ChildReply {
    Ok { value: String },
    Threw { message: String },
}

/// JS 沙箱
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
    /// 子进程使用的可执行文件，None 时在进程内执行
    program: Option<PathBuf>,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            limits,
            program: None,
        }
    }

    /// 在子进程中执行脚本，超时后杀掉子进程
    pub fn isolated(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// 在新的 Context 中同步执行脚本，返回脚本完成值的字符串形式
    pub fn run_blocking(&self, script: &str) -> Result<String, SandboxFailure> {
        eval_script(
            script,
            self.limits.loop_iteration_limit,
            self.limits.recursion_limit,
        )
    }

    /// 执行脚本并施加超时
    pub async fn run(&self, script: String) -> Result<String, SandboxFailure> {
        match &self.program {
            Some(program) => self.run_in_child(program, script).await,
            None => self.run_in_thread(script).await,
        }
    }

    async fn run_in_thread(&self, script: String) -> Result<String, SandboxFailure> {
        let sandbox = self.clone();
        let timeout = self.limits.timeout;
        let task = tokio::task::spawn_blocking(move || sandbox.run_blocking(&script));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(SandboxFailure::Internal(join_err.to_string())),
            Err(_) => Err(SandboxFailure::Timeout(timeout.as_secs())),
        }
    }

    async fn run_in_child(&self, program: &Path, script: String) -> Result<String, SandboxFailure> {
        let timeout = self.limits.timeout;
        let mut child = Command::new(program)
            .arg(SANDBOX_SUBCOMMAND)
            .arg(self.limits.loop_iteration_limit.to_string())
            .arg(self.limits.recursion_limit.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SandboxFailure::Internal(format!("无法启动沙箱进程 {}: {}", program.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxFailure::Internal("沙箱进程没有 stdin".to_string()))?;

        // 超时时 future 被丢弃，kill_on_drop 杀掉子进程
        let exchange = async move {
            stdin.write_all(script.as_bytes()).await?;
            drop(stdin);
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(SandboxFailure::Internal(e.to_string())),
            Err(_) => return Err(SandboxFailure::Timeout(timeout.as_secs())),
        };

        let reply: ChildReply = serde_json::from_slice(&output.stdout).map_err(|e| {
            SandboxFailure::Internal(format!(
                "无法解析沙箱进程输出 (退出状态 {}): {}",
                output.status, e
            ))
        })?;

        match reply {
            ChildReply::Ok { value } => Ok(value),
            ChildReply::Threw { message } => Err(SandboxFailure::Threw(message)),
        }
    }

    /// 执行请求片段并调用 requestData()
    pub async fn call_request_data(&self, fragment: &str) -> Result<RequestDataCall, SandboxFailure> {
        let script = format!("{}\n{}\n{}", PRELUDE, fragment, CALL_REQUEST_DATA);
        let envelope = parse_envelope(&self.run(script).await?)?;

        if envelope.status == "missing" {
            return Ok(RequestDataCall::Missing {
                console: envelope.console,
            });
        }

        Ok(RequestDataCall::Returned {
            value: envelope.value,
            console: envelope.console,
        })
    }

    /// 执行完整模块源码，检查两个入口是否为函数
    pub async fn entry_points(&self, source: &str) -> Result<EntryPoints, SandboxFailure> {
        let script = format!("{}\n{}\n{}", PRELUDE, source, INSPECT_ENTRY_POINTS);
        let envelope = parse_envelope(&self.run(script).await?)?;

        Ok(EntryPoints {
            request_data: envelope.request_data.as_deref() == Some("function"),
            logic: envelope.logic.as_deref() == Some("function"),
            console: envelope.console,
        })
    }
}

fn eval_script(
    script: &str,
    loop_iteration_limit: u64,
    recursion_limit: usize,
) -> Result<String, SandboxFailure> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(loop_iteration_limit);
    context.runtime_limits_mut().set_recursion_limit(recursion_limit);

    let value = context
        .eval(Source::from_bytes(script))
        .map_err(|e| SandboxFailure::Threw(e.to_string()))?;
    let text = value
        .to_string(&mut context)
        .map_err(|e| SandboxFailure::Threw(e.to_string()))?;

    Ok(text.to_std_string_escaped())
}

/// 子进程入口
///
/// 参数为 `<循环次数上限> <递归深度上限>`；从 stdin 读取脚本，把 `ChildReply` 写到 stdout
pub fn serve_child(args: &[String], input: impl Read, output: impl Write) -> ExitCode {
    let defaults = SandboxLimits::default();
    let loop_limit = args
        .first()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.loop_iteration_limit);
    let recursion_limit = args
        .get(1)
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.recursion_limit);

    let mut script = String::new();
    let mut input = input;
    if input.read_to_string(&mut script).is_err() {
        return ExitCode::FAILURE;
    }

    let reply = match eval_script(&script, loop_limit, recursion_limit) {
        Ok(value) => ChildReply::Ok { value },
        Err(SandboxFailure::Threw(message)) | Err(SandboxFailure::Internal(message)) => {
            ChildReply::Threw { message }
        }
        Err(SandboxFailure::Timeout(secs)) => ChildReply::Threw {
            message: format!("超时 ({} 秒)", secs),
        },
    };

    let mut output = output;
    let written = serde_json::to_writer(&mut output, &reply).is_ok() && output.flush().is_ok();
    if written {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn parse_envelope(text: &str) -> Result<Envelope, SandboxFailure> {
    serde_json::from_str(text)
        .map_err(|e| SandboxFailure::Internal(format!("无法解析沙箱输出 '{}': {}", text, e)))
}
