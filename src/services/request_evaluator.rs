//! 请求片段求值 - 业务能力层
//!
//! 在沙箱中执行请求片段，调用 requestData()，把返回的 JSON 解析为 RequestSpec。
//! 同时负责模块入口检查：完整源码里 requestData 和 logic 都必须是函数。

use crate::error::{AppResult, ModuleError, RequestSpecError};
use crate::infrastructure::sandbox::{RequestDataCall, SandboxFailure};
use crate::infrastructure::{ConsoleLine, Sandbox};
use crate::models::RequestSpec;

/// 求值结果
#[derive(Debug, Clone)]
pub struct EvaluatedRequest {
    pub spec: RequestSpec,
    /// 求值过程中的 console 输出
    pub console: Vec<ConsoleLine>,
}

/// 请求片段求值器
#[derive(Debug, Clone)]
pub struct RequestEvaluator {
    sandbox: Sandbox,
}

impl RequestEvaluator {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    /// 执行请求片段并解析 requestData() 的返回值
    pub async fn evaluate(&self, request_fragment: &str) -> AppResult<EvaluatedRequest> {
        let call = self
            .sandbox
            .call_request_data(request_fragment)
            .await
            .map_err(request_error)?;

        match call {
            RequestDataCall::Missing { .. } => Err(RequestSpecError::MissingEntryPoint.into()),
            RequestDataCall::Returned { value, console } => {
                let spec = RequestSpec::from_json(value.as_deref().unwrap_or_default())?;
                Ok(EvaluatedRequest { spec, console })
            }
        }
    }

    /// 检查完整模块是否定义了 requestData 和 logic 两个函数
    pub async fn inspect(&self, source: &str) -> AppResult<Vec<ConsoleLine>> {
        let entry = self
            .sandbox
            .entry_points(source)
            .await
            .map_err(|failure| ModuleError::EvaluationFailed {
                message: describe(failure),
            })?;

        if !entry.request_data {
            return Err(ModuleError::MissingEntryPoint {
                name: "requestData",
            }
            .into());
        }
        if !entry.logic {
            return Err(ModuleError::MissingEntryPoint { name: "logic" }.into());
        }

        Ok(entry.console)
    }
}

fn request_error(failure: SandboxFailure) -> RequestSpecError {
    match failure {
        SandboxFailure::Threw(message) => RequestSpecError::Threw { message },
        SandboxFailure::Timeout(secs) => RequestSpecError::Timeout { secs },
        SandboxFailure::Internal(message) => RequestSpecError::Sandbox { message },
    }
}

fn describe(failure: SandboxFailure) -> String {
    match failure {
        SandboxFailure::Threw(message) | SandboxFailure::Internal(message) => message,
        SandboxFailure::Timeout(secs) => format!("执行超时 ({} 秒)", secs),
    }
}
