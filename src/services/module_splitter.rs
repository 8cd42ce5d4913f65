//! 模块源码拆分 - 业务能力层
//!
//! 模块文件的约定：先是请求部分，紧接着是固定名字的 `function logic() { ... }`。
//! 拆分是纯文本操作，不解析代码。

use crate::error::{AppResult, ModuleError};

/// logic 片段的起始标记
pub const LOGIC_MARKER: &str = "function logic() {";

/// 拆分后的模块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitModule {
    /// 请求片段（定义 requestData）
    pub request_fragment: String,
    /// logic 函数体
    pub logic_fragment: String,
}

/// 按 logic 标记拆分模块源码
///
/// 标记必须恰好出现一次；logic 片段去掉末尾空白后再去掉一个 `}`
pub fn split(source: &str) -> AppResult<SplitModule> {
    let count = source.matches(LOGIC_MARKER).count();
    if count == 0 {
        return Err(ModuleError::MissingMarker {
            marker: LOGIC_MARKER,
        }
        .into());
    }
    if count > 1 {
        return Err(ModuleError::DuplicateMarker {
            marker: LOGIC_MARKER,
            count,
        }
        .into());
    }

    let (request, logic) = source
        .split_once(LOGIC_MARKER)
        .ok_or(ModuleError::MissingMarker {
            marker: LOGIC_MARKER,
        })?;

    let request = request.trim_end();
    if request.trim_start().is_empty() {
        return Err(ModuleError::EmptyRequestFragment.into());
    }

    let logic = logic
        .trim_end()
        .strip_suffix('}')
        .ok_or(ModuleError::UnterminatedLogic)?;

    Ok(SplitModule {
        request_fragment: request.to_string(),
        logic_fragment: logic.to_string(),
    })
}
