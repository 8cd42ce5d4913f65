use std::fmt;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 模块源码无法拆分或缺少入口函数
    #[error("模块格式错误: {0}")]
    MalformedModule(#[from] ModuleError),
    /// 请求片段执行失败或返回值不是合法的请求描述
    #[error("请求描述无效: {0}")]
    InvalidRequestSpec(#[from] RequestSpecError),
    /// 网络请求或页面导航失败
    #[error("内容获取失败: {0}")]
    AcquisitionFailed(#[from] AcquisitionError),
    /// logic 脚本执行失败或结果无法解析
    #[error("结果提取失败: {0}")]
    ExtractionFailed(#[from] ExtractionError),
    /// 项目描述文件 / 模块目录错误
    #[error("项目错误: {0}")]
    Project(#[from] ProjectError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 带上下文的流水线错误（模块名 + 阶段）
    #[error("[{module}] {stage} 阶段失败: {source}")]
    Pipeline {
        module: String,
        stage: Stage,
        #[source]
        source: Box<AppError>,
    },
}

/// 流水线阶段，用于错误定位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 拆分模块源码
    Split,
    /// 检查模块入口
    Inspect,
    /// 执行请求片段
    Evaluate,
    /// 获取内容
    Acquire,
    /// 注入 logic 并提取结果
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Split => "拆分",
            Stage::Inspect => "入口检查",
            Stage::Evaluate => "请求求值",
            Stage::Acquire => "内容获取",
            Stage::Extract => "结果提取",
        };
        f.write_str(name)
    }
}

/// 模块源码错误
#[derive(Debug, Error)]
pub enum ModuleError {
    /// 找不到 logic 标记
    #[error("未找到标记 `{marker}`")]
    MissingMarker { marker: &'static str },
    /// logic 标记出现多次
    #[error("标记 `{marker}` 出现了 {count} 次，只允许出现一次")]
    DuplicateMarker { marker: &'static str, count: usize },
    /// 请求片段为空
    #[error("请求片段为空")]
    EmptyRequestFragment,
    /// logic 片段没有以 `}` 结尾
    #[error("logic 片段缺少结尾的 `}}`")]
    UnterminatedLogic,
    /// 缺少入口函数
    #[error("缺少入口函数 `{name}`")]
    MissingEntryPoint { name: &'static str },
    /// 模块源码在沙箱中执行失败
    #[error("模块源码执行失败: {message}")]
    EvaluationFailed { message: String },
}

/// 请求描述错误
#[derive(Debug, Error)]
pub enum RequestSpecError {
    /// 请求片段没有定义 requestData()
    #[error("请求片段未定义 requestData()")]
    MissingEntryPoint,
    /// requestData() 抛出异常
    #[error("requestData() 抛出异常: {message}")]
    Threw { message: String },
    /// 返回值不是 JSON
    #[error("requestData() 返回值不是合法的 JSON: {source}")]
    NotJson {
        #[source]
        source: serde_json::Error,
    },
    /// 缺少 request.url
    #[error("请求描述缺少 request.url")]
    MissingUrl,
    /// 沙箱执行超时
    #[error("沙箱执行超时 ({secs} 秒)")]
    Timeout { secs: u64 },
    /// 沙箱内部错误
    #[error("沙箱内部错误: {message}")]
    Sandbox { message: String },
}

/// 内容获取错误
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {message}")]
    BrowserLaunch { message: String },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreation {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 网络请求失败
    #[error("请求 {url} 失败: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 接口返回非成功状态码
    #[error("请求 {url} 返回状态码 {status}")]
    BadStatus { url: String, status: u16 },
    /// 接口返回的不是 JSON
    #[error("{url} 返回的内容不是 JSON: {source}")]
    NotJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// 加载外部脚本失败
    #[error("加载外部脚本 {url} 失败: {message}")]
    Import { url: String, message: String },
    /// 浏览器协议错误
    #[error("浏览器协议错误: {source}")]
    Cdp {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 超时
    #[error("{what} 超时 ({secs} 秒)")]
    Timeout { what: String, secs: u64 },
}

/// 结果提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 结果容器为空
    #[error("结果容器 #{container} 为空")]
    EmptyContainer { container: &'static str },
    /// 结果不是 JSON
    #[error("结果不是合法的 JSON: {source}")]
    NotJson {
        #[source]
        source: serde_json::Error,
    },
    /// logic 脚本抛出异常
    #[error("logic 脚本抛出异常: {message}")]
    ScriptError { message: String },
    /// 页面脚本执行失败
    #[error("注入脚本执行失败: {source}")]
    Evaluation {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 超时
    #[error("logic 脚本执行超时 ({secs} 秒)")]
    Timeout { secs: u64 },
}

/// 项目结构错误
#[derive(Debug, Error)]
pub enum ProjectError {
    /// 缺少 metadata.json
    #[error("当前目录下不存在 metadata.json: {path}")]
    MissingMetadata { path: String },
    /// 缺少目标 URL / 查询词
    #[error("缺少 URL 或查询词")]
    MissingTarget,
    /// 模块目录不存在
    #[error("模块目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::AcquisitionFailed(AcquisitionError::Cdp {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 为错误附加模块名与阶段
    ///
    /// 已经带有上下文的错误保持不变
    pub fn in_stage(self, module: impl Into<String>, stage: Stage) -> Self {
        match self {
            AppError::Pipeline { .. } => self,
            other => AppError::Pipeline {
                module: module.into(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::AcquisitionFailed(AcquisitionError::Navigation {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建网络请求失败错误
    pub fn request_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::AcquisitionFailed(AcquisitionError::Request {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Project(ProjectError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 返回错误所在的阶段（若有）
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// 剥掉上下文后的根错误
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
