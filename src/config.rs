use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::browser::BrowserOptions;
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::{Sandbox, SandboxLimits};

/// 项目目录下的可选配置文件
pub const CONFIG_FILE: &str = "harness.toml";

/// 批量运行时每个模块的起始 URL 如何确定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSeedMode {
    /// 每个模块都从同一个种子 URL 开始并独立翻页
    #[default]
    Independent,
    /// 每个模块只跑一页，nextUrl 作为下一个模块的起始 URL
    Chained,
}

impl FromStr for BatchSeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "independent" => Ok(BatchSeedMode::Independent),
            "chained" => Ok(BatchSeedMode::Chained),
            other => Err(format!("未知的批量模式: {}", other)),
        }
    }
}

/// 程序配置
///
/// 优先级：默认值 < harness.toml < 环境变量 < 命令行
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 单个模块最多获取的页数
    pub max_pages: usize,
    /// 页面导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// API 请求超时（秒）
    pub fetch_timeout_secs: u64,
    /// 页面内 logic 脚本超时（秒）
    pub script_timeout_secs: u64,
    /// 沙箱求值超时（秒）
    pub sandbox_timeout_secs: u64,
    /// 沙箱单个循环的最大迭代次数
    pub sandbox_loop_limit: u64,
    /// 沙箱最大递归深度
    pub sandbox_recursion_limit: usize,
    /// 沙箱子进程使用的可执行文件，未设置时在进程内求值
    pub sandbox_executable: Option<PathBuf>,
    /// 浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 连接已有浏览器的调试端口
    pub browser_debug_port: Option<u16>,
    /// API 请求使用的 User-Agent
    pub user_agent: String,
    /// 批量模式
    pub batch_seed_mode: BatchSeedMode,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pages: 25,
            navigation_timeout_secs: 30,
            fetch_timeout_secs: 30,
            script_timeout_secs: 15,
            sandbox_timeout_secs: 10,
            sandbox_loop_limit: 1_000_000,
            sandbox_recursion_limit: 512,
            sandbox_executable: None,
            chrome_executable: None,
            browser_debug_port: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            batch_seed_mode: BatchSeedMode::Independent,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：显式指定的文件，或项目目录下的 harness.toml（若存在），再叠加环境变量
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> AppResult<Self> {
        let path: Option<PathBuf> = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = project_dir.join(CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
        };

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.with_env(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 叠加 `HARNESS_*` 环境变量
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        if let Some(v) = env_parse(&lookup, "HARNESS_MAX_PAGES", "usize")? {
            self.max_pages = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_NAVIGATION_TIMEOUT", "u64")? {
            self.navigation_timeout_secs = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_FETCH_TIMEOUT", "u64")? {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_SCRIPT_TIMEOUT", "u64")? {
            self.script_timeout_secs = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_SANDBOX_TIMEOUT", "u64")? {
            self.sandbox_timeout_secs = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_SANDBOX_LOOP_LIMIT", "u64")? {
            self.sandbox_loop_limit = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_BROWSER_DEBUG_PORT", "u16")? {
            self.browser_debug_port = Some(v);
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_BATCH_SEED_MODE", "independent | chained")? {
            self.batch_seed_mode = v;
        }
        if let Some(v) = env_parse(&lookup, "HARNESS_VERBOSE", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = lookup("HARNESS_SANDBOX_EXECUTABLE") {
            self.sandbox_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HARNESS_CHROME") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = lookup("HARNESS_USER_AGENT") {
            self.user_agent = v;
        }
        Ok(self)
    }

    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            loop_iteration_limit: self.sandbox_loop_limit,
            recursion_limit: self.sandbox_recursion_limit,
            timeout: Duration::from_secs(self.sandbox_timeout_secs),
        }
    }

    /// 按配置构造沙箱
    pub fn sandbox(&self) -> Sandbox {
        let sandbox = Sandbox::new(self.sandbox_limits());
        match &self.sandbox_executable {
            Some(program) => sandbox.isolated(program),
            None => sandbox,
        }
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            chrome_executable: self.chrome_executable.as_ref().map(PathBuf::from),
            debug_port: self.browser_debug_port,
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

fn env_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
