use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::{BatchSeedMode, Config};
use crate::models::ModuleKind;
use crate::orchestrator::{RunMode, RunRequest};

/// 模块测试工具
#[derive(Debug, Parser)]
#[command(
    name = "module-harness",
    about = "在无头浏览器中运行并检查模块脚本",
    version
)]
#[command(group(ArgGroup::new("mode").required(true).args(["test", "build"])))]
pub struct Cli {
    /// 获取内容并提取结果
    #[arg(short, long)]
    pub test: bool,

    /// 离线检查模块（不访问网络）
    #[arg(short, long)]
    pub build: bool,

    /// 模块类别：search | info | media
    #[arg(default_value = "search")]
    pub kind: ModuleKind,

    /// 查询词（search）或种子 URL（info / media）
    pub target: Option<String>,

    /// 项目目录
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// 配置文件（默认使用项目目录下的 harness.toml）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 单个模块最多获取的页数
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// 批量模式下用上一个模块的 nextUrl 作为下一个模块的起始 URL
    #[arg(long)]
    pub chained: bool,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        if self.build {
            RunMode::Build
        } else {
            RunMode::Test
        }
    }

    /// 命令行参数覆盖配置
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if self.chained {
            config.batch_seed_mode = BatchSeedMode::Chained;
        }
        if self.verbose {
            config.verbose_logging = true;
        }
        config
    }

    pub fn run_request(&self) -> RunRequest {
        RunRequest {
            kind: self.kind,
            mode: self.mode(),
            target: self.target.clone(),
        }
    }
}
