//! 模块源码与模块类别

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 模块类别
///
/// 每个类别对应项目目录下的一个子目录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// 搜索，单文件 `Search/code.js`
    Search,
    /// 详情，`Info/*.js`
    Info,
    /// 媒体，`Media/*.js`
    Media,
}

impl ModuleKind {
    /// 模块所在的子目录名
    pub fn dir_name(self) -> &'static str {
        match self {
            ModuleKind::Search => "Search",
            ModuleKind::Info => "Info",
            ModuleKind::Media => "Media",
        }
    }

    /// 命令行中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Search => "search",
            ModuleKind::Info => "info",
            ModuleKind::Media => "media",
        }
    }

    /// 是否按目录批量运行
    pub fn is_batch(self) -> bool {
        !matches!(self, ModuleKind::Search)
    }
}

impl Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "search" => Ok(ModuleKind::Search),
            "info" => Ok(ModuleKind::Info),
            "media" => Ok(ModuleKind::Media),
            other => Err(format!("未知的模块类别: {} (可选 search | info | media)", other)),
        }
    }
}

/// 一个模块文件的原始源码
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// 模块名（文件名）
    pub name: String,
    /// 文件路径（内存中构造的模块没有路径）
    pub path: Option<PathBuf>,
    /// 源码文本
    pub text: String,
}

impl ModuleSource {
    /// 从内存中的文本创建
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            text: text.into(),
        }
    }

    /// 从文件路径和已读取的文本创建
    pub fn from_file(path: &Path, text: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: Some(path.to_path_buf()),
            text,
        }
    }
}
