use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AppResult, ProjectError};
use crate::models::module_source::{ModuleKind, ModuleSource};

/// Search 模块的固定文件名
pub const SEARCH_MODULE_FILE: &str = "code.js";

/// 一个类别下的模块文件列表
///
/// 列表在创建时确定（按文件名排序），可以反复迭代；
/// 文件内容在迭代时才读取
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    kind: ModuleKind,
    paths: Vec<PathBuf>,
}

impl ModuleCatalog {
    /// 直接从路径列表创建
    pub fn from_paths(kind: ModuleKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// 扫描项目目录下某个类别的模块
    pub async fn discover(project_dir: &Path, kind: ModuleKind) -> AppResult<Self> {
        let folder = project_dir.join(kind.dir_name());

        if kind == ModuleKind::Search {
            let file = folder.join(SEARCH_MODULE_FILE);
            if !fs::try_exists(&file).await.unwrap_or(false) {
                return Err(ProjectError::DirectoryNotFound {
                    path: file.display().to_string(),
                }
                .into());
            }
            return Ok(Self::from_paths(kind, vec![file]));
        }

        if !fs::try_exists(&folder).await.unwrap_or(false) {
            return Err(ProjectError::DirectoryNotFound {
                path: folder.display().to_string(),
            }
            .into());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&folder)
            .await
            .map_err(|e| crate::AppError::file_read_failed(folder.display().to_string(), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| crate::AppError::file_read_failed(folder.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("js") {
                paths.push(path);
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::debug!("{} 中共有 {} 个 JS 模块", folder.display(), paths.len());

        Ok(Self::from_paths(kind, paths))
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// 按顺序迭代模块路径
    pub fn iter(&self) -> impl Iterator<Item = &Path> + '_ {
        self.paths.iter().map(PathBuf::as_path)
    }
}

/// 读取单个模块文件
pub async fn load_module(path: &Path) -> AppResult<ModuleSource> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| crate::AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(ModuleSource::from_file(path, text))
}
