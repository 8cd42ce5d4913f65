use std::path::Path;

use tokio::fs;
use tracing::warn;

use crate::error::{AppResult, ProjectError};
use crate::models::metadata::ProjectMetadata;

/// 项目描述文件名
pub const METADATA_FILE: &str = "metadata.json";

/// 从项目目录加载 `metadata.json`
///
/// 文件不存在时返回错误，调用方应在获取任何内容之前中止；
/// 内容无法解析时只记录警告并使用空的描述
pub async fn load_metadata(project_dir: &Path) -> AppResult<ProjectMetadata> {
    let path = project_dir.join(METADATA_FILE);
    let path_str = path.display().to_string();

    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ProjectError::MissingMetadata { path: path_str }.into());
    }

    let content = fs::read_to_string(&path)
        .await
        .map_err(|source| ProjectError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    match serde_json::from_str::<ProjectMetadata>(&content) {
        Ok(metadata) => Ok(metadata),
        Err(e) => {
            warn!("⚠️ {} 无法解析，忽略其内容: {}", path_str, e);
            Ok(ProjectMetadata::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;

    #[tokio::test]
    async fn test_load_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"name":"Demo","general":{"author":"someone"},"version":"0.2.1","formatVersion":2}"#,
        )
        .unwrap();

        let metadata = load_metadata(dir.path()).await.unwrap();
        assert_eq!(metadata.name(), "Demo");
        assert_eq!(metadata.author(), "someone");
        assert_eq!(metadata.version(), "0.2.1");
        assert_eq!(metadata.format_version, serde_json::json!(2));
    }

    #[test]
    fn test_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::block_on(load_metadata(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            AppError::Project(ProjectError::MissingMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn test_numeric_version_and_missing_general() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"name":"Demo","version":2}"#,
        )
        .unwrap();

        let metadata = load_metadata(dir.path()).await.unwrap();
        assert_eq!(metadata.name(), "Demo");
        assert_eq!(metadata.version(), "2");
        assert_eq!(metadata.author(), "-");
    }

    #[tokio::test]
    async fn test_unparsable_metadata_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), "{ not json").unwrap();

        let metadata = load_metadata(dir.path()).await.unwrap();
        assert_eq!(metadata.name(), "-");
        assert_eq!(metadata.version(), "-");
    }
}
