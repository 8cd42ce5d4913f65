use serde::Deserialize;
use serde_json::Value;

/// 项目描述文件 `metadata.json`
///
/// 只用于显示，所有字段都可以缺失或是任意 JSON 类型
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub name: Value,
    pub general: Value,
    pub version: Value,
    pub format_version: Value,
}

impl ProjectMetadata {
    pub fn name(&self) -> String {
        display(&self.name)
    }

    /// `general.author`
    pub fn author(&self) -> String {
        display(self.general.get("author").unwrap_or(&Value::Null))
    }

    pub fn version(&self) -> String {
        display(&self.version)
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
