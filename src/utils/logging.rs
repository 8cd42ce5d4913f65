/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::{info, warn};

use crate::models::{ModuleCatalog, ProjectMetadata};
use crate::orchestrator::{RunMode, RunSummary};

/// 记录程序启动信息
pub fn log_startup(metadata: &ProjectMetadata, mode: RunMode, target: Option<&str>) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 {} v{} (作者: {})",
        metadata.name(),
        metadata.version(),
        metadata.author()
    );
    info!("🧪 运行模式: {}", mode);
    if let Some(target) = target {
        info!("🎯 目标: {}", truncate_text(target, 80));
    }
    info!("{}", "=".repeat(60));
}

/// 记录模块目录信息
pub fn log_catalog(catalog: &ModuleCatalog) {
    if catalog.is_empty() {
        warn!("⚠️ {} 目录下没有找到模块", catalog.kind().dir_name());
        return;
    }
    info!("✓ 找到 {} 个 {} 模块", catalog.len(), catalog.kind());
    for path in catalog.iter() {
        info!("  - {}", path.display());
    }
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部运行完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("📄 结果页数: {}", summary.pages);
    info!("❌ 失败: {}", summary.failed.len());
    for failed in &summary.failed {
        match failed.stage {
            Some(stage) => info!("   - {} [{}]: {}", failed.module, stage, failed.error),
            None => info!("   - {}: {}", failed.module, failed.error),
        }
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
