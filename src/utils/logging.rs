/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchReport;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则按 `verbose` 选择 debug / info 级别。
/// 重复调用不会报错（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "lesson_patcher=debug"
    } else {
        "lesson_patcher=info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 课程功能补丁");
    info!("📁 课程目录: {}", config.lessons_root.display());
    info!("🧩 期望功能: {}", feature_list(config));
    info!("📊 最大并发数: {}", config.concurrency());
    info!("🔁 模式: {}", config.mode());
    if config.dry_run {
        info!("🧪 演练模式：不会备份，也不会写入任何文件");
    }
    info!("{}", "=".repeat(60));
}

fn feature_list(config: &Config) -> String {
    config
        .desired_features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 记录文档加载信息
///
/// # 参数
/// - `total`: 文档总数
/// - `max_concurrent`: 最大并发数
pub fn log_documents_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的课程页面", total);
    if max_concurrent > 1 {
        info!("📋 最多同时处理 {} 个文档", max_concurrent);
    } else {
        info!("📋 按顺序逐个处理");
    }
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, report_path: &std::path::Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已更新: {}/{}", report.updated(), report.total());
    info!("⏭️ 已跳过: {}", report.skipped());
    info!("❌ 失败: {}", report.failed());
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_path.display());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("الخلية النباتية", 6), "الخلية...");
        assert_eq!(truncate_text("قصير", 10), "قصير");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
