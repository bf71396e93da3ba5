use std::path::PathBuf;

use anyhow::{Context, Result};
use lesson_patcher::utils::logging;
use lesson_patcher::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let mut config = Config::load().context("无法加载配置")?;

    // 第一个参数可覆盖课程目录
    if let Some(root) = std::env::args().nth(1) {
        config.lessons_root = PathBuf::from(root);
    }

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config)?;

    let stop = app.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⏹️ 收到中断信号，处理完当前文档后停止");
            stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let run = app.run().await?;
    if run.report.failed() > 0 {
        tracing::warn!("⚠️ 有 {} 个文档处理失败，详见报告", run.report.failed());
    }

    Ok(())
}
