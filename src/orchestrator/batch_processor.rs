//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量文档的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：读取配置、加载重新导入数据、构建共享的处理器
//! 2. **批量发现**：按目录约定扫描所有课程页面
//! 3. **顺序处理**：逐个处理文档，运行上下文在文档之间累计统计
//! 4. **并发处理**：可选，用 Semaphore 限制同时处理的文档数，结果按输入顺序重组
//! 5. **取消**：共享的停止标志在文档之间检查，未开始的文档记为跳过
//! 6. **全局统计**：生成报告和导出数据
//!
//! ## 设计特点
//!
//! - **失败隔离**：单个文档失败不会中断批量运行
//! - **向下委托**：委托 document_processor 处理单个文档

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ErrorKind;
use crate::models::loaders::load_interchange;
use crate::models::{
    discover_lessons, document_id_for, BatchReport, DocumentOutcome, InterchangeExport,
    OutcomeStatus, PatchMode,
};
use crate::orchestrator::document_processor::{DocumentProcessor, DocumentResult, ProcessOptions};
use crate::services::{summarize, BackupManager, ReportWriter, Summary, TemplateLibrary};
use crate::utils::logging;
use crate::workflow::PatchFlow;

/// 一次批量运行的输出
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub report: BatchReport,
    /// 配置了导出时收集到的数据
    pub export: Option<InterchangeExport>,
}

impl BatchRun {
    /// 生成摘要
    pub fn summary(&self) -> Summary {
        summarize(&self.report, self.export.clone())
    }
}

/// 运行上下文：在文档之间累计统计和导出数据
#[derive(Debug)]
struct RunContext {
    outcomes: Vec<DocumentOutcome>,
    export: Option<InterchangeExport>,
    updated: usize,
    skipped: usize,
    failed: usize,
}

impl RunContext {
    fn new(collect_data: bool) -> Self {
        Self {
            outcomes: Vec::new(),
            export: collect_data.then(InterchangeExport::new),
            updated: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, result: DocumentResult) {
        match result.outcome.status {
            OutcomeStatus::Updated | OutcomeStatus::WouldUpdate => self.updated += 1,
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed { .. } => self.failed += 1,
        }
        if let (Some(export), Some(data)) = (self.export.as_mut(), result.data) {
            export.insert(result.outcome.id.clone(), data);
        }
        self.outcomes.push(result.outcome);
    }

    fn log_progress(&self, done: usize, total: usize) {
        info!(
            "📈 进度 {}/{}: 更新 {}, 跳过 {}, 失败 {}",
            done, total, self.updated, self.skipped, self.failed
        );
    }
}

/// 批量处理器
pub struct BatchProcessor {
    processor: Arc<DocumentProcessor>,
    root: PathBuf,
    max_concurrent: usize,
    stop: Arc<AtomicBool>,
}

impl BatchProcessor {
    pub fn new(root: impl Into<PathBuf>, processor: DocumentProcessor, max_concurrent: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            root: root.into(),
            max_concurrent: max_concurrent.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 按配置构建（重新导入模式下会加载交换文件）
    pub fn from_config(config: &Config) -> Result<Self> {
        let mode = config.mode();
        let reimport = match (&config.reimport_path, mode) {
            (Some(path), PatchMode::Reimport) => Some(
                load_interchange(path)
                    .with_context(|| format!("无法加载重新导入文件: {}", path.display()))?,
            ),
            _ => None,
        };

        let flow = PatchFlow::new(
            config.desired_set(),
            mode,
            TemplateLibrary::new(config.audio_base.clone()),
        );
        let options = ProcessOptions {
            dry_run: config.dry_run,
            collect_data: config.export_path.is_some(),
        };
        let processor = DocumentProcessor::new(
            config.lessons_root.clone(),
            flow,
            BackupManager::new(config.backup_suffix.clone()),
            reimport,
            options,
        );

        Ok(Self::new(
            config.lessons_root.clone(),
            processor,
            config.concurrency(),
        ))
    }

    /// 停止标志：置为 true 后，尚未开始的文档不再处理
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// 顺序处理所有文档
    pub fn run(&self, paths: &[PathBuf]) -> BatchRun {
        let started_at = Local::now();
        let total = paths.len();
        let mut ctx = RunContext::new(self.processor.options().collect_data);

        for (i, path) in paths.iter().enumerate() {
            let index = i + 1;
            let result = if self.stopped() {
                self.cancelled(path, index)
            } else {
                self.processor.process(path, index, total)
            };
            ctx.record(result);
            ctx.log_progress(index, total);
        }

        self.finish(ctx, started_at)
    }

    /// 有界并发处理所有文档
    ///
    /// 每个文档在阻塞线程池上处理，同时运行的文档数不超过 `max_concurrent`；
    /// 结果按输入顺序汇总
    pub async fn run_concurrent(&self, paths: &[PathBuf]) -> BatchRun {
        if self.max_concurrent <= 1 {
            return self.run(paths);
        }

        let started_at = Local::now();
        let total = paths.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for (i, path) in paths.iter().enumerate() {
            let index = i + 1;
            let semaphore = semaphore.clone();
            let processor = self.processor.clone();
            let stop = self.stop.clone();
            let root = self.root.clone();
            let path = path.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("[文档 {}] 无法获取并发许可: {}", index, e);
                        return task_failed(&root, &path, index, e.to_string());
                    }
                };

                if stop.load(Ordering::SeqCst) {
                    return cancelled_result(&root, &path, index);
                }

                let worker_path = path.clone();
                match tokio::task::spawn_blocking(move || processor.process(&worker_path, index, total))
                    .await
                {
                    Ok(result) => result,
                    Err(e) => {
                        error!("[文档 {}] 任务执行失败: {}", index, e);
                        task_failed(&root, &path, index, e.to_string())
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(total);
        for (i, joined) in join_all(handles).await.into_iter().enumerate() {
            let result = joined.unwrap_or_else(|e| {
                error!("[文档 {}] 任务执行失败: {}", i + 1, e);
                task_failed(&self.root, &paths[i], i + 1, e.to_string())
            });
            results.push(result);
        }
        results.sort_by_key(|r| r.outcome.index);

        let mut ctx = RunContext::new(self.processor.options().collect_data);
        for result in results {
            ctx.record(result);
        }
        ctx.log_progress(total, total);

        self.finish(ctx, started_at)
    }

    fn cancelled(&self, path: &Path, index: usize) -> DocumentResult {
        cancelled_result(&self.root, path, index)
    }

    fn finish(&self, ctx: RunContext, started_at: chrono::DateTime<Local>) -> BatchRun {
        let options = self.processor.options();
        let report = BatchReport {
            mode: self.processor.flow().mode(),
            dry_run: options.dry_run,
            started_at,
            finished_at: Local::now(),
            outcomes: ctx.outcomes,
        };
        if !options.dry_run {
            info!("💾 本次运行创建了 {} 个快照", self.processor.backups().count());
        }
        BatchRun {
            report,
            export: ctx.export,
        }
    }
}

fn cancelled_result(root: &Path, path: &Path, index: usize) -> DocumentResult {
    warn!("[文档 {}] ⏹️ 运行已取消，跳过", index);
    let mut outcome = DocumentOutcome::new(index, document_id_for(root, path), path);
    outcome.status = OutcomeStatus::Skipped {
        reason: "cancelled".to_string(),
    };
    DocumentResult {
        outcome,
        data: None,
    }
}

fn task_failed(root: &Path, path: &Path, index: usize, reason: String) -> DocumentResult {
    let mut outcome = DocumentOutcome::new(index, document_id_for(root, path), path);
    outcome.status = OutcomeStatus::Failed {
        kind: ErrorKind::TaskError,
        reason,
    };
    DocumentResult {
        outcome,
        data: None,
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    batch: BatchProcessor,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);
        let batch = BatchProcessor::from_config(&config)?;
        Ok(Self { config, batch })
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.batch.stop_handle()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchRun> {
        info!("\n📁 正在扫描课程目录...");
        let paths = discover_lessons(&self.config.lessons_root)
            .with_context(|| format!("无法扫描课程目录: {}", self.config.lessons_root.display()))?;

        if paths.is_empty() {
            warn!("⚠️ 没有找到任何课程页面");
        }
        logging::log_documents_loaded(paths.len(), self.config.concurrency());

        let run = self.batch.run_concurrent(&paths).await;

        let summary = run.summary();
        ReportWriter::new(self.config.report_path.clone())
            .with_export(self.config.export_path.clone())
            .write(&summary)
            .context("无法写入报告")?;

        logging::print_final_stats(&run.report, &self.config.report_path);
        Ok(run)
    }
}
