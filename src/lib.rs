//! # Lesson Patcher
//!
//! 一个用于批量维护互动课程页面的 Rust 应用程序：
//! 检测每个页面已有的功能，提取页面中的题目和学习目标，
//! 再把缺失或过时的功能代码块注入/替换进去，且不破坏页面其余部分。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有文件读写能力
//! - `FileStore` - 读取、原子写入、独占创建
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档的文本
//! - `FeatureRegistry` - 功能目录（检测规则、锚点、旧版标记、模板）
//! - `FeatureDetector` - 功能检测
//! - `StructuredExtractor` - 按规则提取题目/学习目标/标题
//! - `TemplateLibrary` - 生成功能代码块
//! - `TransformEngine` - 合并重复、替换旧块、插入新块，并做平衡检查
//! - `BackupManager` - 修改前快照
//! - `summarize` / `ReportWriter` - 报告和导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文档"在内存中的处理流程
//! - `DocumentCtx` - 上下文封装（文档序号 + 标识）
//! - `PatchFlow` - 流程编排（检测 → 提取 → 转换）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理、并发、取消、报告
//! - `orchestrator/document_processor` - 单个文档：加载、备份、写回
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use infrastructure::FileStore;
pub use models::{
    BatchReport, Document, DocumentOutcome, FeatureName, InterchangeExport, LessonData,
    OutcomeStatus, PatchMode, Question,
};
pub use orchestrator::{App, BatchProcessor, BatchRun, DocumentProcessor, ProcessOptions};
pub use services::{TemplateLibrary, TransformEngine, TransformResult};
pub use workflow::{DocumentCtx, PatchFlow};
