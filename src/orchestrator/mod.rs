//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文档处理器
//! - 管理应用生命周期（初始化、运行、写报告）
//! - 发现并遍历所有课程页面（Vec<PathBuf>）
//! - 控制并发数量（Semaphore），结果按输入顺序汇总
//! - 支持取消（停止标志）
//! - 输出全局统计信息
//!
//! ### `document_processor` - 单个文档处理器
//! - 加载单个文档
//! - 调用 PatchFlow（检测 → 提取 → 转换）
//! - 备份、原子写回
//! - 把每一步结果记录为 DocumentOutcome
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! document_processor (处理单个文档：加载、备份、写回)
//!     ↓
//! workflow::PatchFlow (内存中的 检测 → 提取 → 转换)
//!     ↓
//! services (能力层：detector / extractor / transform / backup / report)
//!     ↓
//! infrastructure (基础设施：FileStore)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，document_processor 管单个
//! 2. **失败隔离**：错误止步于单个文档，批量运行总能跑完
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod batch_processor;
pub mod document_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchProcessor, BatchRun};
pub use document_processor::{DocumentProcessor, DocumentResult, DocumentState, ProcessOptions};
