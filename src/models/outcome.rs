use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::models::feature::FeatureName;

/// 数据来源模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchMode {
    /// 从文档实时提取数据
    Live,
    /// 使用交换文件中的数据，并刷新携带数据的功能块
    Reimport,
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchMode::Live => write!(f, "实时提取"),
            PatchMode::Reimport => write!(f, "重新导入"),
        }
    }
}

/// 单个文档的最终状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 已写回磁盘
    Updated,
    /// 演练模式下本应写回
    WouldUpdate,
    Skipped { reason: String },
    Failed { kind: ErrorKind, reason: String },
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Updated => "UPDATED",
            OutcomeStatus::WouldUpdate => "WOULD UPDATE",
            OutcomeStatus::Skipped { .. } => "SKIPPED",
            OutcomeStatus::Failed { .. } => "FAILED",
        }
    }
}

/// 单个文档的处理记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    /// 在输入列表中的序号（从 1 开始）
    pub index: usize,
    pub id: String,
    pub path: PathBuf,
    pub status: OutcomeStatus,
    pub applied: Vec<FeatureName>,
    pub warnings: Vec<String>,
    pub backup: Option<PathBuf>,
}

impl DocumentOutcome {
    pub fn new(index: usize, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            id: id.into(),
            path: path.into(),
            status: OutcomeStatus::Skipped {
                reason: "未处理".to_string(),
            },
            applied: Vec::new(),
            warnings: Vec::new(),
            backup: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// 一次批量运行的结果（按输入顺序）
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: PatchMode,
    pub dry_run: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// 已更新（演练模式下计入"本应更新"）
    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.status,
                    OutcomeStatus::Updated | OutcomeStatus::WouldUpdate
                )
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}
