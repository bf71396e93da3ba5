//! 单个文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理单个课程页面，是文档级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **加载**：读取原文，构建 `Document`
//! 2. **流程调度**：委托 `PatchFlow` 完成 检测 → 提取 → 转换
//! 3. **备份**：第一次写入前创建快照
//! 4. **写回**：原子覆盖原文件
//! 5. **状态记录**：把每一步的结果变成可报告的 `DocumentOutcome`
//!
//! 任何一步失败都只影响当前文档，错误被转换为 `FAILED(原因)` 返回。

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{AppError, ErrorKind};
use crate::infrastructure::FileStore;
use crate::models::{
    document_id_for, Document, DocumentOutcome, InterchangeExport, LessonData, OutcomeStatus,
};
use crate::services::BackupManager;
use crate::utils::truncate_text;
use crate::workflow::{DocumentCtx, PatchFlow};

/// 文档处理状态
///
/// `Unprocessed → Detected → {Skipped | Extracted → Transformed → BackedUp → Written} | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Unprocessed,
    Detected,
    Skipped,
    Extracted,
    Transformed,
    BackedUp,
    Written,
    Failed,
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentState::Unprocessed => "未处理",
            DocumentState::Detected => "已检测",
            DocumentState::Skipped => "已跳过",
            DocumentState::Extracted => "已提取",
            DocumentState::Transformed => "已转换",
            DocumentState::BackedUp => "已备份",
            DocumentState::Written => "已写入",
            DocumentState::Failed => "失败",
        };
        f.write_str(name)
    }
}

/// 处理选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// 演练：不备份、不写入
    pub dry_run: bool,
    /// 为导出收集数据（包括被跳过的文档）
    pub collect_data: bool,
}

/// 单个文档的处理结果
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub outcome: DocumentOutcome,
    /// 用于导出的数据
    pub data: Option<LessonData>,
}

/// 单个文档处理器
///
/// 持有一次运行中共享的流程、备份服务和导入数据；可以跨线程共享
pub struct DocumentProcessor {
    root: PathBuf,
    flow: PatchFlow,
    backups: BackupManager,
    store: FileStore,
    reimport: Option<InterchangeExport>,
    options: ProcessOptions,
}

impl DocumentProcessor {
    pub fn new(
        root: impl Into<PathBuf>,
        flow: PatchFlow,
        backups: BackupManager,
        reimport: Option<InterchangeExport>,
        options: ProcessOptions,
    ) -> Self {
        Self {
            root: root.into(),
            flow,
            backups,
            store: FileStore::new(),
            reimport,
            options,
        }
    }

    pub fn flow(&self) -> &PatchFlow {
        &self.flow
    }

    pub fn options(&self) -> ProcessOptions {
        self.options
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// 处理单个文档
    ///
    /// # 参数
    /// - `path`: 文档路径
    /// - `index`: 文档序号（从 1 开始，用于日志和报告排序）
    /// - `total`: 文档总数
    pub fn process(&self, path: &Path, index: usize, total: usize) -> DocumentResult {
        let id = document_id_for(&self.root, path);
        let mut outcome = DocumentOutcome::new(index, id.clone(), path);
        let mut state = DocumentState::Unprocessed;

        info!("\n[文档 {}] {}", index, "─".repeat(30));
        info!("[文档 {}] 开始处理 {}/{}: {}", index, index, total, id);

        // ========== 加载 ==========
        let raw_text = match self.store.read(path) {
            Ok(text) => text,
            Err(e) => {
                fail(&mut outcome, &mut state, e.kind(), e.to_string());
                return DocumentResult {
                    outcome,
                    data: None,
                };
            }
        };
        let mut document = Document::new(path, id, raw_text);
        let ctx = DocumentCtx::new(
            document.id().to_string(),
            index,
            total,
            document.meta.topic,
        );

        // ========== 检测 → 提取 → 转换 ==========
        let output = self.flow.run(
            &mut document,
            &ctx,
            self.reimport.as_ref(),
            self.options.collect_data,
        );
        transition(index, &mut state, DocumentState::Detected);
        outcome.warnings.extend(output.warnings);
        let data = output.data;

        let Some(result) = output.transform else {
            transition(index, &mut state, DocumentState::Skipped);
            outcome.status = OutcomeStatus::Skipped {
                reason: "已具备所有期望功能".to_string(),
            };
            return DocumentResult { outcome, data };
        };
        transition(index, &mut state, DocumentState::Extracted);
        outcome.warnings.extend(result.warnings.iter().cloned());

        let patched = match (result.success, result.patched_text) {
            (true, Some(text)) => text,
            _ => {
                let kind = result.error.unwrap_or(ErrorKind::BalanceViolation);
                let reason = result.error_detail.unwrap_or_else(|| "转换失败".to_string());
                fail(&mut outcome, &mut state, kind, reason);
                return DocumentResult { outcome, data };
            }
        };
        transition(index, &mut state, DocumentState::Transformed);

        if !result.changed {
            transition(index, &mut state, DocumentState::Skipped);
            outcome.status = OutcomeStatus::Skipped {
                reason: "无需修改".to_string(),
            };
            return DocumentResult { outcome, data };
        }
        outcome.applied = result.applied_features;

        if self.options.dry_run {
            info!(
                "[文档 {}] 🧪 演练：本应更新 {} 个功能",
                index,
                outcome.applied.len()
            );
            outcome.status = OutcomeStatus::WouldUpdate;
            return DocumentResult { outcome, data };
        }

        // ========== 备份 → 写回 ==========
        if let Err(e) = self.write_back(&document, &patched, &mut outcome, &mut state) {
            outcome.applied.clear();
            fail(&mut outcome, &mut state, e.kind(), e.to_string());
            return DocumentResult { outcome, data };
        }

        outcome.status = OutcomeStatus::Updated;
        info!(
            "[文档 {}] ✅ 已更新: {}",
            index,
            outcome
                .applied
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        DocumentResult { outcome, data }
    }

    /// 先备份，再原子写回
    fn write_back(
        &self,
        document: &Document,
        patched: &str,
        outcome: &mut DocumentOutcome,
        state: &mut DocumentState,
    ) -> Result<(), AppError> {
        let record = self
            .backups
            .ensure_backup(&document.path, document.raw_text.as_bytes())?;
        outcome.backup = Some(record.snapshot_path);
        transition(outcome.index, state, DocumentState::BackedUp);

        self.store.write_atomic(&document.path, patched)?;
        transition(outcome.index, state, DocumentState::Written);
        Ok(())
    }
}

fn transition(index: usize, state: &mut DocumentState, next: DocumentState) {
    debug!("[文档 {}] 状态: {} → {}", index, state, next);
    *state = next;
}

fn fail(outcome: &mut DocumentOutcome, state: &mut DocumentState, kind: ErrorKind, reason: String) {
    transition(outcome.index, state, DocumentState::Failed);
    match kind {
        ErrorKind::ReadError => warn!("[文档 {}] ⚠️ 无法读取: {}", outcome.index, reason),
        _ => error!(
            "[文档 {}] ❌ 处理失败 ({}): {}",
            outcome.index,
            kind,
            truncate_text(&reason, 200)
        ),
    }
    outcome.status = OutcomeStatus::Failed { kind, reason };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureName, PatchMode};
    use crate::services::{TemplateLibrary, DEFAULT_BACKUP_SUFFIX};
    use std::fs;

    fn processor(root: &Path, dry_run: bool) -> DocumentProcessor {
        processor_with_suffix(root, dry_run, DEFAULT_BACKUP_SUFFIX)
    }

    fn processor_with_suffix(root: &Path, dry_run: bool, suffix: &str) -> DocumentProcessor {
        let flow = PatchFlow::new(
            [FeatureName::SoundSystem].into_iter().collect(),
            PatchMode::Live,
            TemplateLibrary::new("../../assets/audio"),
        );
        DocumentProcessor::new(
            root,
            flow,
            BackupManager::new(suffix),
            None,
            ProcessOptions {
                dry_run,
                collect_data: false,
            },
        )
    }

    fn write_lesson(root: &Path, body: &str) -> PathBuf {
        let dir = root.join("unit-1-cells").join("lesson-1-1");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.html");
        fs::write(&path, body).unwrap();
        path
    }

    const PAGE: &str = "<html><body><script>\nAOS.init();\n</script></body></html>";

    #[test]
    fn test_updates_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lesson(dir.path(), PAGE);

        let result = processor(dir.path(), false).process(&path, 1, 1);
        assert_eq!(result.outcome.status, OutcomeStatus::Updated);
        assert_eq!(result.outcome.id, "unit-1-cells/lesson-1-1");
        assert_eq!(result.outcome.applied, vec![FeatureName::SoundSystem]);

        let backup = result.outcome.backup.unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), PAGE);
        assert!(fs::read_to_string(&path).unwrap().contains("const SoundSystem"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lesson(dir.path(), PAGE);

        let result = processor(dir.path(), true).process(&path, 1, 1);
        assert_eq!(result.outcome.status, OutcomeStatus::WouldUpdate);
        assert_eq!(fs::read_to_string(&path).unwrap(), PAGE);
        assert!(!path.with_file_name("index.html.backup_patch").exists());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit-1-cells/lesson-9-9/index.html");
        let result = processor(dir.path(), false).process(&path, 2, 2);
        assert!(matches!(
            result.outcome.status,
            OutcomeStatus::Failed {
                kind: ErrorKind::ReadError,
                ..
            }
        ));
    }

    #[test]
    fn test_backup_failure_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lesson(dir.path(), PAGE);

        // 快照路径落在一个不存在的目录里
        let result = processor_with_suffix(dir.path(), false, "/missing/snapshot").process(&path, 1, 1);
        assert!(matches!(
            result.outcome.status,
            OutcomeStatus::Failed {
                kind: ErrorKind::BackupError,
                ..
            }
        ));
        assert!(result.outcome.applied.is_empty());
        assert!(result.outcome.backup.is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), PAGE);
    }

    #[test]
    fn test_write_failure_keeps_original_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lesson(dir.path(), PAGE);
        // 临时文件的位置被目录占用，写入必然失败
        fs::create_dir(path.with_file_name("index.html.tmp")).unwrap();

        let result = processor(dir.path(), false).process(&path, 1, 1);
        assert!(matches!(
            result.outcome.status,
            OutcomeStatus::Failed {
                kind: ErrorKind::WriteError,
                ..
            }
        ));
        assert!(result.outcome.applied.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), PAGE);

        let snapshot = path.with_file_name("index.html.backup_patch");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), PAGE);
    }
}
