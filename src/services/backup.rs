//! 备份服务 - 业务能力层
//!
//! 只负责"第一次修改前留一份快照"的能力

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::FileStore;

/// 默认快照后缀
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup_patch";

/// 一次运行中某个文档的快照记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub created_at: DateTime<Local>,
}

/// 备份服务
///
/// 职责：
/// - 快照路径 = 原路径 + 后缀
/// - 同一次运行内对同一文档只备份一次
/// - 绝不覆盖已有文件：上次运行留下的快照存在时改用带时间戳的文件名
pub struct BackupManager {
    suffix: String,
    store: FileStore,
    records: Mutex<HashMap<PathBuf, BackupRecord>>,
}

impl BackupManager {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            store: FileStore::new(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// 确保文档已有快照
    ///
    /// # 返回
    /// 本次运行中该文档的快照记录（重复调用返回第一次的记录）
    pub fn ensure_backup(&self, path: &Path, original: &[u8]) -> AppResult<BackupRecord> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(record) = records.get(path) {
            return Ok(record.clone());
        }

        let snapshot_path = self.write_snapshot(path, original)?;
        let record = BackupRecord {
            original_path: path.to_path_buf(),
            snapshot_path,
            created_at: Local::now(),
        };
        records.insert(path.to_path_buf(), record.clone());
        Ok(record)
    }

    /// 本次运行已创建的快照数
    pub fn count(&self) -> usize {
        self.records
            .lock()
            .map(|records| records.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    /// 确定的快照路径
    pub fn snapshot_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(&self.suffix);
        PathBuf::from(name)
    }

    fn write_snapshot(&self, path: &Path, original: &[u8]) -> AppResult<PathBuf> {
        let primary = self.snapshot_path(path);
        match self.store.create_new(&primary, original) {
            Ok(()) => {
                info!("💾 已创建快照: {}", primary.display());
                return Ok(primary);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(AppError::backup_failed(&primary, e)),
        }

        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let mut counter = 0usize;
        loop {
            let candidate = timestamped(&primary, &stamp, counter);
            match self.store.create_new(&candidate, original) {
                Ok(()) => {
                    warn!(
                        "⚠️ 快照 {} 已存在（来自之前的运行），改为写入 {}",
                        primary.display(),
                        candidate.display()
                    );
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(AppError::backup_failed(&candidate, e)),
            }
        }
    }
}

/// `x.backup_patch` → `x.backup_patch.20240101120000`（冲突时追加 `-N`）
fn timestamped(primary: &Path, stamp: &str, counter: usize) -> PathBuf {
    let mut name = primary.as_os_str().to_owned();
    name.push(".");
    name.push(stamp);
    if counter > 0 {
        name.push(format!("-{}", counter));
    }
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_backup_once_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "original").unwrap();

        let manager = BackupManager::new(DEFAULT_BACKUP_SUFFIX);
        let first = manager.ensure_backup(&path, b"original").unwrap();
        let second = manager.ensure_backup(&path, b"changed").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.snapshot_path, dir.path().join("index.html.backup_patch"));
        assert_eq!(fs::read(&first.snapshot_path).unwrap(), b"original");
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_existing_snapshot_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        let old_snapshot = dir.path().join("index.html.backup_patch");
        fs::write(&old_snapshot, "from last run").unwrap();

        let manager = BackupManager::new(DEFAULT_BACKUP_SUFFIX);
        let record = manager.ensure_backup(&path, b"today").unwrap();

        assert_ne!(record.snapshot_path, old_snapshot);
        assert_eq!(fs::read(&old_snapshot).unwrap(), b"from last run");
        assert_eq!(fs::read(&record.snapshot_path).unwrap(), b"today");

        // 同一秒内的另一次运行
        let other_run = BackupManager::new(DEFAULT_BACKUP_SUFFIX);
        let again = other_run.ensure_backup(&path, b"again").unwrap();
        assert_ne!(again.snapshot_path, record.snapshot_path);
        assert_eq!(fs::read(&record.snapshot_path).unwrap(), b"today");
    }

    #[test]
    fn test_backup_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("index.html");
        let err = BackupManager::new(".bak").ensure_backup(&path, b"x").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BackupError);
    }
}
