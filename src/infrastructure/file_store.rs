//! 文件存储 - 基础设施层
//!
//! 唯一直接读写课程页面和快照文件的地方，只暴露能力：
//! 读取、原子写入、独占创建

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 文件存储
///
/// 职责：
/// - 读取文档原文
/// - 通过"临时文件 + rename"原子覆盖文档
/// - 独占创建快照文件（已存在时失败，绝不覆盖）
/// - 不认识 Document / Feature
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    /// 读取文件内容
    pub fn read(&self, path: &Path) -> AppResult<String> {
        fs::read_to_string(path).map_err(|e| AppError::read_failed(path, e))
    }

    /// 原子写入
    ///
    /// 先写同目录下的临时文件并同步到磁盘，再 rename 覆盖目标；
    /// 任一步失败时目标文件保持原样
    pub fn write_atomic(&self, path: &Path, content: &str) -> AppResult<()> {
        let tmp_path = temp_path_for(path);

        let result = write_and_sync(&tmp_path, content).and_then(|_| fs::rename(&tmp_path, path));
        if let Err(e) = result {
            if tmp_path.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp_path) {
                    warn!("⚠️ 无法清理临时文件 {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(AppError::write_failed(path, e));
        }

        debug!("原子写入完成: {}", path.display());
        Ok(())
    }

    /// 独占创建文件并写入内容
    ///
    /// 目标已存在时返回 `io::ErrorKind::AlreadyExists`
    pub fn create_new(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(content)?;
        file.sync_all()
    }
}

fn write_and_sync(path: &Path, content: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// `index.html` → `index.html.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "قديم").unwrap();

        let store = FileStore::new();
        store.write_atomic(&path, "جديد").unwrap();
        assert_eq!(store.read(&path).unwrap(), "جديد");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_write_atomic_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("index.html");
        let err = FileStore::new().write_atomic(&path, "x").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::WriteError);
    }

    #[test]
    fn test_create_new_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap");
        let store = FileStore::new();
        store.create_new(&path, b"first").unwrap();

        let err = store.create_new(&path, b"second").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }
}
