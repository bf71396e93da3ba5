use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::models::FeatureName;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 补丁引擎错误
    #[error("补丁错误: {0}")]
    Patch(#[from] PatchError),
    /// 交换文件错误
    #[error("交换文件错误: {0}")]
    Interchange(#[from] InterchangeError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 创建备份失败
    #[error("创建备份失败 ({path}): {source}")]
    BackupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 补丁引擎错误
#[derive(Debug, Error)]
pub enum PatchError {
    /// 没有任何提取规则匹配
    #[error("没有提取规则匹配 {kind}")]
    GrammarMismatch { kind: String },
    /// 功能的所有候选锚点都未命中
    #[error("功能 {feature} 未找到任何锚点")]
    AnchorNotFound { feature: FeatureName },
    /// 分隔符不平衡
    #[error("分隔符不平衡: {detail}")]
    BalanceViolation { detail: String },
    /// 转换后功能出现次数不为 1
    #[error("功能 {feature} 出现 {count} 次 (应为 1 次)")]
    FeatureCountMismatch { feature: FeatureName, count: usize },
}

/// 交换文件错误
#[derive(Debug, Error)]
pub enum InterchangeError {
    /// 读取或写入交换文件失败
    #[error("交换文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析或序列化失败
    #[error("JSON 处理失败 ({path}): {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// TOML 序列化失败
    #[error("TOML 序列化失败 ({path}): {source}")]
    TomlWrite {
        path: String,
        #[source]
        source: toml::ser::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("无法解析配置文件 {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 未知的功能名称
    #[error("未知的功能名称: {name}")]
    UnknownFeature { name: String },
}

/// 报告中使用的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ReadError,
    GrammarMismatch,
    AnchorNotFound,
    BalanceViolation,
    FeatureCountMismatch,
    BackupError,
    WriteError,
    InterchangeError,
    ConfigError,
    /// 工作线程异常退出
    TaskError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ReadError => "ReadError",
            ErrorKind::GrammarMismatch => "GrammarMismatch",
            ErrorKind::AnchorNotFound => "AnchorNotFound",
            ErrorKind::BalanceViolation => "BalanceViolation",
            ErrorKind::FeatureCountMismatch => "FeatureCountMismatch",
            ErrorKind::BackupError => "BackupError",
            ErrorKind::WriteError => "WriteError",
            ErrorKind::InterchangeError => "InterchangeError",
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::TaskError => "TaskError",
        };
        f.write_str(name)
    }
}

impl AppError {
    /// 错误对应的报告类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::File(FileError::ReadFailed { .. })
            | AppError::File(FileError::DirectoryNotFound { .. }) => ErrorKind::ReadError,
            AppError::File(FileError::WriteFailed { .. }) => ErrorKind::WriteError,
            AppError::File(FileError::BackupFailed { .. }) => ErrorKind::BackupError,
            AppError::Patch(e) => e.kind(),
            AppError::Interchange(_) => ErrorKind::InterchangeError,
            AppError::Config(_) => ErrorKind::ConfigError,
        }
    }
}

impl PatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::GrammarMismatch { .. } => ErrorKind::GrammarMismatch,
            PatchError::AnchorNotFound { .. } => ErrorKind::AnchorNotFound,
            PatchError::BalanceViolation { .. } => ErrorKind::BalanceViolation,
            PatchError::FeatureCountMismatch { .. } => ErrorKind::FeatureCountMismatch,
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn read_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn write_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建备份错误
    pub fn backup_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::BackupFailed {
            path: path.display().to_string(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
