use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{FeatureName, PatchMode};
use crate::services::DEFAULT_BACKUP_SUFFIX;

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "LESSON_PATCH_CONFIG";

/// 默认配置文件（工作目录下）
pub const DEFAULT_CONFIG_FILE: &str = "lesson_patch.toml";

/// 程序配置
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 课程根目录（包含 unit-*/lesson-*/index.html）
    pub lessons_root: PathBuf,
    /// 期望每个文档具备的功能
    pub desired_features: Vec<FeatureName>,
    /// 快照文件后缀
    pub backup_suffix: String,
    /// 音频资源目录（相对于课程页面）
    pub audio_base: String,
    /// 文本报告路径
    pub report_path: PathBuf,
    /// 交换文件导出路径（`.toml` 为 TOML，其余为 JSON）
    pub export_path: Option<PathBuf>,
    /// 重新导入模式的数据来源
    pub reimport_path: Option<PathBuf>,
    /// 同时处理的文档数量
    pub max_concurrent_documents: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 演练模式：完整执行流程但不备份、不写入
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lessons_root: PathBuf::from("lessons"),
            desired_features: FeatureName::ALL.to_vec(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            audio_base: "../../assets/audio".to_string(),
            report_path: PathBuf::from("patch_report.txt"),
            export_path: None,
            reimport_path: None,
            max_concurrent_documents: 1,
            verbose_logging: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// 从 TOML 文件加载（缺省字段使用默认值）
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: display,
            source,
        })
    }

    /// 默认值 ← 配置文件（可选）← 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };
        base.with_env()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env(self) -> Result<Self, ConfigError> {
        let desired_features = match std::env::var("DESIRED_FEATURES") {
            Ok(list) => parse_feature_list(&list)?,
            Err(_) => self.desired_features,
        };

        Ok(Self {
            lessons_root: std::env::var("LESSONS_ROOT").map(PathBuf::from).unwrap_or(self.lessons_root),
            desired_features,
            backup_suffix: std::env::var("BACKUP_SUFFIX").unwrap_or(self.backup_suffix),
            audio_base: std::env::var("AUDIO_BASE").unwrap_or(self.audio_base),
            report_path: std::env::var("REPORT_PATH").map(PathBuf::from).unwrap_or(self.report_path),
            export_path: std::env::var("EXPORT_PATH").ok().map(PathBuf::from).or(self.export_path),
            reimport_path: std::env::var("REIMPORT_PATH").ok().map(PathBuf::from).or(self.reimport_path),
            max_concurrent_documents: std::env::var("MAX_CONCURRENT_DOCUMENTS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_concurrent_documents),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            dry_run: std::env::var("DRY_RUN").ok().and_then(|v| v.parse().ok()).unwrap_or(self.dry_run),
        })
    }

    /// 期望功能集合
    pub fn desired_set(&self) -> BTreeSet<FeatureName> {
        self.desired_features.iter().copied().collect()
    }

    /// 配置了重新导入文件时进入重新导入模式
    pub fn mode(&self) -> PatchMode {
        if self.reimport_path.is_some() {
            PatchMode::Reimport
        } else {
            PatchMode::Live
        }
    }

    /// 并发数（至少为 1）
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_documents.max(1)
    }
}

/// 解析逗号分隔的功能列表，例如 `sound_system, quiz-engine`
pub fn parse_feature_list(list: &str) -> Result<Vec<FeatureName>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
