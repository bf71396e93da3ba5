use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// 功能名称
///
/// 声明顺序即注册表顺序，也是转换引擎处理功能的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    /// Howler.js 音频库引用
    HowlerLibrary,
    /// 音效系统
    SoundSystem,
    /// 通知消息系统
    NotificationSystem,
    /// 进度追踪
    ProgressTracking,
    /// 题库（测验引擎）
    QuizEngine,
    /// 学习目标卡片
    LearningObjectives,
}

impl FeatureName {
    /// 全部功能（按注册顺序）
    pub const ALL: [FeatureName; 6] = [
        FeatureName::HowlerLibrary,
        FeatureName::SoundSystem,
        FeatureName::NotificationSystem,
        FeatureName::ProgressTracking,
        FeatureName::QuizEngine,
        FeatureName::LearningObjectives,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::HowlerLibrary => "howler_library",
            FeatureName::SoundSystem => "sound_system",
            FeatureName::NotificationSystem => "notification_system",
            FeatureName::ProgressTracking => "progress_tracking",
            FeatureName::QuizEngine => "quiz_engine",
            FeatureName::LearningObjectives => "learning_objectives",
        }
    }

    /// 是否携带从文档提取的数据（重新导入时需要刷新）
    pub fn carries_data(self) -> bool {
        matches!(self, FeatureName::QuizEngine | FeatureName::LearningObjectives)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        FeatureName::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or(ConfigError::UnknownFeature {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature_names() {
        assert_eq!("sound_system".parse::<FeatureName>().unwrap(), FeatureName::SoundSystem);
        assert_eq!("Quiz-Engine".parse::<FeatureName>().unwrap(), FeatureName::QuizEngine);
        assert!("confetti".parse::<FeatureName>().is_err());
    }
}
