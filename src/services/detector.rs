//! 功能检测服务 - 业务能力层
//!
//! 只负责"数一数每个功能出现了几次"，没有副作用

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::FeatureName;
use crate::services::registry::FeatureRegistry;

/// 单个功能的检测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStatus {
    Absent,
    Present,
    /// 出现多次，需要由转换引擎合并
    Duplicated(usize),
}

impl FeatureStatus {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => FeatureStatus::Absent,
            1 => FeatureStatus::Present,
            n => FeatureStatus::Duplicated(n),
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureStatus::Absent => write!(f, "缺失"),
            FeatureStatus::Present => write!(f, "已存在"),
            FeatureStatus::Duplicated(n) => write!(f, "重复 {} 次", n),
        }
    }
}

/// 检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    statuses: BTreeMap<FeatureName, FeatureStatus>,
}

impl Detection {
    pub fn status(&self, feature: FeatureName) -> FeatureStatus {
        self.statuses
            .get(&feature)
            .copied()
            .unwrap_or(FeatureStatus::Absent)
    }

    /// 恰好出现一次的功能
    pub fn present(&self) -> BTreeSet<FeatureName> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == FeatureStatus::Present)
            .map(|(name, _)| *name)
            .collect()
    }

    /// 所有期望的功能都恰好出现一次
    pub fn satisfies(&self, desired: &BTreeSet<FeatureName>) -> bool {
        desired
            .iter()
            .all(|f| self.status(*f) == FeatureStatus::Present)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, FeatureStatus)> + '_ {
        self.statuses.iter().map(|(name, status)| (*name, *status))
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, status)| format!("{}={}", name, status))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// 功能检测服务
#[derive(Debug, Clone, Copy)]
pub struct FeatureDetector {
    registry: &'static FeatureRegistry,
}

impl FeatureDetector {
    pub fn new() -> Self {
        Self {
            registry: FeatureRegistry::global(),
        }
    }

    /// 检测文本中每个已注册功能的状态
    pub fn detect(&self, text: &str) -> Detection {
        let statuses = self
            .registry
            .iter()
            .map(|block| (block.name, FeatureStatus::from_count(block.count(text))))
            .collect();
        Detection { statuses }
    }
}

impl Default for FeatureDetector {
    fn default() -> Self {
        Self::new()
    }
}
