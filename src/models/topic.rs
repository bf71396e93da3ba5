use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 课程主题（决定通知消息的措辞）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// 细胞
    Cells,
    /// 物质运输
    Transport,
    /// 生物分子
    Biomolecules,
    /// 营养
    Nutrition,
    /// 呼吸作用
    Respiration,
    /// 稳态
    Homeostasis,
    /// 通用
    General,
}

/// 单元目录标识 → 主题
static UNIT_TOPICS: phf::Map<&'static str, Topic> = phf_map! {
    "cells" => Topic::Cells,
    "transport" => Topic::Transport,
    "biomolecules" => Topic::Biomolecules,
    "nutrition" => Topic::Nutrition,
    "respiration" => Topic::Respiration,
    "homeostasis" => Topic::Homeostasis,
};

impl Topic {
    /// 获取标识名称
    pub fn slug(self) -> &'static str {
        match self {
            Topic::Cells => "cells",
            Topic::Transport => "transport",
            Topic::Biomolecules => "biomolecules",
            Topic::Nutrition => "nutrition",
            Topic::Respiration => "respiration",
            Topic::Homeostasis => "homeostasis",
            Topic::General => "general",
        }
    }

    /// 精确匹配单元标识
    pub fn from_slug(s: &str) -> Option<Self> {
        UNIT_TOPICS.get(s.trim().to_lowercase().as_str()).copied()
    }

    /// 从文档标识推导主题（支持模糊匹配）
    ///
    /// `unit-2-transport/lesson-2-1` → `Transport`，无法识别时返回 `General`
    pub fn from_document_id(id: &str) -> Self {
        let unit = id.split(['/', '\\']).next().unwrap_or_default();

        // 先尝试精确匹配 unit-N-<slug>
        let slug = unit
            .trim_start_matches("unit-")
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches('-');
        if let Some(topic) = Self::from_slug(slug) {
            return topic;
        }

        // 模糊匹配
        let lower = id.to_lowercase();
        UNIT_TOPICS
            .entries()
            .find(|(key, _)| lower.contains(*key))
            .map(|(_, topic)| *topic)
            .unwrap_or(Topic::General)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_from_document_id() {
        assert_eq!(Topic::from_document_id("unit-1-cells/lesson-1-1"), Topic::Cells);
        assert_eq!(
            Topic::from_document_id("unit-6-homeostasis/lesson-6-4"),
            Topic::Homeostasis
        );
        assert_eq!(Topic::from_document_id("extra/respiration-review"), Topic::Respiration);
        assert_eq!(Topic::from_document_id("misc/lesson"), Topic::General);
    }
}
