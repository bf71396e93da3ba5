//! 功能注册表 - 业务能力层
//!
//! 一份声明式目录：每个功能的检测规则、候选锚点、旧版标记、块语法和模板。
//! 检测器和转换引擎都只读这份注册表，不写各自的条件分支。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::FeatureName;
use crate::services::balance::BlockSyntax;
use crate::services::templates::{self, TemplateFn};

static GLOBAL: Lazy<FeatureRegistry> = Lazy::new(FeatureRegistry::standard);

/// 插入位置（相对于锚点匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// 候选锚点
#[derive(Debug, Clone)]
pub struct Anchor {
    pub pattern: Regex,
    pub placement: Placement,
}

impl Anchor {
    fn new(pattern: &str, placement: Placement) -> Self {
        Self {
            pattern: compile(pattern),
            placement,
        }
    }

    fn before(pattern: &str) -> Self {
        Self::new(pattern, Placement::Before)
    }

    fn after(pattern: &str) -> Self {
        Self::new(pattern, Placement::After)
    }
}

/// 一个可生成的功能块
#[derive(Clone)]
pub struct FeatureBlock {
    pub name: FeatureName,
    /// 检测规则，匹配起点即代码块起点
    pub detect: Regex,
    /// 候选锚点（按优先级）
    pub anchors: Vec<Anchor>,
    /// 旧版代码块的起始标记（按优先级）
    pub legacy: Vec<Regex>,
    pub syntax: BlockSyntax,
    pub template: TemplateFn,
}

impl std::fmt::Debug for FeatureBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureBlock")
            .field("name", &self.name)
            .field("detect", &self.detect.as_str())
            .field("anchors", &self.anchors.len())
            .field("legacy", &self.legacy.len())
            .field("syntax", &self.syntax)
            .finish()
    }
}

impl FeatureBlock {
    /// 统计检测规则在文本中的出现次数
    pub fn count(&self, text: &str) -> usize {
        self.detect.find_iter(text).count()
    }
}

/// 功能注册表（进程级只读）
#[derive(Debug)]
pub struct FeatureRegistry {
    blocks: Vec<FeatureBlock>,
}

impl FeatureRegistry {
    /// 全局注册表
    pub fn global() -> &'static FeatureRegistry {
        &GLOBAL
    }

    /// 标准功能目录（顺序与 `FeatureName` 声明顺序一致）
    pub fn standard() -> Self {
        let blocks = vec![
            FeatureBlock {
                name: FeatureName::HowlerLibrary,
                detect: compile(r"(?i)<script[^>]*howler[^>]*>"),
                anchors: vec![
                    Anchor::after(r"(?i)<script[^>]*aos(?:\.min)?\.js[^>]*>\s*</script>"),
                    Anchor::before(r"(?i)</head>"),
                ],
                legacy: Vec::new(),
                syntax: BlockSyntax::Markup { tag: "script" },
                template: templates::howler_include,
            },
            FeatureBlock {
                name: FeatureName::SoundSystem,
                detect: compile(r"const\s+SoundSystem\s*=\s*\{"),
                anchors: vec![
                    Anchor::after(r"AOS\.init\([^)]*\);"),
                    Anchor::after(r"<script>"),
                ],
                legacy: vec![compile(r"const\s+sfx\s*=\s*\{")],
                syntax: BlockSyntax::Script,
                template: templates::sound_system,
            },
            FeatureBlock {
                name: FeatureName::NotificationSystem,
                detect: compile(r"const\s+NotificationSystem\s*=\s*\{"),
                anchors: vec![
                    Anchor::after(r"AOS\.init\([^)]*\);"),
                    Anchor::after(r"<script>"),
                ],
                legacy: Vec::new(),
                syntax: BlockSyntax::Script,
                template: templates::notification_system,
            },
            FeatureBlock {
                name: FeatureName::ProgressTracking,
                detect: compile(r"const\s+ProgressTracker\s*=\s*\{"),
                anchors: vec![
                    Anchor::before(r"function\s+computeScore\s*\("),
                    Anchor::after(r"AOS\.init\([^)]*\);"),
                    Anchor::after(r"<script>"),
                ],
                legacy: Vec::new(),
                syntax: BlockSyntax::Script,
                template: templates::progress_tracker,
            },
            FeatureBlock {
                name: FeatureName::QuizEngine,
                detect: compile(r"const\s+bank\s*=\s*\["),
                anchors: vec![
                    Anchor::after(r"const\s+storageKey\s*=[^;]*;"),
                    Anchor::after(r"AOS\.init\([^)]*\);"),
                    Anchor::after(r"<script>"),
                ],
                legacy: vec![compile(r"const\s+questions\s*=\s*\[")],
                syntax: BlockSyntax::Script,
                template: templates::quiz_bank,
            },
            FeatureBlock {
                name: FeatureName::LearningObjectives,
                detect: compile(r#"<div[^>]*class="[^"]*\bobjectives\b[^"]*"[^>]*>"#),
                anchors: vec![
                    Anchor::after(r#"<div\s+class="wrap"[^>]*>"#),
                    Anchor::before(r#"<div[^>]*id="quiz""#),
                    Anchor::after(r"<body[^>]*>"),
                ],
                legacy: vec![compile(r"<div[^>]*>\s*<h1>\s*🎯 أهداف الدرس\s*</h1>")],
                syntax: BlockSyntax::Markup { tag: "div" },
                template: templates::objectives_card,
            },
        ];

        Self { blocks }
    }

    pub fn get(&self, name: FeatureName) -> Option<&FeatureBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// 注册表中的正则都是常量，编译失败属于编程错误
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("无效的注册表正则 {}: {}", pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_follows_feature_order() {
        let names: Vec<FeatureName> = FeatureRegistry::global().iter().map(|b| b.name).collect();
        assert_eq!(names, FeatureName::ALL.to_vec());
    }

    #[test]
    fn test_detect_patterns() {
        let registry = FeatureRegistry::global();
        let sound = registry.get(FeatureName::SoundSystem).unwrap();
        assert_eq!(sound.count("const SoundSystem = {}; const SoundSystem={}"), 2);

        let howler = registry.get(FeatureName::HowlerLibrary).unwrap();
        assert_eq!(howler.count(templates::HOWLER_INCLUDE), 1);
        assert_eq!(howler.count("const s = new Howl({});"), 0);

        let objectives = registry.get(FeatureName::LearningObjectives).unwrap();
        assert_eq!(objectives.count(r#"<div class="card objectives">"#), 1);
        assert_eq!(objectives.count(r#"<div class="card objectives-old">"#), 1);
        assert_eq!(objectives.count(r#"<div class="card">"#), 0);
    }
}
