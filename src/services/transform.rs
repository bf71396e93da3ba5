//! 转换引擎 - 业务能力层
//!
//! 根据当前检测状态把文档收敛到期望的功能集合：
//! - 重复的块合并为一个
//! - 旧版块或需要刷新的块整体替换
//! - 缺失的块插入到第一个命中的锚点
//!
//! 所有修改都在内存中完成；后置检查（分隔符平衡、每个功能恰好出现一次）
//! 不通过时整次转换作废。

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::debug;

use crate::error::{ErrorKind, PatchError};
use crate::models::{Document, FeatureName, LessonData};
use crate::services::balance::{block_extent, check_balance, BlockSyntax};
use crate::services::registry::{FeatureBlock, FeatureRegistry, Placement};
use crate::services::templates::TemplateLibrary;

/// 转换结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub success: bool,
    /// 本次实际改动过的功能（按注册顺序）
    pub applied_features: Vec<FeatureName>,
    pub error: Option<ErrorKind>,
    /// 失败原因（可读文本）
    pub error_detail: Option<String>,
    pub warnings: Vec<String>,
    /// 成功时的新文本；失败时为 `None`
    pub patched_text: Option<String>,
    /// 新文本是否与原文不同
    pub changed: bool,
}

impl TransformResult {
    fn succeeded(
        original: &str,
        text: String,
        applied_features: Vec<FeatureName>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            changed: text != original,
            applied_features,
            error: None,
            error_detail: None,
            warnings,
            patched_text: Some(text),
        }
    }

    fn failed(error: PatchError, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            applied_features: Vec::new(),
            error: Some(error.kind()),
            error_detail: Some(error.to_string()),
            warnings,
            patched_text: None,
            changed: false,
        }
    }
}

/// 单个功能的处理动作（用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Collapsed(usize),
    ReplacedLegacy,
    Refreshed,
    Inserted,
}

/// 转换引擎
#[derive(Debug, Clone)]
pub struct TransformEngine {
    registry: &'static FeatureRegistry,
    templates: TemplateLibrary,
}

impl TransformEngine {
    pub fn new(templates: TemplateLibrary) -> Self {
        Self {
            registry: FeatureRegistry::global(),
            templates,
        }
    }

    /// 转换文档
    ///
    /// # 参数
    /// - `document`: 当前文档（不会被修改）
    /// - `desired`: 期望存在的功能
    /// - `data`: 生成模板所用的数据
    /// - `refresh`: 即使已存在也要用新数据重新生成的功能
    pub fn transform(
        &self,
        document: &Document,
        desired: &BTreeSet<FeatureName>,
        data: &LessonData,
        refresh: &BTreeSet<FeatureName>,
    ) -> TransformResult {
        let original = document.raw_text.as_str();
        let mut text = original.to_string();
        let mut applied = Vec::new();
        let mut warnings = Vec::new();

        for block in self.registry.iter().filter(|b| desired.contains(&b.name)) {
            let canonical = self.templates.generate(block.name, &document.meta, data);
            let outcome = apply_feature(
                &mut text,
                block,
                canonical.as_deref(),
                refresh.contains(&block.name),
                &mut warnings,
            );
            match outcome {
                Ok(Some(action)) => {
                    debug!("[{}] {} → {:?}", document.id(), block.name, action);
                    applied.push(block.name);
                }
                Ok(None) => {}
                Err(e) => return TransformResult::failed(e, warnings),
            }
        }

        if text != original {
            if let Err(e) = self.verify(original, &text, &applied) {
                return TransformResult::failed(e, warnings);
            }
        }

        TransformResult::succeeded(original, text, applied, warnings)
    }

    /// 后置检查：整体平衡，且每个改动过的功能恰好出现一次
    fn verify(
        &self,
        original: &str,
        text: &str,
        applied: &[FeatureName],
    ) -> Result<(), PatchError> {
        let report = check_balance(text);
        if !report.is_balanced() {
            let mut detail = report.summary();
            if !check_balance(original).is_balanced() {
                detail.push_str(" (原文档已不平衡)");
            }
            return Err(PatchError::BalanceViolation { detail });
        }

        for feature in applied {
            if let Some(block) = self.registry.get(*feature) {
                let count = block.count(text);
                if count != 1 {
                    return Err(PatchError::FeatureCountMismatch {
                        feature: *feature,
                        count,
                    });
                }
            }
        }

        Ok(())
    }
}

/// 对单个功能执行收敛动作
///
/// # 返回
/// 有改动时返回动作；无需改动或只能跳过时返回 `None`（跳过原因写入 `warnings`）
fn apply_feature(
    text: &mut String,
    block: &FeatureBlock,
    canonical: Option<&str>,
    refresh: bool,
    warnings: &mut Vec<String>,
) -> Result<Option<Action>, PatchError> {
    let starts: Vec<usize> = block.detect.find_iter(text).map(|m| m.start()).collect();

    match starts.len() {
        0 => {
            for legacy in &block.legacy {
                let legacy_starts: Vec<usize> = legacy.find_iter(text).map(|m| m.start()).collect();
                if legacy_starts.is_empty() {
                    continue;
                }
                let Some(canonical) = canonical else {
                    warnings.push(format!("功能 {} 存在旧版代码块但缺少数据，保持原样", block.name));
                    return Ok(None);
                };
                replace_blocks(text, block, &legacy_starts, Some(canonical))?;
                return Ok(Some(Action::ReplacedLegacy));
            }

            let Some(canonical) = canonical else {
                warnings.push(format!("功能 {} 缺少所需数据，跳过", block.name));
                return Ok(None);
            };

            match find_anchor(text, block) {
                Some((range, placement)) => {
                    insert_at_anchor(text, range, placement, canonical);
                    Ok(Some(Action::Inserted))
                }
                None => {
                    warnings.push(PatchError::AnchorNotFound { feature: block.name }.to_string());
                    Ok(None)
                }
            }
        }
        1 => match canonical {
            Some(canonical) if refresh => {
                replace_blocks(text, block, &starts, Some(canonical))?;
                Ok(Some(Action::Refreshed))
            }
            _ => Ok(None),
        },
        n => {
            replace_blocks(text, block, &starts, canonical)?;
            Ok(Some(Action::Collapsed(n)))
        }
    }
}

/// 按优先级查找第一个命中的锚点（优先级优先，而不是位置优先）
fn find_anchor(text: &str, block: &FeatureBlock) -> Option<(Range<usize>, Placement)> {
    block
        .anchors
        .iter()
        .find_map(|anchor| anchor.pattern.find(text).map(|m| (m.range(), anchor.placement)))
}

fn insert_at_anchor(text: &mut String, anchor: Range<usize>, placement: Placement, block: &str) {
    let indent = line_indent(text, anchor.start).to_string();
    let body = indent_continuation(block, &indent);
    match placement {
        Placement::After => {
            text.insert_str(anchor.end, &format!("\n\n{}{}", indent, body));
        }
        Placement::Before => {
            text.insert_str(anchor.start, &format!("{}\n\n{}", body, indent));
        }
    }
}

/// 用一份规范文本替换若干个旧块：保留第一个位置，删除其余
///
/// `canonical` 为 `None` 时只删除多余的块，第一个保持原样
fn replace_blocks(
    text: &mut String,
    block: &FeatureBlock,
    starts: &[usize],
    canonical: Option<&str>,
) -> Result<(), PatchError> {
    let mut extents: Vec<Range<usize>> = Vec::with_capacity(starts.len());
    for &start in starts {
        // 嵌套在前一个块内部的匹配随前一个块一起处理
        if extents.last().is_some_and(|prev| start < prev.end) {
            continue;
        }
        let extent = block_extent(text, start, block.syntax).ok_or_else(|| {
            PatchError::BalanceViolation {
                detail: format!(
                    "功能 {} 的{}从第 {} 行开始未闭合",
                    block.name,
                    syntax_label(block.syntax),
                    line_number(text, start)
                ),
            }
        })?;
        extents.push(extent);
    }

    for (i, extent) in extents.iter().enumerate().skip(1).rev() {
        let floor = extents[i - 1].end;
        let start = trim_preceding_whitespace(text, extent.start, floor);
        text.replace_range(start..extent.end, "");
    }

    if let (Some(first), Some(canonical)) = (extents.first(), canonical) {
        let indent = line_indent(text, first.start).to_string();
        text.replace_range(first.clone(), &indent_continuation(canonical, &indent));
    }

    Ok(())
}

fn syntax_label(syntax: BlockSyntax) -> &'static str {
    match syntax {
        BlockSyntax::Script => "脚本块",
        BlockSyntax::Markup { .. } => "标记块",
    }
}

/// 向前吞掉块前的空白（不越过 `floor`）
fn trim_preceding_whitespace(text: &str, start: usize, floor: usize) -> usize {
    let head = &text[floor..start];
    floor + head.trim_end().len()
}

/// 所在行的行首缩进
fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..pos];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

fn line_number(text: &str, pos: usize) -> usize {
    text[..pos].matches('\n').count() + 1
}

/// 第一行保持原样，其余非空行加上缩进
fn indent_continuation(block: &str, indent: &str) -> String {
    block
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectiveList, Question};
    use crate::services::detector::{FeatureDetector, FeatureStatus};

    fn engine() -> TransformEngine {
        TransformEngine::new(TemplateLibrary::new("../../assets/audio"))
    }

    fn all_features() -> BTreeSet<FeatureName> {
        FeatureName::ALL.into_iter().collect()
    }

    fn sample_data() -> LessonData {
        LessonData {
            title: "الخلية".to_string(),
            questions: vec![Question::new(
                "ما وحدة بناء الكائن الحي؟",
                vec!["الخلية".to_string(), "العضو".to_string()],
                0,
            )
            .unwrap()],
            objectives: Some(ObjectiveList {
                description: "في نهاية الدرس".to_string(),
                items: vec!["أن يعرف الخلية".to_string()],
            }),
        }
    }

    const PLAIN: &str = r#"<html>
<head>
  <title>الخلية</title>
  <script src="https://unpkg.com/aos@2.3.1/dist/aos.js"></script>
</head>
<body>
  <div class="wrap">
    <div id="quiz"></div>
  </div>
  <script>
    AOS.init({ duration: 800 });
    const storageKey = "unit-1-cells/lesson-1-1";
    function computeScore() { return 0; }
  </script>
</body>
</html>"#;

    fn doc(text: &str) -> Document {
        Document::new("index.html", "unit-1-cells/lesson-1-1", text.to_string())
    }

    #[test]
    fn test_inserts_all_missing_features() {
        let result = engine().transform(&doc(PLAIN), &all_features(), &sample_data(), &BTreeSet::new());
        assert!(result.success, "{:?}", result.error_detail);
        assert_eq!(result.applied_features, FeatureName::ALL.to_vec());

        let text = result.patched_text.unwrap();
        let detection = FeatureDetector::new().detect(&text);
        assert!(detection.satisfies(&all_features()));
        assert!(check_balance(&text).is_balanced());
        // 学习目标插在 wrap 之后、测验之前
        assert!(text.find("🎯").unwrap() < text.find(r#"id="quiz""#).unwrap());
        // 进度追踪插在 computeScore 之前，且保持缩进
        assert!(text.contains("    const ProgressTracker = {\n      // 📈"));
        assert!(text.find("ProgressTracker").unwrap() < text.find("function computeScore").unwrap());
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let first = engine().transform(&doc(PLAIN), &all_features(), &sample_data(), &BTreeSet::new());
        let patched = first.patched_text.unwrap();

        let second = engine().transform(&doc(&patched), &all_features(), &sample_data(), &BTreeSet::new());
        assert!(second.success);
        assert!(!second.changed);
        assert!(second.applied_features.is_empty());
    }

    #[test]
    fn test_refresh_is_stable() {
        let refresh: BTreeSet<_> = [FeatureName::QuizEngine, FeatureName::LearningObjectives]
            .into_iter()
            .collect();
        let first = engine().transform(&doc(PLAIN), &all_features(), &sample_data(), &BTreeSet::new());
        let patched = first.patched_text.unwrap();

        let again = engine().transform(&doc(&patched), &all_features(), &sample_data(), &refresh);
        assert!(again.success);
        assert_eq!(again.patched_text.as_deref(), Some(patched.as_str()));
    }

    #[test]
    fn test_collapses_duplicates() {
        let text = r#"<script>
  const SoundSystem = { a: 1 };

  const SoundSystem = { b: [2, 3] };
  const after = 1;
</script>"#;
        let desired: BTreeSet<_> = [FeatureName::SoundSystem].into_iter().collect();
        let result = engine().transform(&doc(text), &desired, &LessonData::default(), &BTreeSet::new());
        assert!(result.success, "{:?}", result.error_detail);

        let patched = result.patched_text.unwrap();
        let detection = FeatureDetector::new().detect(&patched);
        assert_eq!(detection.status(FeatureName::SoundSystem), FeatureStatus::Present);
        assert!(patched.contains("new Howl"));
        assert!(patched.contains("const after = 1;"));
    }

    #[test]
    fn test_replaces_legacy_blocks() {
        let text = r#"<script>
const sfx = { ok: new Audio('a.mp3') };
const questions = [ { question: "س", answers: ["أ", "ب"], correct: 1 } ];
</script>"#;
        let desired: BTreeSet<_> = [FeatureName::SoundSystem, FeatureName::QuizEngine]
            .into_iter()
            .collect();
        let result = engine().transform(&doc(text), &desired, &sample_data(), &BTreeSet::new());
        assert!(result.success, "{:?}", result.error_detail);

        let patched = result.patched_text.unwrap();
        assert!(!patched.contains("const sfx"));
        assert!(!patched.contains("const questions"));
        assert!(patched.contains("const bank = ["));
    }

    #[test]
    fn test_unbounded_duplicate_fails_with_balance_violation() {
        let text = "<script>\nconst bank = [ {q:\"a\", c:[\"x\"], a:0};\nconst bank = [];\n</script>";
        let desired: BTreeSet<_> = [FeatureName::QuizEngine].into_iter().collect();
        let result = engine().transform(&doc(text), &desired, &sample_data(), &BTreeSet::new());
        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::BalanceViolation));
        assert!(result.patched_text.is_none());
    }

    #[test]
    fn test_unbalanced_document_fails_post_check() {
        let text = "<html><head></head><body><div class=\"wrap\"><script>\nAOS.init();\nfunction f() {\n</script></body></html>";
        let desired: BTreeSet<_> = [FeatureName::SoundSystem].into_iter().collect();
        let result = engine().transform(&doc(text), &desired, &LessonData::default(), &BTreeSet::new());
        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::BalanceViolation));
        assert!(result.error_detail.unwrap().contains("原文档已不平衡"));
    }

    #[test]
    fn test_missing_anchor_and_missing_data_are_warnings() {
        let text = "<p>لا يوجد سكربت</p>";
        let desired: BTreeSet<_> = [FeatureName::SoundSystem, FeatureName::QuizEngine]
            .into_iter()
            .collect();
        let result = engine().transform(&doc(text), &desired, &LessonData::default(), &BTreeSet::new());
        assert!(result.success);
        assert!(!result.changed);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("sound_system")));
    }

    #[test]
    fn test_anchor_priority_beats_position() {
        // storageKey 出现在 AOS.init 之后，但优先级更高
        let text = "<script>\nAOS.init();\nconst storageKey = \"k\";\n</script>";
        let desired: BTreeSet<_> = [FeatureName::QuizEngine].into_iter().collect();
        let result = engine().transform(&doc(text), &desired, &sample_data(), &BTreeSet::new());
        let patched = result.patched_text.unwrap();
        assert!(patched.find("const storageKey").unwrap() < patched.find("const bank").unwrap());
    }
}
