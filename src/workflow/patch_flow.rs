//! 文档补丁流程 - 流程层
//!
//! 核心职责：定义"一个文档"在内存中的完整处理流程
//!
//! 流程顺序：
//! 1. 检测 → 已满足则跳过（实时模式）
//! 2. 提取数据（实时模式）或取交换文件中的条目（重新导入模式）
//! 3. 转换
//!
//! 不做任何文件读写：备份和写回由编排层负责

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::models::{Document, FeatureName, InterchangeExport, LessonData, PatchMode};
use crate::services::{
    FeatureDetector, StructuredExtractor, TemplateLibrary, TransformEngine, TransformResult,
};
use crate::workflow::document_ctx::DocumentCtx;

/// 流程输出
#[derive(Debug, Clone)]
pub struct FlowOutput {
    /// 本次使用（或为导出而提取）的数据
    pub data: Option<LessonData>,
    /// `None` 表示文档已满足所有期望功能，未执行转换
    pub transform: Option<TransformResult>,
    /// 提取阶段的警告
    pub warnings: Vec<String>,
}

impl FlowOutput {
    pub fn is_satisfied(&self) -> bool {
        self.transform.is_none()
    }
}

/// 文档补丁流程
///
/// - 编排 检测 → 提取 → 转换
/// - 决定何时跳过、用哪份数据、哪些功能需要刷新
/// - 不持有任何文件资源
pub struct PatchFlow {
    detector: FeatureDetector,
    extractor: StructuredExtractor,
    engine: TransformEngine,
    desired: BTreeSet<FeatureName>,
    mode: PatchMode,
}

impl PatchFlow {
    /// 创建新的补丁流程
    pub fn new(desired: BTreeSet<FeatureName>, mode: PatchMode, templates: TemplateLibrary) -> Self {
        Self {
            detector: FeatureDetector::new(),
            extractor: StructuredExtractor::new(),
            engine: TransformEngine::new(templates),
            desired,
            mode,
        }
    }

    pub fn mode(&self) -> PatchMode {
        self.mode
    }

    pub fn desired(&self) -> &BTreeSet<FeatureName> {
        &self.desired
    }

    /// 执行流程
    ///
    /// # 参数
    /// - `document`: 文档（只更新 `detected`，原文不变）
    /// - `ctx`: 上下文
    /// - `reimport`: 重新导入模式的数据来源
    /// - `collect_data`: 即使跳过也提取数据（用于导出）
    pub fn run(
        &self,
        document: &mut Document,
        ctx: &DocumentCtx,
        reimport: Option<&InterchangeExport>,
        collect_data: bool,
    ) -> FlowOutput {
        // ========== 步骤 1: 检测 ==========
        let detection = self.detector.detect(&document.raw_text);
        document.detected = detection.present();
        debug!("{} 检测结果: {}", ctx, detection);

        let satisfied = detection.satisfies(&self.desired);
        if satisfied && self.mode == PatchMode::Live {
            info!("{} ⏭️ 已具备所有期望功能", ctx);
            let (data, warnings) = if collect_data {
                self.extract(document, ctx)
            } else {
                (None, Vec::new())
            };
            return FlowOutput {
                data,
                transform: None,
                warnings,
            };
        }

        // ========== 步骤 2: 准备数据 ==========
        let (data, warnings, refresh) = match (self.mode, reimport) {
            (PatchMode::Reimport, Some(export)) => {
                let (data, warnings) = self.reimport_data(document, ctx, export);
                (data, warnings, self.refresh_set())
            }
            _ => {
                let (data, warnings) = self.extract(document, ctx);
                (data, warnings, BTreeSet::new())
            }
        };
        let data = data.unwrap_or_default();

        // ========== 步骤 3: 转换 ==========
        let result = self.engine.transform(document, &self.desired, &data, &refresh);
        if result.success {
            debug!(
                "{} 转换完成: 改动 {} 个功能, {} 条警告",
                ctx,
                result.applied_features.len(),
                result.warnings.len()
            );
        } else {
            warn!(
                "{} ❌ 转换失败: {}",
                ctx,
                result.error_detail.as_deref().unwrap_or("未知错误")
            );
        }

        FlowOutput {
            data: Some(data),
            transform: Some(result),
            warnings,
        }
    }

    /// 重新导入模式下需要刷新的功能：期望功能中携带数据的那些
    fn refresh_set(&self) -> BTreeSet<FeatureName> {
        self.desired
            .iter()
            .copied()
            .filter(|f| f.carries_data())
            .collect()
    }

    fn extract(&self, document: &Document, ctx: &DocumentCtx) -> (Option<LessonData>, Vec<String>) {
        let extraction = self.extractor.extract(&document.raw_text);
        info!(
            "{} 📋 提取到 {} 道题目, {} 个学习目标",
            ctx,
            extraction.questions.len(),
            extraction.objectives.as_ref().map_or(0, |o| o.items.len())
        );
        (Some(extraction.to_lesson_data()), extraction.warnings)
    }

    /// 从交换文件取数据；缺少条目时退回实时提取
    fn reimport_data(
        &self,
        document: &Document,
        ctx: &DocumentCtx,
        export: &InterchangeExport,
    ) -> (Option<LessonData>, Vec<String>) {
        match export.get(document.id()) {
            Some(entry) => {
                let mut data = entry.clone();
                if data.title.is_empty() {
                    data.title = self
                        .extractor
                        .extract(&document.raw_text)
                        .title
                        .unwrap_or_default();
                }
                info!(
                    "{} 📥 使用导入数据: {} 道题目",
                    ctx,
                    data.questions.len()
                );
                (Some(data), Vec::new())
            }
            None => {
                let (data, mut warnings) = self.extract(document, ctx);
                warnings.insert(0, "交换文件中没有该文档，改用实时提取".to_string());
                (data, warnings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectiveList, Question, Topic};

    const PAGE: &str = r#"<html><head><title>الخلية</title></head>
<body>
<div class="wrap">
<div class="card objectives"><h1>🎯 أهداف الدرس</h1><p class="lead">وصف</p><ul><li>هدف</li></ul></div>
</div>
<script>
AOS.init();
const bank = [
  {q:"س", c:["أ","ب"], a:1},
];
</script>
</body></html>"#;

    fn flow(mode: PatchMode, desired: &[FeatureName]) -> PatchFlow {
        PatchFlow::new(
            desired.iter().copied().collect(),
            mode,
            TemplateLibrary::new("../../assets/audio"),
        )
    }

    fn ctx() -> DocumentCtx {
        DocumentCtx::new("unit-1-cells/lesson-1-1".to_string(), 1, 1, Topic::Cells)
    }

    fn doc() -> Document {
        Document::new("index.html", "unit-1-cells/lesson-1-1", PAGE.to_string())
    }

    #[test]
    fn test_satisfied_document_is_skipped() {
        let flow = flow(
            PatchMode::Live,
            &[FeatureName::QuizEngine, FeatureName::LearningObjectives],
        );
        let mut document = doc();
        let output = flow.run(&mut document, &ctx(), None, false);
        assert!(output.is_satisfied());
        assert!(output.data.is_none());
        assert!(document.detected.contains(&FeatureName::QuizEngine));

        let output = flow.run(&mut document, &ctx(), None, true);
        assert_eq!(output.data.unwrap().questions.len(), 1);
    }

    #[test]
    fn test_live_mode_patches_missing_features() {
        let flow = flow(PatchMode::Live, &[FeatureName::SoundSystem, FeatureName::QuizEngine]);
        let output = flow.run(&mut doc(), &ctx(), None, false);
        let result = output.transform.unwrap();
        assert!(result.success);
        assert_eq!(result.applied_features, vec![FeatureName::SoundSystem]);
    }

    #[test]
    fn test_reimport_refreshes_data_blocks() {
        let mut export = InterchangeExport::new();
        export.insert(
            "unit-1-cells/lesson-1-1",
            LessonData {
                title: String::new(),
                questions: vec![
                    Question::new("جديد 1", vec!["أ".to_string()], 0).unwrap(),
                    Question::new("جديد 2", vec!["أ".to_string(), "ب".to_string()], 1).unwrap(),
                ],
                objectives: Some(ObjectiveList {
                    description: "وصف جديد".to_string(),
                    items: vec!["هدف جديد".to_string()],
                }),
            },
        );

        let flow = flow(
            PatchMode::Reimport,
            &[FeatureName::QuizEngine, FeatureName::LearningObjectives],
        );
        let output = flow.run(&mut doc(), &ctx(), Some(&export), false);
        assert_eq!(output.data.as_ref().unwrap().title, "الخلية");

        let result = output.transform.unwrap();
        assert!(result.success, "{:?}", result.error_detail);
        let text = result.patched_text.unwrap();
        assert!(text.contains("جديد 2"));
        assert!(text.contains("هدف جديد"));
        assert!(!text.contains(r#"{q:"س""#));
    }
}
