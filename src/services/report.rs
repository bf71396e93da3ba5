//! 报告生成服务 - 业务能力层
//!
//! 把批量运行结果整理成可读文本，并附带可重新导入的交换数据

use crate::models::{BatchReport, InterchangeExport, OutcomeStatus};

/// 运行摘要
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub export: Option<InterchangeExport>,
}

/// 生成运行摘要
pub fn summarize(batch: &BatchReport, export: Option<InterchangeExport>) -> Summary {
    let rule = "=".repeat(60);
    let mut lines = vec![
        rule.clone(),
        format!(
            "课程补丁报告 - {}",
            batch.finished_at.format("%Y-%m-%d %H:%M:%S")
        ),
        rule.clone(),
        format!(
            "模式: {}{}",
            batch.mode,
            if batch.dry_run { " (演练，未写入)" } else { "" }
        ),
        format!(
            "耗时: {:.1} 秒",
            (batch.finished_at - batch.started_at).num_milliseconds() as f64 / 1000.0
        ),
        format!("文档总数: {}", batch.total()),
        format!("✅ 已更新: {}", batch.updated()),
        format!("⏭️ 已跳过: {}", batch.skipped()),
        format!("❌ 失败: {}", batch.failed()),
        "─".repeat(60),
    ];

    for outcome in &batch.outcomes {
        let detail = match &outcome.status {
            OutcomeStatus::Updated | OutcomeStatus::WouldUpdate => {
                let names: Vec<&str> = outcome.applied.iter().map(|f| f.as_str()).collect();
                format!("({})", names.join(", "))
            }
            OutcomeStatus::Skipped { reason } => format!("({})", reason),
            OutcomeStatus::Failed { kind, reason } => format!("{}: {}", kind, reason),
        };
        lines.push(format!(
            "[{}] {} | {} {}",
            outcome.index,
            outcome.id,
            outcome.status.label(),
            detail
        ));
        if let Some(backup) = &outcome.backup {
            lines.push(format!("    💾 快照: {}", backup.display()));
        }
        for warning in &outcome.warnings {
            lines.push(format!("    ⚠️ {}", warning));
        }
    }

    if let Some(export) = &export {
        lines.push("─".repeat(60));
        lines.push(format!(
            "📤 导出数据: {} 个文档, {} 道题目, {} 个学习目标",
            export.len(),
            export.total_questions(),
            export.total_objectives()
        ));
        push_duplicates(&mut lines, export);
    }
    lines.push(rule);

    Summary {
        text: lines.join("\n") + "\n",
        export,
    }
}

/// 跨文档重复题目
fn push_duplicates(lines: &mut Vec<String>, export: &InterchangeExport) {
    let duplicates = export.duplicate_prompts();
    if duplicates.is_empty() {
        lines.push("✅ 没有重复的题目".to_string());
        return;
    }

    lines.push(format!("🔄 重复题目: {} 个", duplicates.len()));
    for (i, duplicate) in duplicates.iter().enumerate() {
        lines.push(format!("  [{}] {}", i + 1, duplicate.prompt));
        for (id, number) in &duplicate.occurrences {
            lines.push(format!("      • {} 第 {} 题", id, number));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{DocumentOutcome, FeatureName, LessonData, PatchMode, Question};
    use chrono::Local;

    #[test]
    fn test_summary_counts_and_lines() {
        let now = Local::now();
        let mut updated = DocumentOutcome::new(1, "unit-1-cells/lesson-1-1", "a/index.html");
        updated.status = OutcomeStatus::Updated;
        updated.applied = vec![FeatureName::SoundSystem, FeatureName::QuizEngine];

        let mut skipped = DocumentOutcome::new(2, "unit-1-cells/lesson-1-2", "b/index.html");
        skipped.status = OutcomeStatus::Skipped {
            reason: "已满足所有功能".to_string(),
        };

        let mut failed = DocumentOutcome::new(3, "unit-2-transport/lesson-2-1", "c/index.html");
        failed.status = OutcomeStatus::Failed {
            kind: ErrorKind::BalanceViolation,
            reason: "{} 打开 3 次, 关闭 2 次".to_string(),
        };
        failed.warnings.push("没有提取规则匹配 objectives".to_string());

        let batch = BatchReport {
            mode: PatchMode::Live,
            dry_run: false,
            started_at: now,
            finished_at: now,
            outcomes: vec![updated, skipped, failed],
        };

        let mut export = InterchangeExport::new();
        export.insert("unit-1-cells/lesson-1-1", LessonData::default());

        let summary = summarize(&batch, Some(export));
        assert!(summary.text.contains("✅ 已更新: 1"));
        assert!(summary.text.contains("⏭️ 已跳过: 1"));
        assert!(summary.text.contains("❌ 失败: 1"));
        assert!(summary
            .text
            .contains("[1] unit-1-cells/lesson-1-1 | UPDATED (sound_system, quiz_engine)"));
        assert!(summary.text.contains("FAILED BalanceViolation"));
        assert!(summary.text.contains("    ⚠️ 没有提取规则匹配 objectives"));
        assert!(summary.text.contains("✅ 没有重复的题目"));
        assert_eq!(summary.export.unwrap().len(), 1);
    }

    #[test]
    fn test_summary_lists_duplicate_prompts() {
        let now = Local::now();
        let batch = BatchReport {
            mode: PatchMode::Live,
            dry_run: false,
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        };

        let question = |prompt: &str| Question::new(prompt, vec!["أ".to_string()], 0).unwrap();
        let mut export = InterchangeExport::new();
        for id in ["unit-1-cells/lesson-1-1", "unit-3-biomolecules/lesson-3-1"] {
            export.insert(
                id,
                LessonData {
                    title: String::new(),
                    questions: vec![question("ما وحدة بناء البروتين؟")],
                    objectives: None,
                },
            );
        }

        let text = summarize(&batch, Some(export)).text;
        assert!(text.contains("🔄 重复题目: 1 个"));
        assert!(text.contains("  [1] ما وحدة بناء البروتين؟"));
        assert!(text.contains("      • unit-1-cells/lesson-1-1 第 1 题"));
        assert!(text.contains("      • unit-3-biomolecules/lesson-3-1 第 1 题"));
    }
}
