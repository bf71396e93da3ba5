//! 结构化提取服务 - 业务能力层
//!
//! 只负责"从文本中取出题目、学习目标和标题"的能力，从不修改文档

use tracing::debug;

use crate::error::PatchError;
use crate::models::{LessonData, ObjectiveList, Question};
use crate::services::grammar::{first_match, OBJECTIVE_RULES, QUESTION_RULES, TITLE_RULES};

/// 提取结果
///
/// 没有规则匹配时对应字段为空，并在 `warnings` 中记录一条 GrammarMismatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub questions: Vec<Question>,
    pub objectives: Option<ObjectiveList>,
    pub title: Option<String>,
    pub warnings: Vec<String>,
}

impl Extraction {
    /// 转换为交换文件条目
    pub fn to_lesson_data(&self) -> LessonData {
        LessonData {
            title: self.title.clone().unwrap_or_default(),
            questions: self.questions.clone(),
            objectives: self.objectives.clone(),
        }
    }
}

/// 结构化提取服务
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredExtractor;

impl StructuredExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从文档文本提取结构化数据（尽力而为，从不失败）
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        let questions = first_match(QUESTION_RULES, text);
        extraction.warnings.extend(
            questions
                .rejected
                .into_iter()
                .map(|reason| format!("丢弃无效题目: {}", reason)),
        );
        match questions.hit {
            Some((rule, value)) => {
                debug!("题目规则 {} 命中: {} 道题", rule, value.len());
                extraction.questions = value;
            }
            None => extraction.warnings.push(mismatch("questions")),
        }

        match first_match(OBJECTIVE_RULES, text).hit {
            Some((rule, value)) => {
                debug!("学习目标规则 {} 命中: {} 项", rule, value.items.len());
                extraction.objectives = Some(value);
            }
            None => extraction.warnings.push(mismatch("objectives")),
        }

        match first_match(TITLE_RULES, text).hit {
            Some((_, value)) => extraction.title = Some(value),
            None => extraction.warnings.push(mismatch("title")),
        }

        extraction
    }
}

fn mismatch(kind: &str) -> String {
    PatchError::GrammarMismatch {
        kind: kind.to_string(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_all_kinds() {
        let text = r#"<html><head><title>الخلية</title></head><body>
<div class="card objectives"><h1>🎯 أهداف الدرس</h1><p class="lead">وصف</p><ul><li>هدف</li></ul></div>
<script>const bank = [ {q:"س", c:["أ","ب"], a:1} ];</script>
</body></html>"#;
        let extraction = StructuredExtractor::new().extract(text);
        assert_eq!(extraction.questions.len(), 1);
        assert_eq!(extraction.objectives.as_ref().unwrap().items, vec!["هدف"]);
        assert_eq!(extraction.title.as_deref(), Some("الخلية"));
        assert!(extraction.warnings.is_empty());

        let data = extraction.to_lesson_data();
        assert!(data.has_content());
    }

    #[test]
    fn test_extract_nothing_warns() {
        let extraction = StructuredExtractor::new().extract("<p>فارغ</p>");
        assert!(extraction.questions.is_empty());
        assert!(extraction.objectives.is_none());
        assert_eq!(extraction.warnings.len(), 3);
        assert!(extraction.warnings[0].contains("questions"));
    }

    #[test]
    fn test_stale_bank_does_not_hide_markup_questions() {
        let text = r#"<title>النقل</title>
<script>const bank = [ {q:"قديم", c:["x"], a:4} ];</script>
<article class="q" data-qid="q1">
  <strong>1) ما هو الانتشار؟</strong>
  <div class="choice" data-correct="true">انتقال الجزيئات</div>
</article>"#;
        let extraction = StructuredExtractor::new().extract(text);
        assert_eq!(extraction.questions.len(), 1);
        assert!(extraction.warnings[0].starts_with("丢弃无效题目"));
        assert!(!extraction.warnings.iter().any(|w| w.contains("questions")));
    }
}
