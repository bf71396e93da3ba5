use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::lesson_data::LessonData;

/// 在多处出现的题干
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePrompt {
    /// 规范化后的题干（小写，压缩空白）
    pub prompt: String,
    /// (文档标识, 题号)，题号从 1 开始
    pub occurrences: Vec<(String, usize)>,
}

/// 交换文件：文档标识 → 结构化数据
///
/// 可以在“重新导入”模式下代替实时提取作为数据源
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterchangeExport {
    pub entries: BTreeMap<String, LessonData>,
}

impl InterchangeExport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document_id: impl Into<String>, data: LessonData) {
        self.entries.insert(document_id.into(), data);
    }

    pub fn get(&self, document_id: &str) -> Option<&LessonData> {
        self.entries.get(document_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 题目总数
    pub fn total_questions(&self) -> usize {
        self.entries.values().map(|d| d.questions.len()).sum()
    }

    /// 学习目标总数
    pub fn total_objectives(&self) -> usize {
        self.entries
            .values()
            .filter_map(|d| d.objectives.as_ref())
            .map(|o| o.items.len())
            .sum()
    }

    /// 题干相同的题目（忽略大小写和空白差异），按题干排序
    pub fn duplicate_prompts(&self) -> Vec<DuplicatePrompt> {
        let mut seen: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
        for (id, data) in &self.entries {
            for (i, question) in data.questions.iter().enumerate() {
                seen.entry(normalize_prompt(question.prompt()))
                    .or_default()
                    .push((id.clone(), i + 1));
            }
        }

        seen.into_iter()
            .filter(|(_, occurrences)| occurrences.len() > 1)
            .map(|(prompt, occurrences)| DuplicatePrompt {
                prompt,
                occurrences,
            })
            .collect()
    }
}

fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;

    fn lesson(prompts: &[&str]) -> LessonData {
        LessonData {
            title: String::new(),
            questions: prompts
                .iter()
                .map(|p| Question::new(*p, vec!["أ".to_string()], 0).unwrap())
                .collect(),
            objectives: None,
        }
    }

    #[test]
    fn test_duplicate_prompts_across_documents() {
        let mut export = InterchangeExport::new();
        export.insert("unit-1-cells/lesson-1-1", lesson(&["ما هي الخلية؟", "ما هو الانتشار؟"]));
        export.insert("unit-2-transport/lesson-2-1", lesson(&["ما هو  الانتشار؟ ", "سؤال فريد"]));
        export.insert("unit-2-transport/lesson-2-2", lesson(&["ما هي الخلية؟"]));

        let duplicates = export.duplicate_prompts();
        assert_eq!(duplicates.len(), 2);

        let diffusion = duplicates
            .iter()
            .find(|d| d.prompt == "ما هو الانتشار؟")
            .unwrap();
        assert_eq!(
            diffusion.occurrences,
            vec![
                ("unit-1-cells/lesson-1-1".to_string(), 2),
                ("unit-2-transport/lesson-2-1".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_no_duplicates() {
        let mut export = InterchangeExport::new();
        export.insert("unit-1-cells/lesson-1-1", lesson(&["س1", "س2"]));
        assert!(export.duplicate_prompts().is_empty());
    }
}
