use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{AppResult, InterchangeError};
use crate::models::interchange::InterchangeExport;

/// 交换文件格式，由扩展名决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterchangeFormat {
    Json,
    Toml,
}

impl InterchangeFormat {
    /// `.toml` 使用 TOML，其余一律使用 JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => InterchangeFormat::Toml,
            _ => InterchangeFormat::Json,
        }
    }
}

/// 从文件加载交换数据
pub fn load_interchange(path: &Path) -> AppResult<InterchangeExport> {
    let shown = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| InterchangeError::Io {
        path: shown.clone(),
        source,
    })?;

    let export: InterchangeExport = match InterchangeFormat::from_path(path) {
        InterchangeFormat::Json => {
            serde_json::from_str(&content).map_err(|source| InterchangeError::Json {
                path: shown.clone(),
                source,
            })?
        }
        InterchangeFormat::Toml => {
            toml::from_str(&content).map_err(|source| InterchangeError::TomlParse {
                path: shown.clone(),
                source,
            })?
        }
    };

    info!(
        "📥 已加载交换文件 {}: {} 个文档, {} 道题目",
        shown,
        export.len(),
        export.total_questions()
    );
    Ok(export)
}

/// 把交换数据写入文件
pub fn save_interchange(export: &InterchangeExport, path: &Path) -> AppResult<()> {
    let shown = path.display().to_string();
    let content = match InterchangeFormat::from_path(path) {
        InterchangeFormat::Json => {
            serde_json::to_string_pretty(export).map_err(|source| InterchangeError::Json {
                path: shown.clone(),
                source,
            })?
        }
        InterchangeFormat::Toml => {
            toml::to_string_pretty(export).map_err(|source| InterchangeError::TomlWrite {
                path: shown.clone(),
                source,
            })?
        }
    };

    fs::write(path, content).map_err(|source| InterchangeError::Io {
        path: shown.clone(),
        source,
    })?;

    info!("📤 交换文件已保存: {} ({} 个文档)", shown, export.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lesson_data::{LessonData, ObjectiveList, Question};

    fn sample_export() -> InterchangeExport {
        let mut export = InterchangeExport::new();
        export.insert(
            "unit-1-cells/lesson-1-1",
            LessonData {
                title: "الخلايا الحيوانية والنباتية".to_string(),
                questions: vec![Question::new(
                    "ما وظيفة الغشاء الخلوي؟",
                    vec!["التحكم في المواد".to_string(), "البناء الضوئي".to_string()],
                    0,
                )
                .unwrap()],
                objectives: Some(ObjectiveList {
                    description: "في نهاية الدرس".to_string(),
                    items: vec!["أن يميز الطالب".to_string()],
                }),
            },
        );
        export
    }

    #[test]
    fn test_save_and_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        let export = sample_export();

        for name in ["export.json", "export.toml"] {
            let path = dir.path().join(name);
            save_interchange(&export, &path).unwrap();
            assert_eq!(load_interchange(&path).unwrap(), export);
        }
    }

    #[test]
    fn test_load_rejects_invalid_question() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"x": {"title": "t", "questions": [{"prompt": "p", "choices": ["a"], "correct_index": 3}]}}"#,
        )
        .unwrap();
        assert!(load_interchange(&path).is_err());
    }
}
