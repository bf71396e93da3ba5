use serde::{Deserialize, Serialize};

/// 单选题
///
/// 只能通过 [`Question::new`] 构造，保证选项非空且正确答案索引有效
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
}

/// 反序列化用的未校验题目
#[derive(Deserialize)]
struct RawQuestion {
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        Question::new(raw.prompt, raw.choices, raw.correct_index)
    }
}

impl Question {
    /// 创建题目
    ///
    /// # 返回
    /// 选项为空或索引越界时返回错误描述
    pub fn new(
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, String> {
        let prompt = prompt.into();
        if choices.is_empty() {
            return Err(format!("题目 '{}' 没有选项", prompt));
        }
        if correct_index >= choices.len() {
            return Err(format!(
                "题目 '{}' 的正确答案索引 {} 超出范围 [0, {}]",
                prompt,
                correct_index,
                choices.len() - 1
            ));
        }
        Ok(Self {
            prompt,
            choices,
            correct_index,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// 正确选项文本
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }
}

/// 学习目标列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveList {
    pub description: String,
    pub items: Vec<String>,
}

impl ObjectiveList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 一个文档的结构化数据（也是交换文件中的条目）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonData {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<ObjectiveList>,
}

impl LessonData {
    pub fn has_content(&self) -> bool {
        !self.questions.is_empty() || self.objectives.as_ref().is_some_and(|o| !o.is_empty())
    }
}
