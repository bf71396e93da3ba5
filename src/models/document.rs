use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::models::feature::FeatureName;
use crate::models::topic::Topic;

/// 文档元数据（模板生成用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// 文档标识，例如 `unit-1-cells/lesson-1-1`
    pub id: String,
    /// 由单元目录推导出的主题
    pub topic: Topic,
}

impl DocumentMeta {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let topic = Topic::from_document_id(&id);
        Self { id, topic }
    }
}

/// 一个课程页面
///
/// 在一次运行中只加载一次，只在内存中修改，最多写回一次
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub raw_text: String,
    pub meta: DocumentMeta,
    /// 检测到的已存在功能（恰好出现一次的）
    pub detected: BTreeSet<FeatureName>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, id: impl Into<String>, raw_text: String) -> Self {
        Self {
            path: path.into(),
            raw_text,
            meta: DocumentMeta::new(id),
            detected: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }
}
