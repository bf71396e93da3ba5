//! 文档处理上下文
//!
//! 封装"我正在处理第几个文档、它是谁"这一信息

use std::fmt::Display;

use crate::models::Topic;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 文档标识
    pub document_id: String,

    /// 文档序号（从1开始，仅用于日志显示）
    pub document_index: usize,

    /// 本次运行的文档总数
    pub total: usize,

    /// 主题
    pub topic: Topic,
}

impl DocumentCtx {
    pub fn new(document_id: String, document_index: usize, total: usize, topic: Topic) -> Self {
        Self {
            document_id,
            document_index,
            total,
            topic,
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {}/{} {} 主题#{}]",
            self.document_index, self.total, self.document_id, self.topic
        )
    }
}
