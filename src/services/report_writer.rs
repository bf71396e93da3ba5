//! 报告写入服务 - 业务能力层
//!
//! 只负责"把摘要落盘"的能力，不关心流程

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::loaders::save_interchange;
use crate::services::report::Summary;

/// 报告写入服务
///
/// 职责：
/// - 将文本摘要写入报告文件（覆盖）
/// - 配置了导出路径时写出交换文件
pub struct ReportWriter {
    report_path: PathBuf,
    export_path: Option<PathBuf>,
}

impl ReportWriter {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
            export_path: None,
        }
    }

    /// 同时写出交换文件
    pub fn with_export(mut self, export_path: Option<PathBuf>) -> Self {
        self.export_path = export_path;
        self
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// 写入摘要
    pub fn write(&self, summary: &Summary) -> AppResult<()> {
        debug!(
            "写入报告: {} ({} 字节)",
            self.report_path.display(),
            summary.text.len()
        );
        fs::write(&self.report_path, &summary.text)
            .map_err(|e| AppError::write_failed(&self.report_path, e))?;
        info!("📝 报告已保存至: {}", self.report_path.display());

        if let (Some(path), Some(export)) = (&self.export_path, &summary.export) {
            save_interchange(export, path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loaders::load_interchange;
    use crate::models::{InterchangeExport, LessonData};

    #[test]
    fn test_write_report_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.txt");
        let export_path = dir.path().join("export.json");

        let mut export = InterchangeExport::new();
        export.insert(
            "unit-1-cells/lesson-1-1",
            LessonData {
                title: "الخلية".to_string(),
                ..Default::default()
            },
        );
        let summary = Summary {
            text: "تقرير\n".to_string(),
            export: Some(export.clone()),
        };

        ReportWriter::new(&report_path)
            .with_export(Some(export_path.clone()))
            .write(&summary)
            .unwrap();

        assert_eq!(fs::read_to_string(&report_path).unwrap(), "تقرير\n");
        assert_eq!(load_interchange(&export_path).unwrap(), export);
    }
}
