pub mod backup;
pub mod balance;
pub mod detector;
pub mod extractor;
pub mod grammar;
pub mod registry;
pub mod report;
pub mod report_writer;
pub mod templates;
pub mod transform;

pub use backup::{BackupManager, BackupRecord, DEFAULT_BACKUP_SUFFIX};
pub use balance::{block_extent, check_balance, BalanceReport, BlockSyntax};
pub use detector::{Detection, FeatureDetector, FeatureStatus};
pub use extractor::{Extraction, StructuredExtractor};
pub use registry::{FeatureBlock, FeatureRegistry, Placement};
pub use report::{summarize, Summary};
pub use report_writer::ReportWriter;
pub use templates::TemplateLibrary;
pub use transform::{TransformEngine, TransformResult};
