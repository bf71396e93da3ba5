pub mod document;
pub mod feature;
pub mod interchange;
pub mod lesson_data;
pub mod loaders;
pub mod outcome;
pub mod topic;

pub use document::{Document, DocumentMeta};
pub use feature::FeatureName;
pub use interchange::{DuplicatePrompt, InterchangeExport};
pub use lesson_data::{LessonData, ObjectiveList, Question};
pub use loaders::{discover_lessons, document_id_for, load_document};
pub use outcome::{BatchReport, DocumentOutcome, OutcomeStatus, PatchMode};
pub use topic::Topic;
