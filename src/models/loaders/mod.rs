pub mod document_loader;
pub mod interchange_loader;

pub use document_loader::{discover_lessons, document_id_for, load_document};
pub use interchange_loader::{load_interchange, save_interchange, InterchangeFormat};
