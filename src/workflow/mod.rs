pub mod document_ctx;
pub mod patch_flow;

pub use document_ctx::DocumentCtx;
pub use patch_flow::{FlowOutput, PatchFlow};
