//! Prompt assembly and model wiring for SheetPrompt.
//!
//! This crate ties the knowledge compiler to prompt templates and provides
//! the HTTP model client used by the conversation layer.

pub mod export;
pub mod inject;
pub mod llm;
pub mod prompts;

pub use export::{ArtifactMeta, BlockIndex, export_blocks};
pub use inject::{BLOCK_TOKENS, QUERY_TOKEN, Substitutions, inject_blocks, is_reserved};
pub use llm::OpenAiCompatClient;
pub use prompts::{
    PromptFiles, PromptPair, build_prompts, build_prompts_from_files, read_template,
    render_prompts,
};
