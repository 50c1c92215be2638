//! Shared types, error model, and configuration for SheetPrompt.
//!
//! This crate is the foundation depended on by all other SheetPrompt crates.
//! It provides:
//! - [`SheetPromptError`] — the unified error type
//! - Domain types ([`Message`], [`Role`], [`SessionRecord`], [`KnowledgeBlocks`])
//! - Configuration ([`AppConfig`], [`SheetNames`], [`ModelConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ModelConfig, SheetNames, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SheetPromptError};
pub use types::{
    BlockKind, ExchangeEvent, KnowledgeBlocks, Message, Role, SessionId, SessionRecord,
    utc_timestamp,
};
