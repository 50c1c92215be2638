//! Conversation state for SheetPrompt: bounded, persisted chat history.
//!
//! - [`Conversation`] — the start/continue/reset state machine
//! - [`SessionStore`] — `<id>.json` records and `<id>.jsonl` audit trails
//! - [`trim_window`] — the context-window cap applied before model calls
//! - [`LanguageModelClient`] — the model boundary, injected by the caller

pub mod client;
pub mod conversation;
pub mod store;
pub mod trim;

pub use client::{ChatOverrides, LanguageModelClient, extract_reply};
pub use conversation::{Conversation, ConversationOptions};
pub use store::SessionStore;
pub use trim::{HistorySummarizer, NoopSummarizer, trim_window};
