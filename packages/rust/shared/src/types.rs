//! Core domain types shared by the compiler and the conversation layer.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SheetPromptError};

/// Current UTC time as ISO-8601 with microseconds and a trailing `Z`.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Identifier of a persisted conversation. Used verbatim as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a short random identifier with the given prefix, e.g. `cli-1a2b3c4d`.
    pub fn generate(prefix: &str) -> Self {
        let hex = Uuid::now_v7().simple().to_string();
        Self(format!("{prefix}-{}", &hex[hex.len() - 8..]))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SheetPromptError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "." || s == ".." {
            return Err(SheetPromptError::validation(format!(
                "invalid session id: {s:?}"
            )));
        }
        if s.contains(['/', '\\']) {
            return Err(SheetPromptError::validation(format!(
                "session id must not contain path separators: {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = SheetPromptError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = SheetPromptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(SheetPromptError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A single chat message in the OpenAI `{role, content}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence records
// ---------------------------------------------------------------------------

/// The `<session_id>.json` structure: the only durable form of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Conversation identifier.
    pub session_id: SessionId,
    /// When the record was last written (ISO-8601 UTC, trailing `Z`).
    pub updated_at: String,
    /// Ordered message history.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// One line of the `<session_id>.jsonl` audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub ts: String,
    pub session_id: SessionId,
    pub event: String,
    pub messages_len: usize,
}

impl ExchangeEvent {
    /// An `exchange` event stamped with the current time.
    pub fn exchange(session_id: &SessionId, messages_len: usize) -> Self {
        Self {
            ts: utc_timestamp(),
            session_id: session_id.clone(),
            event: "exchange".into(),
            messages_len,
        }
    }
}

// ---------------------------------------------------------------------------
// Knowledge blocks
// ---------------------------------------------------------------------------

/// The three compiled knowledge artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    CoreGuide,
    TypeDefinitions,
    VariableMapping,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [
        BlockKind::CoreGuide,
        BlockKind::TypeDefinitions,
        BlockKind::VariableMapping,
    ];

    /// Stable key used in exported artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoreGuide => "core_guide",
            Self::TypeDefinitions => "type_definitions",
            Self::VariableMapping => "variable_mapping",
        }
    }
}

/// Compiled text for every [`BlockKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBlocks {
    pub core_guide: String,
    pub type_definitions: String,
    pub variable_mapping: String,
}

impl KnowledgeBlocks {
    pub fn get(&self, kind: BlockKind) -> &str {
        match kind {
            BlockKind::CoreGuide => &self.core_guide,
            BlockKind::TypeDefinitions => &self.type_definitions,
            BlockKind::VariableMapping => &self.variable_mapping,
        }
    }
}
