//! On-disk session persistence.
//!
//! Layout under the sessions directory:
//! ```text
//! <dir>/
//! ├── <session_id>.json    (SessionRecord, rewritten on every mutation)
//! └── <session_id>.jsonl   (ExchangeEvent per line, append-only)
//! ```
//!
//! The record is overwritten in place; the last successful write wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use sheetprompt_shared::{
    ExchangeEvent, Message, Result, Role, SessionId, SessionRecord, SheetPromptError, utc_timestamp,
};

/// File-backed store for session records and their audit trails.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SheetPromptError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the session record file.
    pub fn record_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Path of the audit log file.
    pub fn audit_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }

    /// Load the stored messages, or `None` if the session was never saved.
    pub fn load(&self, id: &SessionId) -> Result<Option<Vec<Message>>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| SheetPromptError::io(&path, e))?;
        let record: SessionRecord = serde_json::from_str(&content).map_err(|e| {
            SheetPromptError::Serialization(format!("invalid session record {}: {e}", path.display()))
        })?;

        if let Some(pos) = record
            .messages
            .iter()
            .skip(1)
            .position(|m| m.role == Role::System)
        {
            return Err(SheetPromptError::validation(format!(
                "session record {} has a system message at index {}; only index 0 may be system",
                path.display(),
                pos + 1
            )));
        }
        if record.session_id != *id {
            warn!(session = %id, stored = %record.session_id, "session record id differs from file name");
        }

        debug!(session = %id, messages = record.messages.len(), "loaded session record");
        Ok(Some(record.messages))
    }

    /// Overwrite the session record with `messages`.
    pub fn save(&self, id: &SessionId, messages: &[Message]) -> Result<()> {
        let record = SessionRecord {
            session_id: id.clone(),
            updated_at: utc_timestamp(),
            messages: messages.to_vec(),
        };
        let path = self.record_path(id);
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&path, json).map_err(|e| SheetPromptError::io(&path, e))?;
        debug!(path = %path.display(), messages = messages.len(), "saved session record");
        Ok(())
    }

    /// Append one event line to the audit log.
    pub fn append_event(&self, event: &ExchangeEvent) -> Result<()> {
        let path = self.audit_path(&event.session_id);
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SheetPromptError::io(&path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| SheetPromptError::io(&path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("sp-store-test-{}", uuid::Uuid::now_v7()))
    }

    fn id(s: &str) -> SessionId {
        s.parse().expect("session id")
    }

    #[test]
    fn open_creates_directory() {
        let tmp = temp_dir();
        let store = SessionStore::open(tmp.join("nested")).unwrap();
        assert!(store.dir().is_dir());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_unknown_session_is_none() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        assert!(store.load(&id("nobody")).unwrap().is_none());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        let messages = vec![
            Message::system("rules with {braces} and ünïcode"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        store.save(&id("demo"), &messages).unwrap();
        assert_eq!(store.load(&id("demo")).unwrap(), Some(messages));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_rejects_system_message_after_index_zero() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        store
            .save(
                &id("odd"),
                &[Message::user("hi"), Message::system("late rules")],
            )
            .unwrap();

        let err = store.load(&id("odd")).unwrap_err();
        assert!(matches!(err, SheetPromptError::Validation { .. }));
        assert!(err.to_string().contains("index 1"), "{err}");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_rejects_record_with_invalid_session_id() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        std::fs::write(
            store.record_path(&id("bad")),
            r#"{"session_id":"../x","updated_at":"2025-01-01T00:00:00Z","messages":[]}"#,
        )
        .unwrap();

        let err = store.load(&id("bad")).unwrap_err();
        assert!(matches!(err, SheetPromptError::Serialization(_)));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn saved_record_shape() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        store.save(&id("demo"), &[Message::user("é")]).unwrap();

        let bytes = std::fs::read(store.record_path(&id("demo"))).unwrap();
        assert!(!bytes.starts_with(&[0xEF, 0xBB, 0xBF]), "no BOM");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n  \"session_id\": \"demo\""), "pretty printed");
        assert!(text.contains("é"), "non-ASCII kept verbatim");

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["updated_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value["messages"][0]["role"], "user");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn audit_log_appends_lines() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        store.append_event(&ExchangeEvent::exchange(&id("demo"), 3)).unwrap();
        store.append_event(&ExchangeEvent::exchange(&id("demo"), 5)).unwrap();

        let text = std::fs::read_to_string(store.audit_path(&id("demo"))).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "exchange");
        assert_eq!(lines[0]["session_id"], "demo");
        assert_eq!(lines[1]["messages_len"], 5);
        assert!(lines[1]["ts"].as_str().unwrap().ends_with('Z'));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let tmp = temp_dir();
        let store = SessionStore::open(&tmp).unwrap();
        std::fs::write(store.record_path(&id("bad")), "{").unwrap();
        assert!(matches!(
            store.load(&id("bad")),
            Err(SheetPromptError::Serialization(_))
        ));
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
