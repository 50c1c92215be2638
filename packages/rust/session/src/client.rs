//! The language-model boundary.

use serde_json::Value;
use tracing::warn;

use sheetprompt_shared::{Message, Result};

/// Per-call request overrides (temperature, max_tokens, …), passed through opaquely.
pub type ChatOverrides = serde_json::Map<String, Value>;

/// A chat-completion backend.
///
/// Implementations return the raw JSON response; the conversation layer
/// pulls the assistant text out of it with [`extract_reply`].
pub trait LanguageModelClient {
    fn chat(&self, messages: &[Message], overrides: &ChatOverrides) -> Result<Value>;
}

impl<C: LanguageModelClient + ?Sized> LanguageModelClient for &C {
    fn chat(&self, messages: &[Message], overrides: &ChatOverrides) -> Result<Value> {
        (**self).chat(messages, overrides)
    }
}

impl<C: LanguageModelClient + ?Sized> LanguageModelClient for Box<C> {
    fn chat(&self, messages: &[Message], overrides: &ChatOverrides) -> Result<Value> {
        (**self).chat(messages, overrides)
    }
}

/// Assistant text at `choices[0].message.content`, or the whole response
/// rendered as JSON when that field is missing or not a string.
pub fn extract_reply(response: &Value) -> String {
    match response.pointer("/choices/0/message/content").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => {
            warn!("response has no choices[0].message.content, keeping raw body");
            response.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_openai_shape() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "done"}}]
        });
        assert_eq!(extract_reply(&response), "done");
    }

    #[test]
    fn falls_back_to_raw_body() {
        let response = json!({"error": {"message": "odd"}});
        let text = extract_reply(&response);
        assert!(text.contains("odd"));
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), response);
    }

    #[test]
    fn non_string_content_falls_back() {
        let response = json!({"choices": [{"message": {"content": null}}]});
        assert!(extract_reply(&response).contains("choices"));
    }
}
