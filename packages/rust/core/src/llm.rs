//! Blocking OpenAI-compatible chat client.
//!
//! Works with any endpoint exposing `POST <base_url>/chat/completions`
//! (OpenAI, OpenRouter, Azure-style proxies, Ollama, vLLM).

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use sheetprompt_session::{ChatOverrides, LanguageModelClient};
use sheetprompt_shared::{Message, ModelConfig, Result, SheetPromptError};

/// Chat client speaking the OpenAI completions wire format.
pub struct OpenAiCompatClient {
    url: String,
    api_key: String,
    model: String,
    defaults: ChatOverrides,
    http: reqwest::blocking::Client,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatClient {
    /// Build a client from the `[model]` config section and a resolved API key.
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let url = format!("{}/chat/completions", endpoint.as_str().trim_end_matches('/'));

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SheetPromptError::Model(format!("failed to build HTTP client: {e}")))?;

        let mut defaults = ChatOverrides::new();
        if let Some(t) = config.temperature {
            defaults.insert("temperature".into(), json!(t));
        }
        if let Some(n) = config.max_tokens {
            defaults.insert("max_tokens".into(), json!(n));
        }

        Ok(Self {
            url,
            api_key: api_key.into(),
            model: config.model.clone(),
            defaults,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request body: model and messages, then config defaults, then per-call overrides.
    pub fn request_body(&self, messages: &[Message], overrides: &ChatOverrides) -> Value {
        let mut body = ChatOverrides::new();
        body.insert("model".into(), json!(self.model));
        body.insert("messages".into(), json!(messages));
        for (key, value) in self.defaults.iter().chain(overrides.iter()) {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

impl LanguageModelClient for OpenAiCompatClient {
    fn chat(&self, messages: &[Message], overrides: &ChatOverrides) -> Result<Value> {
        let body = self.request_body(messages, overrides);
        debug!(url = %self.url, model = %self.model, messages = messages.len(), "sending chat request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SheetPromptError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "model endpoint returned error");
            return Err(SheetPromptError::Model(format!(
                "HTTP {}: {text}",
                status.as_u16()
            )));
        }

        response
            .json::<Value>()
            .map_err(|e| SheetPromptError::Model(format!("failed to parse response: {e}")))
    }
}
