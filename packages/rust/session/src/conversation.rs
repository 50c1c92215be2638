//! Multi-turn conversation state.
//!
//! A [`Conversation`] owns the message history for one session id. Model
//! turns either complete fully (reply appended, record saved, event logged)
//! or leave the history exactly as it was.

use tracing::{debug, info, instrument, warn};

use sheetprompt_shared::{ExchangeEvent, Message, Result, SessionId};

use crate::client::{ChatOverrides, LanguageModelClient, extract_reply};
use crate::store::SessionStore;
use crate::trim::{HistorySummarizer, NoopSummarizer, trim_window};

/// Tuning knobs for a conversation.
#[derive(Debug, Clone, Copy)]
pub struct ConversationOptions {
    /// User/assistant pairs kept in context besides the system message.
    pub max_turns: usize,
    /// Run the [`HistorySummarizer`] before trimming.
    pub rolling_summary: bool,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            max_turns: 20,
            rolling_summary: false,
        }
    }
}

/// Persisted chat history bound to a model client.
pub struct Conversation<C> {
    id: SessionId,
    store: SessionStore,
    client: C,
    options: ConversationOptions,
    summarizer: Box<dyn HistorySummarizer>,
    messages: Vec<Message>,
}

impl<C: LanguageModelClient> Conversation<C> {
    /// Open the session, restoring its history if a record exists.
    pub fn open(
        id: SessionId,
        store: SessionStore,
        client: C,
        options: ConversationOptions,
    ) -> Result<Self> {
        let messages = store.load(&id)?.unwrap_or_default();
        debug!(session = %id, restored = messages.len(), "opened conversation");
        Ok(Self {
            id,
            store,
            client,
            options,
            summarizer: Box::new(NoopSummarizer),
            messages,
        })
    }

    /// Replace the rolling-summary hook.
    pub fn with_summarizer(mut self, summarizer: impl HistorySummarizer + 'static) -> Self {
        self.summarizer = Box::new(summarizer);
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Copy of the current history.
    pub fn history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Begin a fresh exchange with `[system, user]`, discarding prior history.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn start(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
        overrides: &ChatOverrides,
    ) -> Result<String> {
        let candidate = vec![Message::system(system_prompt), Message::user(user_prompt)];
        self.exchange(candidate, overrides)
    }

    /// Send a follow-up user message with the full history.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn continue_with(&mut self, user_message: &str, overrides: &ChatOverrides) -> Result<String> {
        let mut candidate = self.messages.clone();
        candidate.push(Message::user(user_message));
        self.exchange(candidate, overrides)
    }

    /// Append a user message without calling the model.
    pub fn add_user(&mut self, content: &str) -> Result<()> {
        self.append(Message::user(content))
    }

    /// Append an assistant message without calling the model.
    pub fn add_assistant(&mut self, content: &str) -> Result<()> {
        self.append(Message::assistant(content))
    }

    /// Clear the history and persist the empty record.
    pub fn reset(&mut self) -> Result<()> {
        self.store.save(&self.id, &[])?;
        self.messages.clear();
        info!(session = %self.id, "conversation reset");
        Ok(())
    }

    fn append(&mut self, message: Message) -> Result<()> {
        let mut candidate = self.messages.clone();
        candidate.push(message);
        self.store.save(&self.id, &candidate)?;
        self.messages = candidate;
        Ok(())
    }

    /// Trim, call the model, append its reply, persist, audit.
    ///
    /// `self.messages` is only replaced once the reply is in and the record
    /// has been written.
    fn exchange(&mut self, mut candidate: Vec<Message>, overrides: &ChatOverrides) -> Result<String> {
        if self.options.rolling_summary {
            self.summarizer.summarize(&mut candidate);
        }
        let dropped = trim_window(&mut candidate, self.options.max_turns);
        if dropped > 0 {
            debug!(dropped, max_turns = self.options.max_turns, "trimmed history");
        }

        let response = self.client.chat(&candidate, overrides)?;
        let reply = extract_reply(&response);
        candidate.push(Message::assistant(reply.clone()));

        self.store.save(&self.id, &candidate)?;
        self.messages = candidate;

        let event = ExchangeEvent::exchange(&self.id, self.messages.len());
        if let Err(e) = self.store.append_event(&event) {
            warn!(error = %e, "failed to append audit event");
        }

        info!(messages = self.messages.len(), reply_len = reply.len(), "exchange complete");
        Ok(reply)
    }
}
