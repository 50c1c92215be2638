//! Context-window trimming.

use sheetprompt_shared::{Message, Role};

/// Hook run before trimming when rolling summaries are enabled.
///
/// It may rewrite the history (e.g. fold old turns into one message). The
/// default implementation leaves it untouched.
pub trait HistorySummarizer {
    fn summarize(&self, messages: &mut Vec<Message>);
}

/// Summarizer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummarizer;

impl HistorySummarizer for NoopSummarizer {
    fn summarize(&self, _messages: &mut Vec<Message>) {}
}

/// Keep a leading system message plus the last `2 * max_turns` messages.
///
/// Nothing happens until the history exceeds `2 * max_turns + 1` messages.
/// Returns the number of messages dropped.
pub fn trim_window(messages: &mut Vec<Message>, max_turns: usize) -> usize {
    let keep = 2 * max_turns;
    let before = messages.len();
    if before <= keep + 1 {
        return 0;
    }

    let system = messages
        .first()
        .filter(|m| m.role == Role::System)
        .cloned();
    let tail = messages.split_off(before - keep);

    messages.clear();
    messages.extend(system);
    messages.extend(tail);
    before - messages.len()
}
