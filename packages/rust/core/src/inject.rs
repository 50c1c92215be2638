//! Placeholder substitution for prompt templates.
//!
//! Tokens are replaced literally in a single left-to-right pass, so text that
//! was just substituted (a knowledge block, the user's query) is never scanned
//! again. A block that happens to contain `{USER_QUERY}` or `<<CORE_GUIDE>>`
//! ends up in the prompt verbatim. Unknown tokens are left as they are.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

use sheetprompt_shared::{BlockKind, KnowledgeBlocks};

/// Token replaced with the caller's query in the user template.
pub const QUERY_TOKEN: &str = "{USER_QUERY}";

/// Template tokens and the block each one expands to. Aliases share a block.
pub const BLOCK_TOKENS: [(&str, BlockKind); 5] = [
    ("<<CORE_GUIDE>>", BlockKind::CoreGuide),
    ("<<TYPE_DEFINITIONS>>", BlockKind::TypeDefinitions),
    ("<<VARIABLE_PATH_MAPPING>>", BlockKind::VariableMapping),
    ("<<TOPICAL_RULES>>", BlockKind::TypeDefinitions),
    ("<<EXAMPLES_PLAYBOOK>>", BlockKind::VariableMapping),
];

/// A set of literal token → text replacements.
#[derive(Debug, Clone, Default)]
pub struct Substitutions<'a> {
    map: BTreeMap<&'a str, &'a str>,
}

impl<'a> Substitutions<'a> {
    /// Every block token from [`BLOCK_TOKENS`].
    pub fn blocks(blocks: &'a KnowledgeBlocks) -> Self {
        let map = BLOCK_TOKENS
            .iter()
            .map(|(token, kind)| (*token, blocks.get(*kind)))
            .collect();
        Self { map }
    }

    /// Add (or override) one token.
    pub fn with(mut self, token: &'a str, value: &'a str) -> Self {
        if !token.is_empty() {
            self.map.insert(token, value);
        }
        self
    }

    /// Add the query token.
    pub fn with_query(self, query: &'a str) -> Self {
        self.with(QUERY_TOKEN, query)
    }

    /// Replace every known token in `template`.
    pub fn apply(&self, template: &str) -> String {
        if self.map.is_empty() {
            return template.to_string();
        }

        // Longest first so a token that prefixes another never shadows it.
        let mut tokens: Vec<&str> = self.map.keys().copied().collect();
        tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let pattern = tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        match Regex::new(&pattern) {
            Ok(re) => re
                .replace_all(template, |caps: &Captures| {
                    self.map.get(&caps[0]).copied().unwrap_or_default().to_string()
                })
                .into_owned(),
            // Only reachable if the pattern exceeds the regex size limit.
            Err(e) => {
                tracing::warn!(error = %e, "token pattern rejected, substituting sequentially");
                self.map
                    .iter()
                    .fold(template.to_string(), |acc, (t, v)| acc.replace(t, v))
            }
        }
    }
}

/// Whether `token` is one of the block tokens or the query token.
pub fn is_reserved(token: &str) -> bool {
    token == QUERY_TOKEN || BLOCK_TOKENS.iter().any(|(t, _)| *t == token)
}

/// Inject the knowledge blocks into a template.
pub fn inject_blocks(template: &str, blocks: &KnowledgeBlocks) -> String {
    Substitutions::blocks(blocks).apply(template)
}
