//! In-memory conversation history.
//!
//! Maps each [`ConversationKey`] to an append-only log of formatted lines
//! (`"<sender>: <content>"`). Logs are only ever appended to; nothing here
//! truncates or reorders them.
//!
//! Persistence lives elsewhere: see [`crate::codec`] for the file formats and
//! `peerchat-client` for the file I/O.

use std::collections::BTreeMap;

use peerchat_types::{ConversationKey, Identity, Message};

/// Conversation logs keyed by canonical pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    conversations: BTreeMap<ConversationKey, Vec<String>>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message from `sender` to `receiver`.
    ///
    /// Creates the conversation log on first use. Returns the key the line
    /// was appended under.
    pub fn add_message(
        &mut self,
        sender: &Identity,
        receiver: &Identity,
        content: &str,
    ) -> ConversationKey {
        let key = ConversationKey::new(sender, receiver);
        self.append_line(key.clone(), format!("{}: {}", sender, content));
        key
    }

    /// Record a full [`Message`].
    pub fn record(&mut self, message: &Message) -> ConversationKey {
        self.add_message(&message.sender, &message.receiver, &message.content)
    }

    /// Append an already formatted line to a conversation.
    pub fn append_line(&mut self, key: ConversationKey, line: String) {
        self.conversations.entry(key).or_default().push(line);
    }

    /// Replace a conversation's log wholesale.
    ///
    /// Only used when rebuilding a store from a file.
    pub(crate) fn insert_log(&mut self, key: ConversationKey, lines: Vec<String>) {
        self.conversations.insert(key, lines);
    }

    /// The conversation between `a` and `b` as one string, one line per
    /// message, each terminated by `\n`. Empty if they never talked.
    pub fn conversation_history(&self, a: &Identity, b: &Identity) -> String {
        let key = ConversationKey::new(a, b);
        self.log(&key)
            .map(|lines| {
                let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            })
            .unwrap_or_default()
    }

    /// The raw lines of one conversation.
    pub fn log(&self, key: &ConversationKey) -> Option<&[String]> {
        self.conversations.get(key).map(Vec::as_slice)
    }

    /// All conversations, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConversationKey, &[String])> {
        self.conversations.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// All keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &ConversationKey> {
        self.conversations.keys()
    }

    /// Number of conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Check if no conversation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Total number of lines across every conversation.
    pub fn total_lines(&self) -> usize {
        self.conversations.values().map(Vec::len).sum()
    }
}
