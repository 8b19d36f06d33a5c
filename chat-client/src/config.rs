//! Session configuration.

use peerchat_core::{HistoryFormat, RetryPolicy};
use peerchat_types::Identity;
use std::path::PathBuf;

use crate::history::HistoryFile;

/// Configuration for a [`ChatSession`](crate::ChatSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Our identity in the directory and mailbox namespace.
    pub identity: Identity,
    /// Where the conversation history is kept.
    pub history_path: PathBuf,
    /// Layout of the history file.
    pub history_format: HistoryFormat,
    /// Discovery retry policy.
    pub retry: RetryPolicy,
}

impl ChatConfig {
    /// Create a config with the default format and retry policy.
    pub fn new(identity: impl Into<Identity>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            identity: identity.into(),
            history_path: history_path.into(),
            history_format: HistoryFormat::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the history file format.
    pub fn with_format(mut self, format: HistoryFormat) -> Self {
        self.history_format = format;
        self
    }

    /// Set the discovery retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The history file this config points at.
    pub fn history_file(&self) -> HistoryFile {
        HistoryFile::new(self.history_path.clone(), self.history_format)
    }
}
