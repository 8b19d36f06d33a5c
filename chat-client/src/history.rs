//! History persistence.
//!
//! [`HistoryFile`] reads and writes a whole [`ConversationStore`] in one of
//! the [`HistoryFormat`]s. Every save rewrites the file in full.
//!
//! [`SharedHistory`] is the store a session shares between its receive loop
//! and UI-side calls. Appending a line and persisting the result happen under
//! one lock, so two concurrent appends can never interleave their writes.

use peerchat_core::{CodecError, ConversationStore, Decoded, HistoryFormat};
use peerchat_types::{ConversationKey, Identity, Message};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the file failed.
    #[error("history file {path}: {source}")]
    Io {
        /// The history file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file contents could not be parsed.
    #[error("failed to decode history: {0}")]
    Decode(#[source] CodecError),

    /// The store could not be serialized.
    #[error("failed to encode history: {0}")]
    Encode(#[source] CodecError),

    /// Loading would replace a store that already holds lines.
    #[error("refusing to reload history over {lines} in-memory lines")]
    WouldDiscard {
        /// Lines currently held in memory.
        lines: usize,
    },
}

/// A history file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFile {
    path: PathBuf,
    format: HistoryFormat,
}

impl HistoryFile {
    /// Describe a history file. Nothing is touched until `load` or `save`.
    pub fn new(path: impl Into<PathBuf>, format: HistoryFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the file.
    pub fn format(&self) -> HistoryFormat {
        self.format
    }

    /// Read and decode the file. A missing file is an empty store.
    pub async fn load(&self) -> Result<Decoded, PersistenceError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No history file at {}", self.path.display());
                return Ok(Decoded::default());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let decoded = self
            .format
            .decode(&text)
            .map_err(PersistenceError::Decode)?;
        if decoded.skipped_lines > 0 {
            tracing::warn!(
                "Skipped {} unattached lines in {}",
                decoded.skipped_lines,
                self.path.display()
            );
        }
        Ok(decoded)
    }

    /// Encode and write the whole store, replacing the file atomically.
    pub async fn save(&self, store: &ConversationStore) -> Result<(), PersistenceError> {
        let text = self.format.encode(store).map_err(PersistenceError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // Write a sibling file and rename it over the old one, so readers
        // never see a half-written history.
        let temp = self.temp_path();
        tokio::fs::write(&temp, text)
            .await
            .map_err(|source| PersistenceError::Io {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Conversation store shared across a session's tasks, backed by a file.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    store: Arc<Mutex<ConversationStore>>,
    file: Arc<HistoryFile>,
}

impl SharedHistory {
    /// Empty history backed by `file`. Call [`load`](Self::load) to read it.
    pub fn new(file: HistoryFile) -> Self {
        Self {
            store: Arc::new(Mutex::new(ConversationStore::new())),
            file: Arc::new(file),
        }
    }

    /// Fill the in-memory store from the file.
    ///
    /// Only an empty store is filled; once lines have been appended the file
    /// can lag behind memory (after a failed save), so replacing it would
    /// lose them. The lock is held across the read, so no append can land
    /// in between. Returns the number of conversations loaded. On error the
    /// store is left as it was.
    pub async fn load(&self) -> Result<usize, PersistenceError> {
        let mut store = self.store.lock().await;
        if !store.is_empty() {
            return Err(PersistenceError::WouldDiscard {
                lines: store.total_lines(),
            });
        }
        let decoded = self.file.load().await?;
        let count = decoded.store.len();
        *store = decoded.store;
        tracing::info!(
            "Loaded {} conversations from {}",
            count,
            self.file.path().display()
        );
        Ok(count)
    }

    /// Append a line and persist, as one critical section.
    ///
    /// A failed save does not undo the append: the line stays in memory and
    /// goes out with the next successful save.
    pub async fn add_message(
        &self,
        sender: &Identity,
        receiver: &Identity,
        content: &str,
    ) -> Result<ConversationKey, PersistenceError> {
        let mut store = self.store.lock().await;
        let key = store.add_message(sender, receiver, content);
        if let Err(e) = self.file.save(&store).await {
            tracing::error!("Failed to persist history: {}", e);
            return Err(e);
        }
        Ok(key)
    }

    /// Append a [`Message`] and persist.
    pub async fn record(&self, message: &Message) -> Result<ConversationKey, PersistenceError> {
        self.add_message(&message.sender, &message.receiver, &message.content)
            .await
    }

    /// Write the current store out.
    pub async fn persist(&self) -> Result<(), PersistenceError> {
        let store = self.store.lock().await;
        self.file.save(&store).await
    }

    /// The conversation between `a` and `b`, one line per message.
    pub async fn conversation_history(&self, a: &Identity, b: &Identity) -> String {
        self.store.lock().await.conversation_history(a, b)
    }

    /// A copy of the whole store.
    pub async fn snapshot(&self) -> ConversationStore {
        self.store.lock().await.clone()
    }

    /// The backing file.
    pub fn file(&self) -> &HistoryFile {
        &self.file
    }
}
