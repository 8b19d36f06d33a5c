//! Directory abstraction for peerchat.
//!
//! The directory is the registry peers use to find each other. peerchat only
//! consumes two operations:
//! - `register()` announces an identity
//! - `search()` lists every identity currently registered
//!
//! Uniqueness of identities is the directory's concern.

mod mock;

pub use mock::MockDirectory;

use async_trait::async_trait;
use peerchat_types::Identity;
use thiserror::Error;

/// Directory errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached.
    #[error("directory unreachable: {0}")]
    Unreachable(String),

    /// The directory refused the request.
    #[error("directory rejected request: {0}")]
    Rejected(String),
}

/// Registry of peers.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Announce `identity` as present.
    async fn register(&self, identity: &Identity) -> Result<(), DirectoryError>;

    /// List every registered identity.
    async fn search(&self) -> Result<Vec<Identity>, DirectoryError>;
}
