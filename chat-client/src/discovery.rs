//! DirectoryClient - registration and peer discovery.
//!
//! Discovery retries a failing directory with a fixed delay between attempts
//! (see [`RetryPolicy`]). On the first success the cached snapshot is
//! replaced wholesale and returned. When every attempt fails,
//! [`DirectoryClient::discover`] returns an empty list: "the directory is
//! down" and "nobody is registered" look the same to the caller.
//! [`DirectoryClient::try_discover`] keeps the two apart for callers that care.
//!
//! The backoff is an async timer. A caller that must stay responsive should
//! spawn discovery rather than await it inline; dropping the future cancels
//! any remaining attempts.

use peerchat_core::RetryPolicy;
use peerchat_types::Identity;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::directory::{Directory, DirectoryError};

/// Registration failed. Not retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("registration of {identity} failed: {source}")]
pub struct RegistrationError {
    /// The identity we tried to register.
    pub identity: Identity,
    /// What the directory said.
    #[source]
    pub source: DirectoryError,
}

/// Discovery gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Every attempt failed.
    #[error("discovery failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: DirectoryError,
    },
}

/// Wraps a [`Directory`] with the retry policy and a peer snapshot cache.
pub struct DirectoryClient<D: Directory> {
    directory: D,
    identity: Identity,
    policy: RetryPolicy,
    snapshot: Arc<RwLock<Vec<Identity>>>,
}

impl<D: Directory> DirectoryClient<D> {
    /// Create a client for `identity` using the default retry policy.
    pub fn new(directory: D, identity: Identity) -> Self {
        Self::with_policy(directory, identity, RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    pub fn with_policy(directory: D, identity: Identity, policy: RetryPolicy) -> Self {
        Self {
            directory,
            identity,
            policy,
            snapshot: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Announce our identity to the directory. One attempt only.
    pub async fn register(&self) -> Result<(), RegistrationError> {
        match self.directory.register(&self.identity).await {
            Ok(()) => {
                tracing::info!("{} registered in directory", self.identity);
                Ok(())
            }
            Err(source) => {
                tracing::warn!("{} failed to register: {}", self.identity, source);
                Err(RegistrationError {
                    identity: self.identity.clone(),
                    source,
                })
            }
        }
    }

    /// List registered peers, or an empty list if the directory stayed
    /// unreachable for every attempt.
    pub async fn discover(&self) -> Vec<Identity> {
        match self.try_discover().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::error!("{}", e);
                Vec::new()
            }
        }
    }

    /// Like [`discover`](Self::discover) but reports exhaustion as an error.
    ///
    /// The cached snapshot is only touched on success.
    pub async fn try_discover(&self) -> Result<Vec<Identity>, DiscoveryError> {
        let attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            match self.directory.search().await {
                Ok(peers) => {
                    tracing::debug!(
                        "Discovery found {} peers (attempt {}/{})",
                        peers.len(),
                        attempt,
                        attempts
                    );
                    *self.snapshot.write().await = peers.clone();
                    return Ok(peers);
                }
                Err(e) => {
                    tracing::warn!("Discovery attempt {}/{} failed: {}", attempt, attempts, e);
                    match self.policy.delay_after(attempt) {
                        Some(delay) => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            return Err(DiscoveryError::Exhausted {
                                attempts: attempt,
                                last: e,
                            })
                        }
                    }
                }
            }
        }
    }

    /// The peers seen by the last successful discovery. May be stale.
    pub async fn snapshot(&self) -> Vec<Identity> {
        self.snapshot.read().await.clone()
    }

    /// Our own identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The retry policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Get a reference to the underlying directory (for testing).
    pub fn directory(&self) -> &D {
        &self.directory
    }
}
