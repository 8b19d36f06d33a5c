//! Mock directory for testing.
//!
//! Registrations are recorded; searches either pop a scripted outcome or,
//! when nothing is scripted, return everyone registered so far.

use super::{Directory, DirectoryError};
use async_trait::async_trait;
use peerchat_types::Identity;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock directory for testing.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    inner: Arc<Mutex<MockDirectoryInner>>,
}

#[derive(Debug, Default)]
struct MockDirectoryInner {
    registered: Vec<Identity>,
    scripted: VecDeque<Result<Vec<Identity>, DirectoryError>>,
    fail_next_register: Option<String>,
    search_calls: usize,
}

impl MockDirectory {
    /// Create a new, empty mock directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock directory with identities already registered.
    pub fn with_peers(peers: &[&str]) -> Self {
        let directory = Self::new();
        {
            let mut inner = directory.inner.lock().unwrap();
            inner.registered = peers.iter().map(|p| Identity::from(*p)).collect();
        }
        directory
    }

    /// Queue a failing search.
    pub fn fail_search(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .scripted
            .push_back(Err(DirectoryError::Unreachable(error.to_string())));
    }

    /// Queue a successful search returning exactly `peers`.
    pub fn succeed_search(&self, peers: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .scripted
            .push_back(Ok(peers.iter().map(|p| Identity::from(*p)).collect()));
    }

    /// Cause the next register() to fail with the given error.
    pub fn fail_next_register(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_register = Some(error.to_string());
    }

    /// Identities registered so far.
    pub fn registered(&self) -> Vec<Identity> {
        let inner = self.inner.lock().unwrap();
        inner.registered.clone()
    }

    /// Number of search() calls made.
    pub fn search_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.search_calls
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn register(&self, identity: &Identity) -> Result<(), DirectoryError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_register.take() {
            return Err(DirectoryError::Unreachable(error));
        }

        if !inner.registered.contains(identity) {
            inner.registered.push(identity.clone());
        }
        Ok(())
    }

    async fn search(&self) -> Result<Vec<Identity>, DirectoryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.search_calls += 1;

        let scripted = inner.scripted.pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(inner.registered.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_returns_registered_by_default() {
        let directory = MockDirectory::with_peers(&["bob"]);
        directory.register(&"alice".into()).await.unwrap();

        let peers = directory.search().await.unwrap();
        assert_eq!(peers, vec![Identity::from("bob"), Identity::from("alice")]);
    }

    #[tokio::test]
    async fn scripted_outcomes_come_first_in_order() {
        let directory = MockDirectory::with_peers(&["bob"]);
        directory.fail_search("down");
        directory.succeed_search(&["carol"]);

        assert!(directory.search().await.is_err());
        assert_eq!(directory.search().await.unwrap(), vec![Identity::from("carol")]);
        assert_eq!(directory.search().await.unwrap(), vec![Identity::from("bob")]);
        assert_eq!(directory.search_calls(), 3);
    }

    #[tokio::test]
    async fn register_twice_is_idempotent() {
        let directory = MockDirectory::new();
        directory.register(&"alice".into()).await.unwrap();
        directory.register(&"alice".into()).await.unwrap();
        assert_eq!(directory.registered().len(), 1);
    }

    #[tokio::test]
    async fn forced_register_failure() {
        let directory = MockDirectory::new();
        directory.fail_next_register("no route");

        let result = directory.register(&"alice".into()).await;
        assert!(matches!(result, Err(DirectoryError::Unreachable(_))));
        assert!(directory.registered().is_empty());
    }
}
