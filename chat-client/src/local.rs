//! In-process directory and mailbox platform.
//!
//! [`LocalHub`] plays both external collaborators for peers living in the
//! same process: a registry of identities and one mailbox per identity.
//! Each peer gets a [`LocalEndpoint`], which implements [`Directory`] and
//! [`Transport`] against the shared hub.
//!
//! Used by the CLI and by integration tests. Lifecycle of the peers (spawning
//! them, killing them) stays with whoever owns the hub.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use peerchat_types::Identity;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::directory::{Directory, DirectoryError};
use crate::transport::{Transport, TransportError};

/// Shared in-process registry and mailboxes.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

#[derive(Debug, Default)]
struct HubInner {
    registered: DashSet<Identity>,
    mailboxes: DashMap<Identity, Arc<Mailbox>>,
    directory_down: AtomicBool,
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Vec<u8>>>,
    arrived: Notify,
    closed: AtomicBool,
}

impl Mailbox {
    fn push(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.queue
            .lock()
            .map_err(|_| TransportError::DeliveryFailed("mailbox poisoned".into()))?
            .push_back(frame);
        self.arrived.notify_one();
        Ok(())
    }

    fn pop(&self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| TransportError::ReceiveFailed("mailbox poisoned".into()))?;
        Ok(queue.pop_front())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.arrived.notify_one();
    }
}

impl LocalHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) the mailbox for `identity` and return its endpoint.
    ///
    /// Opening a mailbox does not register the identity in the directory;
    /// that is the session's job.
    pub fn endpoint(&self, identity: impl Into<Identity>) -> LocalEndpoint {
        let identity = identity.into();
        let mailbox = Arc::new(Mailbox::default());
        self.inner
            .mailboxes
            .insert(identity.clone(), Arc::clone(&mailbox));
        tracing::debug!("Opened mailbox for {}", identity);
        LocalEndpoint {
            hub: self.clone(),
            identity,
            mailbox,
        }
    }

    /// Make every directory call fail (or succeed again).
    pub fn set_directory_available(&self, available: bool) {
        self.inner
            .directory_down
            .store(!available, Ordering::Release);
    }

    /// Unregister `identity` and close its mailbox.
    ///
    /// Frames still queued are discarded.
    pub fn kill(&self, identity: &Identity) {
        self.inner.registered.remove(identity);
        if let Some((_, mailbox)) = self.inner.mailboxes.remove(identity) {
            mailbox.close();
        }
        tracing::info!("Killed {}", identity);
    }

    /// Identities currently registered, sorted.
    pub fn registered(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self
            .inner
            .registered
            .iter()
            .map(|id| id.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn check_directory(&self) -> Result<(), DirectoryError> {
        if self.inner.directory_down.load(Ordering::Acquire) {
            Err(DirectoryError::Unreachable("local directory offline".into()))
        } else {
            Ok(())
        }
    }
}

/// One peer's view of a [`LocalHub`].
#[derive(Debug, Clone)]
pub struct LocalEndpoint {
    hub: LocalHub,
    identity: Identity,
    mailbox: Arc<Mailbox>,
}

impl LocalEndpoint {
    /// The identity whose mailbox this endpoint reads.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The hub this endpoint belongs to.
    pub fn hub(&self) -> &LocalHub {
        &self.hub
    }
}

#[async_trait]
impl Directory for LocalEndpoint {
    async fn register(&self, identity: &Identity) -> Result<(), DirectoryError> {
        self.hub.check_directory()?;
        self.hub.inner.registered.insert(identity.clone());
        Ok(())
    }

    async fn search(&self) -> Result<Vec<Identity>, DirectoryError> {
        self.hub.check_directory()?;
        Ok(self.hub.registered())
    }
}

#[async_trait]
impl Transport for LocalEndpoint {
    async fn deliver(&self, to: &Identity, frame: Vec<u8>) -> Result<(), TransportError> {
        let mailbox = self
            .hub
            .inner
            .mailboxes
            .get(to)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TransportError::UnknownRecipient(to.to_string()))?;
        mailbox.push(frame)
    }

    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.mailbox.pop()
    }

    async fn wait_for_delivery(&self) {
        self.mailbox.arrived.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn frames_reach_the_named_mailbox() {
        let hub = LocalHub::new();
        let alice = hub.endpoint("alice");
        let bob = hub.endpoint("bob");

        alice.deliver(&"bob".into(), b"hi".to_vec()).await.unwrap();

        assert_eq!(bob.poll().unwrap(), Some(b"hi".to_vec()));
        assert!(alice.poll().unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_recipient_is_an_error() {
        let hub = LocalHub::new();
        let alice = hub.endpoint("alice");

        let result = alice.deliver(&"nobody".into(), vec![1]).await;
        assert!(matches!(result, Err(TransportError::UnknownRecipient(_))));
    }

    #[tokio::test]
    async fn directory_lists_registered_sorted() {
        let hub = LocalHub::new();
        let carol = hub.endpoint("carol");
        let alice = hub.endpoint("alice");

        assert!(alice.search().await.unwrap().is_empty());

        carol.register(carol.identity()).await.unwrap();
        alice.register(alice.identity()).await.unwrap();

        assert_eq!(
            alice.search().await.unwrap(),
            vec![Identity::from("alice"), Identity::from("carol")]
        );
    }

    #[tokio::test]
    async fn offline_directory_fails_both_calls() {
        let hub = LocalHub::new();
        let alice = hub.endpoint("alice");
        hub.set_directory_available(false);

        assert!(alice.register(alice.identity()).await.is_err());
        assert!(alice.search().await.is_err());

        hub.set_directory_available(true);
        assert!(alice.search().await.is_ok());
    }

    #[tokio::test]
    async fn kill_closes_mailbox_and_unregisters() {
        let hub = LocalHub::new();
        let alice = hub.endpoint("alice");
        let bob = hub.endpoint("bob");
        bob.register(bob.identity()).await.unwrap();

        hub.kill(&"bob".into());

        assert!(hub.registered().is_empty());
        assert!(matches!(bob.poll(), Err(TransportError::Closed)));
        assert!(matches!(
            alice.deliver(&"bob".into(), vec![1]).await,
            Err(TransportError::UnknownRecipient(_))
        ));
    }

    #[tokio::test]
    async fn waiting_receiver_is_woken_by_delivery() {
        let hub = LocalHub::new();
        let alice = hub.endpoint("alice");
        let bob = hub.endpoint("bob");

        let waiter = {
            let bob = bob.clone();
            tokio::spawn(async move {
                bob.wait_for_delivery().await;
                bob.poll().unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        alice.deliver(&"bob".into(), b"wake".to_vec()).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver should wake")
            .unwrap();
        assert_eq!(frame, Some(b"wake".to_vec()));
    }
}
