//! Mock transport for testing.
//!
//! Allows queueing inbound frames and capturing delivered ones for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use peerchat_types::Identity;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    arrived: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    delivered: Vec<(Identity, Vec<u8>)>,
    inbox: VecDeque<Vec<u8>>,
    fail_next_deliver: Option<String>,
    fail_next_poll: Option<String>,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
            arrived: Arc::new(Notify::new()),
        }
    }

    /// Queue an inbound frame for the next `poll()`.
    pub fn queue_inbound(&self, frame: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.inbox.push_back(frame);
        drop(inner);
        self.arrived.notify_one();
    }

    /// Every frame delivered so far, with its recipient.
    pub fn delivered(&self) -> Vec<(Identity, Vec<u8>)> {
        let inner = self.inner.lock().unwrap();
        inner.delivered.clone()
    }

    /// Cause the next deliver() to fail with the given error.
    pub fn fail_next_deliver(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_deliver = Some(error.to_string());
    }

    /// Cause the next poll() to fail with the given error.
    pub fn fail_next_poll(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_poll = Some(error.to_string());
    }

    /// Tear down the mailbox: every later poll() returns `Closed`.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.arrived.notify_one();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(&self, to: &Identity, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_deliver.take() {
            return Err(TransportError::DeliveryFailed(error));
        }

        inner.delivered.push((to.clone(), frame));
        Ok(())
    }

    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(TransportError::Closed);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_poll.take() {
            return Err(TransportError::ReceiveFailed(error));
        }

        Ok(inner.inbox.pop_front())
    }

    async fn wait_for_delivery(&self) {
        self.arrived.notified().await;
    }
}
