//! Transport abstraction for peerchat.
//!
//! The transport moves opaque frames into named mailboxes. peerchat does not
//! own the platform behind it; it only needs:
//! - `deliver()` to drop a frame into another identity's mailbox
//! - `poll()` to take the next frame from our own mailbox without blocking
//! - `wait_for_delivery()` to sleep until something arrives
//!
//! Delivery is best effort and unacknowledged.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.deliver(&"bob".into(), frame).await?;
//! let next = transport.poll()?;
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use peerchat_types::Identity;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No mailbox exists for the recipient.
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),

    /// Delivery failed.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// Reading our own mailbox failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Our mailbox has been torn down.
    #[error("mailbox closed")]
    Closed,
}

/// Mailbox transport for sending and receiving message frames.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Put a frame into `to`'s mailbox.
    async fn deliver(&self, to: &Identity, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Take the next frame from our mailbox, or `None` if it is empty.
    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Resolve once a frame may be available.
    ///
    /// Spurious wake-ups are allowed; a delivery that lands between an empty
    /// `poll()` and this call must not be missed.
    async fn wait_for_delivery(&self);
}
