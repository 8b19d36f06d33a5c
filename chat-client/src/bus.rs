//! MessageBus - sending and receiving chat messages over a [`Transport`].
//!
//! Sends are best effort and unacknowledged. Only one send may be in flight
//! at a time; a concurrent second send is rejected rather than queued.
//! Frames are MessagePack-encoded [`Message`]s. A frame that fails to decode
//! is logged and skipped.

use peerchat_core::SendGate;
use peerchat_types::{Identity, Message, TypesError};
use thiserror::Error;

use crate::transport::{Transport, TransportError};

/// Reasons a send did not go out.
#[derive(Debug, Error)]
pub enum SendError {
    /// Another send is still outstanding.
    #[error("a send is already in flight")]
    InFlight,

    /// No recipient selected.
    #[error("no recipient selected")]
    NoRecipient,

    /// Nothing to send.
    #[error("message is empty")]
    EmptyContent,

    /// Recipient is ourselves.
    #[error("cannot send a message to yourself")]
    SelfAddressed,

    /// Frame encoding failed.
    #[error("encode error: {0}")]
    Encode(#[from] TypesError),

    /// The transport refused the frame.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Message bus for one identity.
pub struct MessageBus<T: Transport> {
    identity: Identity,
    transport: T,
    gate: SendGate,
}

impl<T: Transport> MessageBus<T> {
    /// Create a bus sending as `identity`.
    pub fn new(identity: Identity, transport: T) -> Self {
        Self {
            identity,
            transport,
            gate: SendGate::new(),
        }
    }

    /// Send `content` to `to`.
    ///
    /// Returns the message that was handed to the transport. The gate is
    /// released when this returns, whatever the outcome.
    pub async fn send(&self, content: &str, to: &Identity) -> Result<Message, SendError> {
        if to.is_empty() {
            return Err(SendError::NoRecipient);
        }
        if content.is_empty() {
            return Err(SendError::EmptyContent);
        }
        if *to == self.identity {
            return Err(SendError::SelfAddressed);
        }

        let _permit = self.gate.try_acquire().ok_or(SendError::InFlight)?;

        let message = Message::new(self.identity.clone(), to.clone(), content);
        let frame = message.to_bytes()?;
        tracing::debug!("Sending {} bytes to {}", frame.len(), to);
        self.transport.deliver(to, frame).await?;

        Ok(message)
    }

    /// Take the next decodable message from our mailbox without blocking.
    ///
    /// Returns `Ok(None)` once the mailbox is empty.
    pub fn receive(&self) -> Result<Option<Message>, TransportError> {
        while let Some(frame) = self.transport.poll()? {
            match Message::from_bytes(&frame) {
                Ok(message) => {
                    tracing::debug!("Received message from {}", message.sender);
                    return Ok(Some(message));
                }
                Err(e) => {
                    tracing::warn!("Dropping undecodable frame ({} bytes): {}", frame.len(), e);
                }
            }
        }
        Ok(None)
    }

    /// Wait for the next message.
    ///
    /// Suspends on the transport's delivery notification while the mailbox
    /// is empty. Errors from the transport are returned as-is.
    pub async fn next_message(&self) -> Result<Message, TransportError> {
        loop {
            if let Some(message) = self.receive()? {
                return Ok(message);
            }
            self.transport.wait_for_delivery().await;
        }
    }

    /// The identity messages are sent as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Check whether a send could start right now.
    pub fn can_send(&self) -> bool {
        self.gate.is_open()
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
