//! # peerchat-types
//!
//! Foundational types shared by every peerchat crate:
//! - [`Identity`] - opaque peer name, unique within a directory
//! - [`ConversationKey`] - canonical unordered pair of identities
//! - [`Message`] - a single text message and its wire encoding
//! - [`TypesError`] - encoding errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod message;

pub use error::TypesError;
pub use ids::{ConversationKey, Identity, KEY_SEPARATOR};
pub use message::Message;
