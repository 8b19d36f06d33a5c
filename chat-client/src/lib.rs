//! # peerchat-client
//!
//! Client library for peerchat.
//!
//! Peers find each other through a shared directory, exchange short text
//! messages through per-identity mailboxes, and keep a persisted log of
//! every conversation.
//!
//! ## Features
//!
//! - **Discovery with retry**: fixed-delay retries, empty result on exhaustion
//! - **Single-in-flight sends**: one outstanding send per session
//! - **Persistent history**: full rewrite after every message, flat or JSON
//! - **Pluggable platform**: [`Directory`] and [`Transport`] traits, with
//!   mocks and an in-process [`LocalHub`]
//!
//! ## Example
//!
//! ```ignore
//! use peerchat_client::{ChatConfig, ChatSession, LocalHub};
//!
//! let hub = LocalHub::new();
//! let alice = hub.endpoint("alice");
//! let config = ChatConfig::new("alice", "alice_history.json");
//! let (session, mut ui) = ChatSession::start(config, alice.clone(), alice).await;
//!
//! session.send_message_from_ui("hi", &"bob".into()).await?;
//! while let Some(event) = ui.recv().await {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod config;
pub mod directory;
pub mod discovery;
pub mod history;
pub mod local;
pub mod session;
pub mod transport;

pub use bus::{MessageBus, SendError};
pub use config::ChatConfig;
pub use directory::{Directory, DirectoryError, MockDirectory};
pub use discovery::{DirectoryClient, DiscoveryError, RegistrationError};
pub use history::{HistoryFile, PersistenceError, SharedHistory};
pub use local::{LocalEndpoint, LocalHub};
pub use session::{ChatSession, SessionError, UiEvent};
pub use transport::{MockTransport, Transport, TransportError};
