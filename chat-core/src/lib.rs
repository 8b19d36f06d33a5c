//! # peerchat-core
//!
//! Pure logic for peerchat (no I/O, instant tests).
//!
//! This crate holds the conversation store, the history file codecs, the
//! discovery retry policy, the send gate and the session start-up state
//! machine. None of it touches the network or the disk.
//!
//! `peerchat-client` owns the I/O: it reads and writes the history file,
//! talks to the directory and the transport, and interprets the actions the
//! state machine produces.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod gate;
pub mod retry;
pub mod state;
pub mod store;

pub use codec::{CodecError, Decoded, HistoryFormat};
pub use gate::{SendGate, SendPermit};
pub use retry::{RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
pub use state::{Action, Event, SessionState, Stage, StartupWarning};
pub use store::ConversationStore;
