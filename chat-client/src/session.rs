//! ChatSession - one running chat peer.
//!
//! Ties a [`DirectoryClient`], a [`MessageBus`] and a [`SharedHistory`]
//! together and exposes the operations a presentation layer needs. Output
//! for the UI goes out on an unbounded channel of [`UiEvent`]s.
//!
//! Start-up is driven by the pure [`SessionState`] machine: every action it
//! asks for is executed here and its outcome fed back as an event. Failures
//! during start-up are logged and skipped, so `start` always ends with an
//! active session and a running receive loop.

use peerchat_core::{Action, Event, SessionState, StartupWarning};
use peerchat_types::{Identity, Message};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bus::{MessageBus, SendError};
use crate::config::ChatConfig;
use crate::directory::Directory;
use crate::discovery::{DirectoryClient, DiscoveryError, RegistrationError};
use crate::history::{PersistenceError, SharedHistory};
use crate::transport::{Transport, TransportError};

/// Pause after a failed mailbox read before polling again.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Sending failed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Registration failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Discovery gave up.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Reading or writing history failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Output for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A line for the message display.
    Display(String),
    /// A full conversation, replacing whatever is shown for `peer`.
    History {
        /// The other participant.
        peer: Identity,
        /// The conversation, one line per message.
        text: String,
    },
}

/// A running chat peer.
pub struct ChatSession<D: Directory, T: Transport> {
    identity: Identity,
    directory: DirectoryClient<D>,
    bus: Arc<MessageBus<T>>,
    history: SharedHistory,
    state: SessionState,
    ui: mpsc::UnboundedSender<UiEvent>,
    receive_loop: Option<JoinHandle<()>>,
}

impl<D, T> ChatSession<D, T>
where
    D: Directory + 'static,
    T: Transport + 'static,
{
    /// Bring a session up.
    ///
    /// Loads history, registers, runs a first discovery and spawns the
    /// receive loop. None of these steps is fatal. Must be called from within
    /// a tokio runtime.
    pub async fn start(
        config: ChatConfig,
        directory: D,
        transport: T,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (ui, ui_rx) = mpsc::unbounded_channel();
        let identity = config.identity.clone();

        let mut session = Self {
            identity: identity.clone(),
            directory: DirectoryClient::with_policy(directory, identity.clone(), config.retry),
            bus: Arc::new(MessageBus::new(identity, transport)),
            history: SharedHistory::new(config.history_file()),
            state: SessionState::default(),
            ui,
            receive_loop: None,
        };

        let (mut state, actions) = SessionState::start();
        let mut pending: VecDeque<Action> = actions.into();

        while let Some(action) = pending.pop_front() {
            if let Some(event) = session.execute(action).await {
                let (next, actions) = state.on_event(event);
                state = next;
                pending.extend(actions);
            }
        }

        session.state = state;
        tracing::info!("Session for {} is {:?}", session.identity, session.state);

        (session, ui_rx)
    }

    async fn execute(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::LoadHistory => Some(match self.history.load().await {
                Ok(conversations) => Event::HistoryLoaded { conversations },
                Err(e) => Event::HistoryLoadFailed {
                    error: e.to_string(),
                },
            }),
            Action::Register => Some(match self.directory.register().await {
                Ok(()) => Event::Registered,
                Err(e) => Event::RegistrationFailed {
                    error: e.to_string(),
                },
            }),
            Action::Discover => {
                let peers = self.directory.discover().await;
                Some(Event::PeersDiscovered { count: peers.len() })
            }
            Action::StartReceiveLoop => {
                self.receive_loop = Some(tokio::spawn(receive_loop(
                    Arc::clone(&self.bus),
                    self.history.clone(),
                    self.ui.clone(),
                )));
                Some(Event::ReceiveLoopStarted)
            }
            Action::Warn(StartupWarning::HistoryUnavailable { error }) => {
                tracing::warn!("Starting with empty history: {}", error);
                None
            }
            Action::Warn(StartupWarning::Unregistered { error }) => {
                tracing::warn!("Continuing unregistered: {}", error);
                None
            }
        }
    }

    /// Send `content` to `recipient`.
    ///
    /// On success the line is recorded under our own name, then shown as
    /// `"You: <content>"`. Nothing is recorded if the send fails. A history write
    /// failure after a successful send is logged, not returned.
    pub async fn send_message_from_ui(
        &self,
        content: &str,
        recipient: &Identity,
    ) -> Result<Message, SessionError> {
        let message = self.bus.send(content, recipient).await?;

        // Failure already logged by SharedHistory.
        let _ = self.history.record(&message).await;
        self.emit(UiEvent::Display(format!("You: {}", message.content)));

        Ok(message)
    }

    /// Every registered identity, ourselves included. Empty if the directory
    /// stayed unreachable.
    pub async fn get_all_agents(&self) -> Vec<Identity> {
        self.directory.discover().await
    }

    /// Every registered identity except ourselves.
    pub async fn get_peers(&self) -> Vec<Identity> {
        self.get_all_agents()
            .await
            .into_iter()
            .filter(|id| *id != self.identity)
            .collect()
    }

    /// Like [`get_all_agents`](Self::get_all_agents), but reports exhaustion.
    pub async fn try_get_all_agents(&self) -> Result<Vec<Identity>, SessionError> {
        Ok(self.directory.try_discover().await?)
    }

    /// Our conversation with `recipient`, one line per message.
    pub async fn get_conversation_history(&self, recipient: &Identity) -> String {
        self.history
            .conversation_history(&self.identity, recipient)
            .await
    }

    /// Push our conversation with `recipient` to the UI.
    pub async fn update_conversation_history(&self, recipient: &Identity) {
        let text = self.get_conversation_history(recipient).await;
        self.emit(UiEvent::History {
            peer: recipient.clone(),
            text,
        });
    }

    /// Try registering again, e.g. after a failed start-up registration.
    pub async fn register(&self) -> Result<(), SessionError> {
        Ok(self.directory.register().await?)
    }

    /// Stop the receive loop. Messages still in the mailbox are left there.
    pub fn shutdown(&self) {
        if let Some(handle) = &self.receive_loop {
            handle.abort();
            tracing::info!("Session for {} shut down", self.identity);
        }
    }

    /// Check if the receive loop is still running.
    pub fn is_running(&self) -> bool {
        self.receive_loop
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Our identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The session's history.
    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Get a reference to the directory client (for testing).
    pub fn directory(&self) -> &DirectoryClient<D> {
        &self.directory
    }

    /// Get a reference to the message bus (for testing).
    pub fn bus(&self) -> &MessageBus<T> {
        &self.bus
    }

    fn emit(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            tracing::debug!("UI receiver dropped, event discarded");
        }
    }
}

impl<D: Directory, T: Transport> Drop for ChatSession<D, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.receive_loop.take() {
            handle.abort();
        }
    }
}

/// Take messages off the bus until the mailbox closes.
///
/// Each message is recorded first and then shown, so by the time the UI sees
/// a line the history already contains it.
async fn receive_loop<T: Transport>(
    bus: Arc<MessageBus<T>>,
    history: SharedHistory,
    ui: mpsc::UnboundedSender<UiEvent>,
) {
    tracing::debug!("Receive loop started for {}", bus.identity());

    loop {
        match bus.next_message().await {
            Ok(message) => {
                // Filed under our own identity, whatever the frame claims.
                // Failure already logged by SharedHistory.
                let _ = history
                    .add_message(&message.sender, bus.identity(), &message.content)
                    .await;
                if ui.send(UiEvent::Display(message.history_line())).is_err() {
                    tracing::debug!("UI receiver dropped, event discarded");
                }
            }
            Err(TransportError::Closed) => {
                tracing::info!("Mailbox for {} closed, receive loop exiting", bus.identity());
                break;
            }
            Err(e) => {
                tracing::warn!("Receive failed: {}", e);
                tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MockDirectory;
    use crate::transport::MockTransport;
    use peerchat_core::RetryPolicy;
    use tempfile::TempDir;

    type TestSession = ChatSession<MockDirectory, MockTransport>;

    struct Fixture {
        _dir: TempDir,
        config: ChatConfig,
        directory: MockDirectory,
        transport: MockTransport,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = ChatConfig::new("alice", dir.path().join("alice.json"))
                .with_retry(RetryPolicy::new(3, Duration::from_millis(5)));
            Self {
                _dir: dir,
                config,
                directory: MockDirectory::new(),
                transport: MockTransport::new(),
            }
        }

        async fn start(&self) -> (TestSession, mpsc::UnboundedReceiver<UiEvent>) {
            ChatSession::start(
                self.config.clone(),
                self.directory.clone(),
                self.transport.clone(),
            )
            .await
        }
    }

    fn frame(from: &str, to: &str, content: &str) -> Vec<u8> {
        Message::new(from.into(), to.into(), content)
            .to_bytes()
            .unwrap()
    }

    async fn next_event(ui: &mut mpsc::UnboundedReceiver<UiEvent>) -> UiEvent {
        tokio::time::timeout(Duration::from_secs(1), ui.recv())
            .await
            .expect("timed out waiting for UI event")
            .expect("UI channel closed")
    }

    // ===========================================
    // Start-up Tests
    // ===========================================

    #[tokio::test]
    async fn start_registers_and_becomes_active() {
        let fx = Fixture::new();
        let (session, _ui) = fx.start().await;

        assert!(session.state().is_active());
        assert!(session.is_running());
        assert_eq!(fx.directory.registered(), vec![Identity::from("alice")]);
        assert_eq!(fx.directory.search_calls(), 1);
    }

    #[tokio::test]
    async fn start_survives_failed_registration() {
        let fx = Fixture::new();
        fx.directory.fail_next_register("rejected");

        let (session, _ui) = fx.start().await;

        assert!(session.state().is_active());
        assert!(fx.directory.registered().is_empty());

        session.register().await.unwrap();
        assert_eq!(fx.directory.registered(), vec![Identity::from("alice")]);
    }

    #[tokio::test]
    async fn start_survives_unreachable_directory() {
        let fx = Fixture::new();
        for _ in 0..3 {
            fx.directory.fail_search("down");
        }

        let (session, _ui) = fx.start().await;

        assert!(session.state().is_active());
        assert_eq!(fx.directory.search_calls(), 3);
    }

    #[tokio::test]
    async fn start_survives_corrupt_history() {
        let fx = Fixture::new();
        std::fs::write(&fx.config.history_path, "not json").unwrap();

        let (session, _ui) = fx.start().await;

        assert!(session.state().is_active());
        assert_eq!(session.get_conversation_history(&"bob".into()).await, "");
    }

    #[tokio::test]
    async fn start_loads_existing_history() {
        let fx = Fixture::new();
        {
            let (session, _ui) = fx.start().await;
            session
                .send_message_from_ui("hi", &"bob".into())
                .await
                .unwrap();
            session.shutdown();
        }

        let (session, _ui) = fx.start().await;
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "alice: hi\n"
        );
    }

    // ===========================================
    // Send Tests
    // ===========================================

    #[tokio::test]
    async fn send_displays_and_records() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;

        let sent = session
            .send_message_from_ui("hi", &"bob".into())
            .await
            .unwrap();

        assert_eq!(sent.receiver, Identity::from("bob"));
        assert_eq!(next_event(&mut ui).await, UiEvent::Display("You: hi".into()));
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "alice: hi\n"
        );
        assert_eq!(fx.transport.delivered().len(), 1);
    }

    #[tokio::test]
    async fn sent_line_is_in_history_once_displayed() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;
        let session = Arc::new(session);

        let sender = Arc::clone(&session);
        let send = tokio::spawn(async move {
            sender.send_message_from_ui("hi", &"bob".into()).await
        });

        assert_eq!(next_event(&mut ui).await, UiEvent::Display("You: hi".into()));
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "alice: hi\n"
        );
        send.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_send_records_nothing() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;
        fx.transport.fail_next_deliver("no such mailbox");

        let result = session.send_message_from_ui("hi", &"bob".into()).await;

        assert!(matches!(
            result,
            Err(SessionError::Send(SendError::Transport(_)))
        ));
        assert_eq!(session.get_conversation_history(&"bob".into()).await, "");
        assert!(ui.try_recv().is_err());
        assert!(session.bus().can_send());
    }

    #[tokio::test]
    async fn send_guards_reject_before_delivery() {
        let fx = Fixture::new();
        let (session, _ui) = fx.start().await;

        assert!(matches!(
            session.send_message_from_ui("hi", &Identity::new("")).await,
            Err(SessionError::Send(SendError::NoRecipient))
        ));
        assert!(matches!(
            session.send_message_from_ui("", &"bob".into()).await,
            Err(SessionError::Send(SendError::EmptyContent))
        ));
        assert!(matches!(
            session.send_message_from_ui("me", &"alice".into()).await,
            Err(SessionError::Send(SendError::SelfAddressed))
        ));
        assert!(fx.transport.delivered().is_empty());
    }

    // ===========================================
    // Receive Loop Tests
    // ===========================================

    #[tokio::test]
    async fn incoming_message_is_recorded_then_displayed() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;

        fx.transport.queue_inbound(frame("bob", "alice", "yo"));

        assert_eq!(next_event(&mut ui).await, UiEvent::Display("bob: yo".into()));
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "bob: yo\n"
        );
    }

    #[tokio::test]
    async fn incoming_message_is_filed_under_our_identity() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;

        fx.transport.queue_inbound(frame("bob", "someone-else", "yo"));

        assert_eq!(next_event(&mut ui).await, UiEvent::Display("bob: yo".into()));
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "bob: yo\n"
        );
        assert_eq!(
            session.get_conversation_history(&"someone-else".into()).await,
            ""
        );
    }

    #[tokio::test]
    async fn receive_loop_survives_bad_frames_and_poll_errors() {
        let fx = Fixture::new();
        let (_session, mut ui) = fx.start().await;

        fx.transport.fail_next_poll("transient");
        fx.transport.queue_inbound(b"junk".to_vec());
        fx.transport.queue_inbound(frame("bob", "alice", "still here"));

        assert_eq!(
            next_event(&mut ui).await,
            UiEvent::Display("bob: still here".into())
        );
    }

    #[tokio::test]
    async fn closed_mailbox_ends_receive_loop() {
        let fx = Fixture::new();
        let (session, _ui) = fx.start().await;

        fx.transport.close();

        tokio::time::timeout(Duration::from_secs(1), async {
            while session.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("receive loop should exit");
    }

    #[tokio::test]
    async fn shutdown_stops_receiving() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;

        session.shutdown();
        tokio::time::timeout(Duration::from_secs(1), async {
            while session.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("receive loop should stop");

        fx.transport.queue_inbound(frame("bob", "alice", "too late"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(ui.try_recv().is_err());
        assert_eq!(session.get_conversation_history(&"bob".into()).await, "");
    }

    // ===========================================
    // Query Tests
    // ===========================================

    #[tokio::test]
    async fn no_peers_means_empty_agent_list() {
        let fx = Fixture::new();
        let (session, _ui) = fx.start().await;
        fx.directory.succeed_search(&[]);

        assert!(session.get_all_agents().await.is_empty());
    }

    #[tokio::test]
    async fn peers_exclude_ourselves() {
        let fx = Fixture::new();
        fx.directory.succeed_search(&["alice"]);
        let (session, _ui) = fx.start().await;

        fx.directory.succeed_search(&["alice", "bob", "carol"]);
        assert_eq!(
            session.get_peers().await,
            vec![Identity::from("bob"), Identity::from("carol")]
        );
    }

    #[tokio::test]
    async fn try_get_all_agents_reports_exhaustion() {
        let fx = Fixture::new();
        let (session, _ui) = fx.start().await;
        for _ in 0..3 {
            fx.directory.fail_search("down");
        }

        assert!(matches!(
            session.try_get_all_agents().await,
            Err(SessionError::Discovery(_))
        ));
    }

    #[tokio::test]
    async fn update_conversation_history_pushes_full_log() {
        let fx = Fixture::new();
        let (session, mut ui) = fx.start().await;
        fx.transport.queue_inbound(frame("bob", "alice", "yo"));
        next_event(&mut ui).await;
        session
            .send_message_from_ui("hi", &"bob".into())
            .await
            .unwrap();
        next_event(&mut ui).await;

        session.update_conversation_history(&"bob".into()).await;

        assert_eq!(
            next_event(&mut ui).await,
            UiEvent::History {
                peer: "bob".into(),
                text: "bob: yo\nalice: hi\n".into(),
            }
        );
    }
}
