//! Session start-up state machine.
//!
//! A session is either still initializing or active. Initialization walks
//! through fixed stages (load history, register, discover, start the receive
//! loop); failures along the way are reported but never stop the walk, so
//! the transition to [`SessionState::Active`] is unconditional and one-way.
//!
//! Like the rest of this crate it performs no I/O: the caller feeds events
//! in and executes the actions that come out.

/// Where a session is in its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Start-up in progress.
    Initializing {
        /// The step currently being performed.
        stage: Stage,
    },
    /// Receive loop running, send and query calls accepted.
    Active,
}

/// Start-up steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the history file.
    LoadingHistory,
    /// Announcing ourselves to the directory.
    Registering,
    /// First peer lookup.
    Discovering,
    /// Spawning the receive loop.
    StartingReceiver,
}

/// Something that happened during start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// History file read (or absent).
    HistoryLoaded {
        /// Number of conversations restored.
        conversations: usize,
    },
    /// History file could not be read; starting empty.
    HistoryLoadFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Directory accepted our registration.
    Registered,
    /// Directory registration failed.
    RegistrationFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// First discovery finished.
    PeersDiscovered {
        /// Number of peers found (zero on failure).
        count: usize,
    },
    /// Receive loop is running.
    ReceiveLoopStarted,
}

/// Work for the caller to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the history file into the store.
    LoadHistory,
    /// Register our identity with the directory.
    Register,
    /// Run discovery once.
    Discover,
    /// Spawn the receive loop.
    StartReceiveLoop,
    /// Surface a non-fatal problem.
    Warn(StartupWarning),
}

/// Non-fatal start-up problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupWarning {
    /// Continuing with an empty history.
    HistoryUnavailable {
        /// Error message describing the failure.
        error: String,
    },
    /// Continuing unregistered; other peers will not find us.
    Unregistered {
        /// Error message describing the failure.
        error: String,
    },
}

impl SessionState {
    /// A fresh session and the first action to run.
    pub fn start() -> (Self, Vec<Action>) {
        (
            Self::Initializing {
                stage: Stage::LoadingHistory,
            },
            vec![Action::LoadHistory],
        )
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        use Stage::*;

        match (self, event) {
            (Self::Initializing { stage: LoadingHistory }, Event::HistoryLoaded { .. }) => {
                (Self::at(Registering), vec![Action::Register])
            }
            (Self::Initializing { stage: LoadingHistory }, Event::HistoryLoadFailed { error }) => (
                Self::at(Registering),
                vec![
                    Action::Warn(StartupWarning::HistoryUnavailable { error }),
                    Action::Register,
                ],
            ),

            (Self::Initializing { stage: Registering }, Event::Registered) => {
                (Self::at(Discovering), vec![Action::Discover])
            }
            (Self::Initializing { stage: Registering }, Event::RegistrationFailed { error }) => (
                Self::at(Discovering),
                vec![
                    Action::Warn(StartupWarning::Unregistered { error }),
                    Action::Discover,
                ],
            ),

            (Self::Initializing { stage: Discovering }, Event::PeersDiscovered { .. }) => {
                (Self::at(StartingReceiver), vec![Action::StartReceiveLoop])
            }

            (Self::Initializing { stage: StartingReceiver }, Event::ReceiveLoopStarted) => {
                (Self::Active, vec![])
            }

            // Out-of-order events - stay put
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the receive loop is running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    fn at(stage: Stage) -> Self {
        Self::Initializing { stage }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::start().0
    }
}
