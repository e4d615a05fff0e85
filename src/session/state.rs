//! Session state machine.
//!
//! ```text
//! Idle ──run()──▶ Running ──close signal / inputs exhausted / chain error──▶ ShuttingDown
//! ```
//!
//! `ShuttingDown` is terminal: once every producer has been asked to stop
//! and has acknowledged, `run()` returns.

/// Lifecycle phase of an [`Orchestrator`](super::Orchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Built but not started.
    #[default]
    Idle,

    /// Producers are active and the consume loop is polling.
    Running,

    /// Stop has been requested; producers are being stopped.
    ShuttingDown,
}

impl SessionState {
    /// `true` while updates can still reach the chain.
    ///
    /// ```
    /// use treadmill_monitor::session::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_running());
    /// assert!(SessionState::Running.is_running());
    /// assert!(!SessionState::ShuttingDown.is_running());
    /// ```
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    /// Short label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Running => "Running",
            SessionState::ShuttingDown => "Shutting down",
        }
    }
}
