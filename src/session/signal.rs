//! External close signal for a running session.
//!
//! [`CloseHandle`] is held by whoever owns the session's lifetime (the
//! window, a Ctrl-C handler); [`CloseSignal`] is handed to
//! [`Orchestrator::run`](super::Orchestrator::run).  Closing is sticky:
//! once fired, every current and future wait completes immediately.

use std::sync::Arc;

use tokio::sync::watch;

/// Create a connected handle/signal pair.
pub fn close_signal() -> (CloseHandle, CloseSignal) {
    let (tx, rx) = watch::channel(false);
    (CloseHandle { tx: Arc::new(tx) }, CloseSignal { rx })
}

/// Fires the close signal.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    /// Request the session to stop.  Idempotent.
    pub fn close(&self) {
        if !self.tx.send_replace(true) {
            log::debug!("session: close requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Waits for the close signal.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<bool>,
}

impl CloseSignal {
    /// Resolve once [`CloseHandle::close`] has been called.
    ///
    /// Cancel-safe, so it can sit in a `select!` loop.  If every handle is
    /// dropped without closing, this never resolves.
    pub async fn closed(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
