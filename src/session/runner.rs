//! Orchestrator: owns the producers, the delivery queue and the chain.
//!
//! # Session flow
//!
//! ```text
//! run(close)
//!   ├─ state = Running
//!   ├─ start every producer concurrently       (failures logged, producer skipped)
//!   ├─ loop
//!   │    ├─ close signal        ─▶ break
//!   │    ├─ update              ─▶ chain.dispatch(update)   (one at a time)
//!   │    ├─ timeout             ─▶ poll again
//!   │    └─ queue closed        ─▶ break   (every producer finished)
//!   ├─ state = ShuttingDown
//!   ├─ stop every started producer
//!   └─ chain error? close display, return Err
//! ```
//!
//! The chain runs on the orchestrator's task only, so stage state such as
//! the accumulation maps is never touched concurrently.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::watch;

use crate::display::DisplaySurface;
use crate::intercept::{ChainError, InterceptorChain};
use crate::producer::UpdateProducer;
use crate::queue::{self, Recv};

use super::signal::CloseSignal;
use super::state::SessionState;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Reasons a session ends abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An update could not be processed.  The display has been closed.
    #[error("chain processing failed: {0}")]
    ChainProcessing(#[from] ChainError),

    /// Producers were configured but none of them started.
    #[error("no producer could be started")]
    NoActiveProducers,
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// Updates that went through the chain.
    pub delivered: u64,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one monitoring session.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use treadmill_monitor::intercept::{InterceptorChain, LoggingInterceptor};
/// use treadmill_monitor::producer::TextStreamProducer;
/// use treadmill_monitor::serialize::SerializerFormat;
/// use treadmill_monitor::session::{close_signal, Orchestrator};
///
/// # async fn example() {
/// let chain = InterceptorChain::new().with(LoggingInterceptor::default());
/// let orchestrator = Orchestrator::new(chain)
///     .with_producer(TextStreamProducer::stdin(SerializerFormat::Csv.build(false)))
///     .with_poll_interval(Duration::from_millis(500));
///
/// let (close, signal) = close_signal();
/// # let _ = close;
/// let summary = orchestrator.run(signal).await.unwrap();
/// println!("{} updates", summary.delivered);
/// # }
/// ```
pub struct Orchestrator {
    producers: Vec<Box<dyn UpdateProducer>>,
    chain: InterceptorChain,
    display: Option<Arc<dyn DisplaySurface>>,
    poll_interval: Duration,
    queue_capacity: usize,
    state: watch::Sender<SessionState>,
}

impl Orchestrator {
    pub fn new(chain: InterceptorChain) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            producers: Vec::new(),
            chain,
            display: None,
            poll_interval: Duration::from_secs(1),
            queue_capacity: queue::DEFAULT_CAPACITY,
            state,
        }
    }

    pub fn with_producer(mut self, producer: impl UpdateProducer + 'static) -> Self {
        self.producers.push(Box::new(producer));
        self
    }

    pub fn add_producer(&mut self, producer: Box<dyn UpdateProducer>) {
        self.producers.push(producer);
    }

    /// Display to tear down if the session fails.
    pub fn with_display(mut self, display: Arc<dyn DisplaySurface>) -> Self {
        self.display = Some(display);
        self
    }

    /// Upper bound on one wait for the next update.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `close` fires, every producer is exhausted, or the chain
    /// fails.
    pub async fn run(mut self, mut close: CloseSignal) -> Result<SessionSummary, SessionError> {
        self.state.send_replace(SessionState::Running);
        log::info!(
            "session: starting {} producer(s), chain = {:?}",
            self.producers.len(),
            self.chain.stage_names()
        );

        let (tx, mut rx) = queue::bounded(self.queue_capacity);

        let started: Vec<bool> = join_all(self.producers.iter_mut().map(|producer| {
            let tx = tx.clone();
            async move {
                let name = producer.name().to_string();
                match producer.start(tx).await {
                    Ok(()) => {
                        log::info!("session: producer[{name}] started");
                        true
                    }
                    Err(e) => {
                        log::error!("session: producer[{name}] failed to start: {e}");
                        false
                    }
                }
            }
        }))
        .await;
        drop(tx);

        if !started.iter().any(|ok| *ok) {
            self.state.send_replace(SessionState::ShuttingDown);
            log::error!("session: no active producers");
            return Err(SessionError::NoActiveProducers);
        }

        let mut delivered = 0u64;
        let outcome = loop {
            tokio::select! {
                biased;

                _ = close.closed() => {
                    log::info!("session: close requested");
                    break Ok(());
                }

                received = rx.recv_timeout(self.poll_interval) => match received {
                    Recv::Update(update) => {
                        if let Err(e) = self.chain.dispatch(update) {
                            log::error!("session: {e}");
                            break Err(e);
                        }
                        delivered += 1;
                    }
                    Recv::Timeout => {}
                    Recv::Closed => {
                        log::info!("session: every producer finished");
                        break Ok(());
                    }
                },
            }
        };

        self.state.send_replace(SessionState::ShuttingDown);
        self.stop_producers(&started).await;
        drop(rx);

        match outcome {
            Ok(()) => {
                log::info!("session: stopped after {delivered} update(s)");
                Ok(SessionSummary { delivered })
            }
            Err(e) => {
                if let Some(display) = &self.display {
                    display.close();
                }
                Err(SessionError::ChainProcessing(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn stop_producers(&mut self, started: &[bool]) {
        for (producer, _) in self
            .producers
            .iter_mut()
            .zip(started)
            .filter(|(_, started)| **started)
        {
            if let Err(e) = producer.stop().await {
                log::warn!("session: producer[{}] did not stop cleanly: {e}", producer.name());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
