//! Session orchestration.
//!
//! # Architecture
//!
//! ```text
//! TextStreamProducer ─┐
//! DeviceProducer ─────┼─▶ bounded queue ─▶ Orchestrator::run() ─▶ InterceptorChain
//!        …           ─┘                        ▲                    logging
//!                                              │                    resumable
//!                                     CloseSignal (window,          file log
//!                                     Ctrl-C)                       text sink
//!                                                                   display ─▶ GuiDisplay
//! ```

pub mod chain;
pub mod runner;
pub mod signal;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use chain::build_chain;
pub use runner::{Orchestrator, SessionError, SessionSummary};
pub use signal::{close_signal, CloseHandle, CloseSignal};
pub use state::SessionState;
