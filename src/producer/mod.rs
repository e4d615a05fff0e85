//! Update producers: the sources that feed the delivery queue.
//!
//! # Contract
//!
//! * [`UpdateProducer::start`] returns promptly and keeps producing in the
//!   background until [`UpdateProducer::stop`] is called or the source is
//!   exhausted.
//! * [`UpdateProducer::stop`] does not return until background work has
//!   been cancelled or drained.  A cancelled task counts as a clean stop.
//!
//! Producers only ever push into the queue; they never see chain state.
//!
//! | Producer | Source |
//! |----------|--------|
//! | [`TextStreamProducer`] | stdin or a replayed file, one serialized update per line |
//! | [`DeviceProducer`] | a fitness machine behind a [`MachineTransport`](crate::device::MachineTransport) |

pub mod device;
pub mod text;

use async_trait::async_trait;
use thiserror::Error;

use crate::device::TransportError;
use crate::queue::UpdateSender;

pub use device::DeviceProducer;
pub use text::TextStreamProducer;

// ---------------------------------------------------------------------------
// ProducerError
// ---------------------------------------------------------------------------

/// Failures that stop a single producer.  None of them is fatal to the
/// session as a whole.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Discovery found no device advertising the fitness-machine service.
    #[error("no FTMS devices found")]
    NoDeviceFound,

    /// An explicit address was given but nothing answered on it.
    #[error("could not find device with address {address}")]
    DeviceNotFound { address: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("producer already started")]
    AlreadyStarted,

    /// The background task ended abnormally (panic).
    #[error("producer task failed: {0}")]
    Task(String),

    #[error("failed to open input: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// UpdateProducer trait
// ---------------------------------------------------------------------------

/// An asynchronous source of updates.
#[async_trait]
pub trait UpdateProducer: Send {
    /// Short name used in log messages, e.g. `"stdin"` or `"device"`.
    fn name(&self) -> &str;

    /// Begin delivering into `queue`.
    async fn start(&mut self, queue: UpdateSender) -> Result<(), ProducerError>;

    /// Cancel background work and wait for it to finish.
    async fn stop(&mut self) -> Result<(), ProducerError>;
}

/// Await an aborted task, treating cancellation as success.
pub(crate) async fn join_cancelled(task: tokio::task::JoinHandle<()>) -> Result<(), ProducerError> {
    match task.await {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(ProducerError::Task(e.to_string())),
    }
}
