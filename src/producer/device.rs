//! Producer backed by a fitness machine.
//!
//! On start the producer either scans for devices advertising the FTMS
//! service or looks up the configured address, connects, and registers a
//! callback.  Every `MachineEvent::Update` the machine reports is stamped
//! with the current time and split into one [`Update`] per reading.
//!
//! The callback runs on the transport's side and must not block, so it
//! hands readings to an unbounded buffer.  A forwarding task moves them into
//! the delivery queue in order, waiting whenever the queue is full.  No
//! reading is dropped: resumable accumulation depends on seeing every reset.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::device::{
    DeviceInfo, EventCallback, MachineEvent, MachineSession, MachineTransport, FTMS_SERVICE_UUID,
};
use crate::queue::UpdateSender;
use crate::update::{local_now, Update};

use super::{join_cancelled, ProducerError, UpdateProducer};

/// Streams readings from one fitness machine.
pub struct DeviceProducer {
    transport: Arc<dyn MachineTransport>,
    address: Option<String>,
    session: Option<Box<dyn MachineSession>>,
    forwarder: Option<JoinHandle<()>>,
}

impl DeviceProducer {
    /// `address = None` scans and picks the first device discovered.
    pub fn new(transport: Arc<dyn MachineTransport>, address: Option<String>) -> Self {
        Self {
            transport,
            address,
            session: None,
            forwarder: None,
        }
    }

    /// `true` while a session is open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

async fn locate(transport: &dyn MachineTransport, address: Option<&str>) -> Result<DeviceInfo, ProducerError> {
    match address {
        None => {
            log::info!("producer[device]: scanning for FTMS-enabled treadmills...");
            let mut devices = transport.discover(FTMS_SERVICE_UUID).await?;
            if devices.is_empty() {
                return Err(ProducerError::NoDeviceFound);
            }
            if devices.len() > 1 {
                log::warn!(
                    "producer[device]: {} FTMS devices found, connecting to the first one",
                    devices.len()
                );
            }
            Ok(devices.swap_remove(0))
        }
        Some(address) => {
            log::info!("producer[device]: looking for device with address {address}...");
            match transport.find_by_address(address, FTMS_SERVICE_UUID).await? {
                Some(device) => Ok(device),
                None => {
                    log::error!("producer[device]: could not find device with address {address}");
                    Err(ProducerError::DeviceNotFound {
                        address: address.to_string(),
                    })
                }
            }
        }
    }
}

/// Build the transport callback.  It never blocks: readings are stamped
/// and buffered for [`forward`].
fn buffer_readings(buffer: mpsc::UnboundedSender<Update>) -> EventCallback {
    Arc::new(move |event: MachineEvent| match event {
        MachineEvent::Update(readings) => {
            let now = local_now();
            for (key, value) in readings {
                log::trace!("producer[device]: {key} = {value}");
                if buffer.send(Update::new(now, key, value)).is_err() {
                    return;
                }
            }
        }
        MachineEvent::Status(status) => {
            log::debug!("producer[device]: machine status: {status}");
        }
    })
}

/// Move buffered readings into the delivery queue, in arrival order.
async fn forward(mut buffer: mpsc::UnboundedReceiver<Update>, queue: UpdateSender) {
    while let Some(update) = buffer.recv().await {
        if queue.send(update).await.is_err() {
            log::debug!("producer[device]: queue closed, stopping");
            break;
        }
    }
}

#[async_trait]
impl UpdateProducer for DeviceProducer {
    fn name(&self) -> &str {
        "device"
    }

    async fn start(&mut self, queue: UpdateSender) -> Result<(), ProducerError> {
        if self.session.is_some() {
            return Err(ProducerError::AlreadyStarted);
        }

        let transport = Arc::clone(&self.transport);
        let device = locate(&*transport, self.address.as_deref()).await?;
        log::info!("producer[device]: connecting to {}", device.label());

        let (buffer_tx, buffer_rx) = mpsc::unbounded_channel();
        let session = transport.connect(&device, buffer_readings(buffer_tx)).await?;
        self.session = Some(session);
        self.forwarder = Some(tokio::spawn(forward(buffer_rx, queue)));

        log::info!("producer[device]: connected");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ProducerError> {
        let disconnected = match self.session.take() {
            Some(mut session) => {
                log::info!("producer[device]: disconnecting...");
                let result = session.disconnect().await;
                if result.is_ok() {
                    log::info!("producer[device]: disconnected");
                }
                result.map_err(ProducerError::from)
            }
            None => Ok(()),
        };

        if let Some(task) = self.forwarder.take() {
            task.abort();
            join_cancelled(task).await?;
        }
        disconnected
    }
}
