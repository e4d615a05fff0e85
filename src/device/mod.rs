//! Seam to the physical fitness machine.
//!
//! The Bluetooth stack itself lives outside this crate.  Whatever talks to
//! the machine implements [`MachineTransport`]: it discovers devices that
//! advertise the FTMS service, opens a [`MachineSession`], and reports every
//! decoded notification through an [`EventCallback`].
//!
//! ```text
//! MachineTransport::discover / find_by_address
//!        │
//!        ▼
//! MachineTransport::connect(device, on_event) ──▶ Box<dyn MachineSession>
//!        │
//!        └─ on_event(MachineEvent::Update { .. })  (transport thread)
//! ```
//!
//! [`SimulatedTransport`] is a self-contained implementation that produces
//! a plausible treadmill workout, used when no hardware is around.

pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::update::UpdateValue;

pub use simulated::SimulatedTransport;

/// Bluetooth SIG UUID of the Fitness Machine Service.
pub const FTMS_SERVICE_UUID: &str = "00001826-0000-1000-8000-00805f9b34fb";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A device found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceInfo {
    pub fn new(address: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            address: address.into(),
            name: name.map(str::to_string),
        }
    }

    /// Name for log messages.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} ({})", self.address),
            None => self.address.clone(),
        }
    }
}

/// Notifications reported by a connected machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Fresh readings, one entry per measurement channel, in the order the
    /// machine reported them.
    Update(Vec<(String, UpdateValue)>),
    /// Machine status change or control-point response; not a measurement.
    Status(String),
}

/// Invoked by the transport for every event.  May run on any thread and
/// must not block.
pub type EventCallback = Arc<dyn Fn(MachineEvent) + Send + Sync>;

/// Errors raised by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device scan failed: {0}")]
    Scan(String),

    #[error("connection to {address} failed: {message}")]
    Connect { address: String, message: String },

    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Discovery and connection to fitness machines.
#[async_trait]
pub trait MachineTransport: Send + Sync {
    /// Scan for devices advertising `service_uuid`, in discovery order.
    async fn discover(&self, service_uuid: &str) -> Result<Vec<DeviceInfo>, TransportError>;

    /// Look for one specific device.  `Ok(None)` when it does not respond.
    async fn find_by_address(
        &self,
        address: &str,
        service_uuid: &str,
    ) -> Result<Option<DeviceInfo>, TransportError>;

    /// Open a session; `on_event` receives notifications until the session
    /// is disconnected.
    async fn connect(
        &self,
        device: &DeviceInfo,
        on_event: EventCallback,
    ) -> Result<Box<dyn MachineSession>, TransportError>;
}

/// A live connection to one machine.
#[async_trait]
pub trait MachineSession: Send + Sync {
    /// Close the connection.  No callback fires after this returns.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// MockTransport  (test-only)
// ---------------------------------------------------------------------------

/// A scripted transport for unit tests.
///
/// `connect` immediately replays `events` through the callback, then hands
/// back a session that records whether it was disconnected.  The callback
/// is kept, so later notifications can be pushed with [`emit`](Self::emit).
#[cfg(test)]
pub struct MockTransport {
    pub devices: Vec<DeviceInfo>,
    pub events: Vec<MachineEvent>,
    pub connected_to: std::sync::Mutex<Option<DeviceInfo>>,
    pub disconnected: Arc<std::sync::atomic::AtomicBool>,
    callback: std::sync::Mutex<Option<EventCallback>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(devices: Vec<DeviceInfo>, events: Vec<MachineEvent>) -> Self {
        Self {
            devices,
            events,
            connected_to: std::sync::Mutex::new(None),
            disconnected: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            callback: std::sync::Mutex::new(None),
        }
    }

    /// Deliver `event` through the connected callback, as a notification
    /// arriving after connect would.
    pub fn emit(&self, event: MachineEvent) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

#[cfg(test)]
struct MockSession {
    disconnected: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
#[async_trait]
impl MachineSession for MockSession {
    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnected
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl MachineTransport for MockTransport {
    async fn discover(&self, _service_uuid: &str) -> Result<Vec<DeviceInfo>, TransportError> {
        Ok(self.devices.clone())
    }

    async fn find_by_address(
        &self,
        address: &str,
        _service_uuid: &str,
    ) -> Result<Option<DeviceInfo>, TransportError> {
        Ok(self.devices.iter().find(|d| d.address == address).cloned())
    }

    async fn connect(
        &self,
        device: &DeviceInfo,
        on_event: EventCallback,
    ) -> Result<Box<dyn MachineSession>, TransportError> {
        *self.connected_to.lock().unwrap() = Some(device.clone());
        for event in &self.events {
            on_event(event.clone());
        }
        *self.callback.lock().unwrap() = Some(on_event);
        Ok(Box::new(MockSession {
            disconnected: Arc::clone(&self.disconnected),
        }))
    }
}
