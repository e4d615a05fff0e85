//! A fake treadmill that emits FTMS-shaped readings on a timer.
//!
//! Each tick advances a walking workout at a fixed speed.  After
//! `workout_secs` the machine "stops": its running totals drop back to zero
//! and a new workout begins, which is exactly what a real treadmill does
//! when its safety key is pulled.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::update::UpdateValue;

use super::{
    DeviceInfo, EventCallback, MachineEvent, MachineSession, MachineTransport, TransportError,
};

/// Address reported by the simulated device.
pub const SIMULATED_ADDRESS: &str = "00:00:00:00:00:00";

/// FTMS training-status code for "Manual Mode".
const STATUS_MANUAL: i64 = 13;
/// FTMS training-status code for "Idle".
const STATUS_IDLE: i64 = 1;

/// Timer-driven simulated treadmill.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    /// Wall time between two notifications.
    pub tick: Duration,
    /// Treadmill speed in km/h.
    pub speed_kmh: f64,
    /// Length of one workout in simulated seconds before the totals reset.
    pub workout_secs: i64,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            speed_kmh: 4.5,
            workout_secs: 600,
        }
    }
}

/// Running totals of the simulated workout, in FTMS units.
#[derive(Debug, Default, Clone, PartialEq)]
struct Workout {
    elapsed_secs: i64,
    /// Tenths of a metre.
    distance: f64,
    /// Tenths of a kilocalorie.
    energy: f64,
}

impl Workout {
    /// Advance one simulated second and return the readings to report.
    fn step(&mut self, speed_kmh: f64, workout_secs: i64) -> Vec<(String, UpdateValue)> {
        if self.elapsed_secs >= workout_secs {
            *self = Workout::default();
            return vec![
                ("training_status".into(), UpdateValue::Int(STATUS_IDLE)),
                ("speed_instant".into(), UpdateValue::Real(0.0)),
                ("time_elapsed".into(), UpdateValue::Int(0)),
                ("distance_total".into(), UpdateValue::Int(0)),
                ("energy_total".into(), UpdateValue::Int(0)),
            ];
        }

        self.elapsed_secs += 1;
        // km/h -> metres per second -> tenths of a metre.
        self.distance += speed_kmh / 3.6 * 10.0;
        // Roughly 1 kcal per km per kg at 70 kg, in tenths.
        self.energy += speed_kmh / 3.6 / 1000.0 * 70.0 * 10.0;

        vec![
            ("training_status".into(), UpdateValue::Int(STATUS_MANUAL)),
            ("speed_instant".into(), UpdateValue::Real(speed_kmh)),
            ("time_elapsed".into(), UpdateValue::Int(self.elapsed_secs)),
            ("distance_total".into(), UpdateValue::Int(self.distance as i64)),
            ("energy_total".into(), UpdateValue::Int(self.energy as i64)),
        ]
    }
}

struct SimulatedSession {
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl MachineSession for SimulatedSession {
    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => return Err(TransportError::Disconnect(e.to_string())),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MachineTransport for SimulatedTransport {
    async fn discover(&self, _service_uuid: &str) -> Result<Vec<DeviceInfo>, TransportError> {
        Ok(vec![DeviceInfo::new(SIMULATED_ADDRESS, Some("Simulated Treadmill"))])
    }

    async fn find_by_address(
        &self,
        address: &str,
        service_uuid: &str,
    ) -> Result<Option<DeviceInfo>, TransportError> {
        let devices = self.discover(service_uuid).await?;
        Ok(devices.into_iter().find(|d| d.address.eq_ignore_ascii_case(address)))
    }

    async fn connect(
        &self,
        device: &DeviceInfo,
        on_event: EventCallback,
    ) -> Result<Box<dyn MachineSession>, TransportError> {
        log::debug!("simulated: starting workout on {}", device.label());

        let tick = self.tick;
        let speed = self.speed_kmh;
        let workout_secs = self.workout_secs;

        let task = tokio::spawn(async move {
            let mut workout = Workout::default();
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            on_event(MachineEvent::Status("started".into()));
            loop {
                interval.tick().await;
                on_event(MachineEvent::Update(workout.step(speed, workout_secs)));
            }
        });

        Ok(Box::new(SimulatedSession { task: Some(task) }))
    }
}
