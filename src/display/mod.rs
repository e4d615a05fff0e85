//! Display surface: where post-chain values end up on screen.
//!
//! The session talks to the screen only through [`DisplaySurface`]: one
//! `set_state(key, value)` per delivered update, plus `close()` to tear the
//! window down when the session fails.  [`GuiDisplay`] is the egui-backed
//! implementation; it stores values in a [`SharedDisplayState`] that the
//! [`MonitorApp`](crate::app::MonitorApp) reads every frame.

pub mod format;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use eframe::egui;

use crate::update::UpdateValue;

pub use format::{format_stat, training_status_name, training_status_tone, StatusTone};

// ---------------------------------------------------------------------------
// DisplaySurface trait
// ---------------------------------------------------------------------------

/// A key/value view of the latest readings.
///
/// Implementors must be `Send + Sync`: the session loop calls `set_state`
/// from a tokio worker while the UI thread renders.
pub trait DisplaySurface: Send + Sync {
    /// Show `value` for `key`, replacing whatever was shown before.
    fn set_state(&self, key: &str, value: UpdateValue);

    /// Tear the surface down.  Called once when the session ends with an
    /// error.
    fn close(&self);
}

// ---------------------------------------------------------------------------
// DisplayState
// ---------------------------------------------------------------------------

/// Everything the window needs to render.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    /// Latest value per key.
    pub values: BTreeMap<String, UpdateValue>,
    /// Total number of `set_state` calls.
    pub updates: u64,
    /// When the most recent value arrived.
    pub last_update: Option<Instant>,
    /// Set when the session (not the user) asked the window to close.
    pub closed_by_session: bool,
}

impl DisplayState {
    pub fn value(&self, key: &str) -> Option<UpdateValue> {
        self.values.get(key).copied()
    }
}

/// Thread-safe handle to [`DisplayState`].  Lock briefly; never hold the
/// lock across an `.await`.
pub type SharedDisplayState = Arc<Mutex<DisplayState>>;

// ---------------------------------------------------------------------------
// GuiDisplay
// ---------------------------------------------------------------------------

/// [`DisplaySurface`] backed by the egui window.
///
/// The egui context is attached once the window exists; values that
/// arrive earlier are kept and shown on the first frame.
#[derive(Default)]
pub struct GuiDisplay {
    state: SharedDisplayState,
    ctx: OnceLock<egui::Context>,
}

impl GuiDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the renderer.
    pub fn state(&self) -> SharedDisplayState {
        Arc::clone(&self.state)
    }

    /// Bind the window's context so updates trigger a repaint.
    pub fn attach(&self, ctx: egui::Context) {
        if self.ctx.set(ctx).is_err() {
            log::warn!("display: egui context already attached");
        }
    }
}

impl DisplaySurface for GuiDisplay {
    fn set_state(&self, key: &str, value: UpdateValue) {
        if let Ok(mut st) = self.state.lock() {
            st.values.insert(key.to_string(), value);
            st.updates += 1;
            st.last_update = Some(Instant::now());
        }
        if let Some(ctx) = self.ctx.get() {
            ctx.request_repaint();
        }
    }

    fn close(&self) {
        if let Ok(mut st) = self.state.lock() {
            st.closed_by_session = true;
        }
        if let Some(ctx) = self.ctx.get() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingDisplay  (test-only)
// ---------------------------------------------------------------------------

/// A display double that records every call.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingDisplay {
    states: Mutex<Vec<(String, UpdateValue)>>,
    closed: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn states(&self) -> Vec<(String, UpdateValue)> {
        self.states.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl DisplaySurface for RecordingDisplay {
    fn set_state(&self, key: &str, value: UpdateValue) {
        self.states.lock().unwrap().push((key.to_string(), value));
    }

    fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}
