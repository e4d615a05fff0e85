//! Treadmill stats window: egui/eframe application.
//!
//! # Architecture
//!
//! [`MonitorApp`] is the top-level [`eframe::App`].  It never talks to the
//! session directly:
//!
//! * values arrive through the [`SharedDisplayState`] written by
//!   [`GuiDisplay`](crate::display::GuiDisplay) from the session task;
//! * session phase arrives through a `watch` receiver;
//! * closing the window fires the session's [`CloseHandle`].
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────┐
//! │ ● Treadmill Monitor    x │  ← draggable title bar, dot = status tone
//! │ Manual Mode              │  ← training status ("Offline" before any)
//! │ Time       00:12:41      │
//! │ Speed      5.5 km/h      │
//! │ Distance   1.52 km       │
//! │ Energy     123 kcal      │
//! │ Running · 842 updates    │
//! └──────────────────────────┘
//! ```
//!
//! When confirm-on-close is active, a close request is cancelled and a small
//! dialog asks first.  A close issued by the session itself (after a fatal
//! error) is never intercepted.

use std::time::Duration;

use eframe::egui;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::display::format::format_stat;
use crate::display::{training_status_name, training_status_tone, DisplayState, SharedDisplayState, StatusTone};
use crate::session::{CloseHandle, SessionState};

/// Title shown in the window bar and task switcher.
pub const WINDOW_TITLE: &str = "Treadmill Monitor";

/// Rows of the stats panel: key, label, unit.
const STATS: [(&str, &str, &str); 4] = [
    ("time_elapsed", "Time", ""),
    ("speed_instant", "Speed", "km/h"),
    ("distance_total", "Distance", "km"),
    ("energy_total", "Energy", "kcal"),
];

// ---------------------------------------------------------------------------
// MonitorApp
// ---------------------------------------------------------------------------

/// eframe application: the stats window.
pub struct MonitorApp {
    display: SharedDisplayState,
    session: watch::Receiver<SessionState>,
    close: CloseHandle,

    /// Ask before closing (configured, or forced by resumable mode).
    confirm_close: bool,
    /// The confirm dialog is open.
    confirming: bool,
    /// The user has agreed to close.
    close_confirmed: bool,

    /// Last known outer window position, saved on exit.
    position: Option<egui::Pos2>,
    config: AppConfig,
}

impl MonitorApp {
    /// * `display`: state written by the session's display stage.
    /// * `session`: session phase, for the footer.
    /// * `close`: fired when the window goes away.
    pub fn new(
        display: SharedDisplayState,
        session: watch::Receiver<SessionState>,
        close: CloseHandle,
        config: AppConfig,
    ) -> Self {
        Self {
            display,
            session,
            close,
            confirm_close: config.confirm_close(),
            confirming: false,
            close_confirmed: false,
            position: config.ui.window_position.map(|(x, y)| egui::pos2(x, y)),
            config,
        }
    }

    // ── Close handling ───────────────────────────────────────────────────

    fn handle_close_request(&mut self, ctx: &egui::Context, closed_by_session: bool) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if intercept_close(self.confirm_close, closed_by_session, self.close_confirmed) {
            log::debug!("ui: close requested, asking for confirmation");
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.confirming = true;
        }
    }

    fn draw_confirm_dialog(&mut self, ctx: &egui::Context) {
        if !self.confirming {
            return;
        }
        egui::Window::new("Close monitor?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("Accumulated totals will be lost.")
                        .color(egui::Color32::from_rgb(200, 200, 200))
                        .size(11.0),
                );
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if ui.button("Close").clicked() {
                        self.close_confirmed = true;
                        self.confirming = false;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirming = false;
                    }
                });
            });
    }

    // ── Custom title bar ─────────────────────────────────────────────────

    fn draw_title_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, tone: StatusTone) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("●").color(tone_color(tone)));

            let title_resp = ui.label(
                egui::RichText::new(WINDOW_TITLE)
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
            if title_resp.is_pointer_button_down_on() {
                ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("x")
                                .color(egui::Color32::from_rgb(200, 100, 100))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_status(&self, ui: &mut egui::Ui, status: &str, tone: StatusTone) {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(status).color(tone_color(tone)).size(14.0));
        ui.add_space(4.0);
    }

    fn draw_stats(&self, ui: &mut egui::Ui, state: &DisplayState) {
        egui::Grid::new("stats")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for (key, label, unit) in STATS {
                    ui.label(
                        egui::RichText::new(label)
                            .color(egui::Color32::from_rgb(140, 140, 140))
                            .size(11.0),
                    );
                    let text = match state.value(key) {
                        Some(value) if unit.is_empty() => format_stat(key, value),
                        Some(value) => format!("{} {unit}", format_stat(key, value)),
                        None => "--".to_string(),
                    };
                    ui.label(
                        egui::RichText::new(text)
                            .color(egui::Color32::from_rgb(230, 230, 230))
                            .size(16.0),
                    );
                    ui.end_row();
                }
            });
    }

    fn draw_footer(&self, ui: &mut egui::Ui, updates: u64) {
        let phase = *self.session.borrow();
        ui.add_space(6.0);
        ui.label(
            egui::RichText::new(format!("{} · {updates} updates", phase.label()))
                .color(egui::Color32::from_rgb(100, 100, 100))
                .size(10.0),
        );
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Snapshot under a brief lock; render without holding it.
        let values = match self.display.lock() {
            Ok(st) => st.clone(),
            Err(_) => DisplayState {
                closed_by_session: true,
                ..DisplayState::default()
            },
        };
        let (updates, closed_by_session) = (values.updates, values.closed_by_session);

        self.handle_close_request(ctx, closed_by_session);

        if let Some(rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.position = Some(rect.min);
        }

        let (status, tone) = status_line(&values);

        // Values are pushed with a repaint request; poll slowly for the
        // footer's session phase.
        ctx.request_repaint_after(Duration::from_millis(500));

        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 230))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, ctx, tone);
            ui.separator();
            self.draw_status(ui, &status, tone);
            self.draw_stats(ui, &values);
            self.draw_footer(ui, updates);
        });

        self.draw_confirm_dialog(ctx);
    }

    /// Stop the session and remember the window position.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ui: window closing");
        self.close.close();

        let position = self.position.map(|p| (p.x, p.y));
        if position.is_some() && position != self.config.ui.window_position {
            self.config.ui.window_position = position;
            if let Err(e) = self.config.save() {
                log::warn!("ui: could not save window position: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether a user close request must be cancelled in favour of the
/// confirm dialog.
fn intercept_close(confirm_close: bool, closed_by_session: bool, confirmed: bool) -> bool {
    confirm_close && !closed_by_session && !confirmed
}

/// Status text and tone; "Offline" until a training status arrives.
fn status_line(state: &DisplayState) -> (String, StatusTone) {
    match state.value("training_status") {
        Some(code) => {
            let code = code.as_i64();
            (training_status_name(code).to_string(), training_status_tone(code))
        }
        None => ("Offline".to_string(), StatusTone::Neutral),
    }
}

fn tone_color(tone: StatusTone) -> egui::Color32 {
    match tone {
        StatusTone::Neutral => egui::Color32::from_rgb(100, 100, 100),
        StatusTone::Warning => egui::Color32::from_rgb(255, 136, 68),
        StatusTone::Error => egui::Color32::from_rgb(255, 68, 68),
        StatusTone::Success => egui::Color32::from_rgb(80, 200, 120),
    }
}
