//! Application entry point: Treadmill Monitor.
//!
//! # Startup sequence
//!
//! 1. Load [`AppConfig`] from disk (defaults on first run).
//! 2. Initialise logging (`debug` when `session.debug`, else `info`).
//! 3. Create the [`tokio`] runtime.
//! 4. Build producers for the configured input.
//! 5. Build the interceptor chain and the orchestrator.
//! 6. With the UI enabled: spawn the session, then run
//!    [`eframe::run_native`] on the main thread until the window closes.
//!    Headless: run the session until Ctrl-C or end of input.
//! 7. Stop the session and shut the runtime down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use eframe::egui;
use treadmill_monitor::{
    app::{MonitorApp, WINDOW_TITLE},
    config::{AppConfig, InputSource},
    device::SimulatedTransport,
    display::{DisplaySurface, GuiDisplay},
    producer::{DeviceProducer, TextStreamProducer, UpdateProducer},
    session::{build_chain, close_signal, Orchestrator, SessionError, SessionSummary},
};

/// How long blocked reads (stdin) may hold up process exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

async fn build_producers(config: &AppConfig) -> Result<Vec<Box<dyn UpdateProducer>>> {
    let serializer = config
        .input
        .format
        .build(config.input.allow_missing_timestamp);

    let producer: Box<dyn UpdateProducer> = match config.input.source {
        InputSource::Stdin => Box::new(TextStreamProducer::stdin(serializer)),
        InputSource::File => {
            let Some(path) = &config.input.file else {
                bail!("input.source is \"file\" but input.file is not set");
            };
            let producer = TextStreamProducer::open(path, serializer)
                .await
                .with_context(|| format!("cannot replay {}", path.display()))?;
            Box::new(producer)
        }
        InputSource::Device => {
            if !config.device.simulate {
                bail!("no Bluetooth transport is built in; set device.simulate = true");
            }
            Box::new(DeviceProducer::new(
                Arc::new(SimulatedTransport::default()),
                config.device.address.clone(),
            ))
        }
    };
    Ok(vec![producer])
}

fn build_orchestrator(config: &AppConfig, display: Option<Arc<dyn DisplaySurface>>) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(build_chain(config, display.clone()))
        .with_poll_interval(Duration::from_millis(config.session.poll_interval_ms))
        .with_queue_capacity(config.session.queue_capacity);
    if let Some(display) = display {
        orchestrator = orchestrator.with_display(display);
    }
    orchestrator
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_title(WINDOW_TITLE)
        .with_decorations(false)
        .with_transparent(true)
        .with_inner_size([190.0, 230.0])
        .with_resizable(false);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Run modes
// ---------------------------------------------------------------------------

fn run_windowed(
    rt: &tokio::runtime::Runtime,
    config: AppConfig,
    producers: Vec<Box<dyn UpdateProducer>>,
) -> Result<SessionSummary> {
    let gui = Arc::new(GuiDisplay::new());
    let display: Arc<dyn DisplaySurface> = gui.clone();

    let mut orchestrator = build_orchestrator(&config, Some(display));
    for producer in producers {
        orchestrator.add_producer(producer);
    }
    let states = orchestrator.subscribe();

    let (close, signal) = close_signal();
    let session = rt.spawn(orchestrator.run(signal));

    let app_close = close.clone();
    let ui_result = eframe::run_native(
        WINDOW_TITLE,
        native_options(&config),
        Box::new(move |cc| {
            gui.attach(cc.egui_ctx.clone());
            Ok(Box::new(MonitorApp::new(gui.state(), states, app_close, config)))
        }),
    );

    // The window may also fail to open; stop the session either way.
    close.close();
    let summary = rt.block_on(session).context("session task panicked")??;
    ui_result.map_err(|e| anyhow::anyhow!("window failed: {e}"))?;
    Ok(summary)
}

fn run_headless(
    rt: &tokio::runtime::Runtime,
    config: AppConfig,
    producers: Vec<Box<dyn UpdateProducer>>,
) -> Result<SessionSummary, SessionError> {
    let mut orchestrator = build_orchestrator(&config, None);
    for producer in producers {
        orchestrator.add_producer(producer);
    }

    let (close, signal) = close_signal();
    rt.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("received Ctrl-C, stopping");
                close.close();
            }
        });
        orchestrator.run(signal).await
    })
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Configuration
    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // 2. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();
    log::info!("Treadmill Monitor starting up");
    if let Err(e) = &loaded {
        log::warn!("Failed to load config ({e}); using defaults");
    }

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Producers
    let producers = rt.block_on(build_producers(&config))?;

    // 5-6. Session
    let outcome = if config.ui.enabled {
        run_windowed(&rt, config, producers)
    } else {
        run_headless(&rt, config, producers).map_err(Into::into)
    };

    // 7. Blocking stdin reads cannot be cancelled; do not wait on them.
    rt.shutdown_timeout(SHUTDOWN_GRACE);

    let summary = outcome?;
    log::info!("Treadmill Monitor exiting after {} update(s)", summary.delivered);
    Ok(())
}
