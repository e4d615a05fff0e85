//! Treadmill monitor. Streams fitness-machine readings through an ordered
//! interceptor chain to a stats window, stdout and CSV logs.
//!
//! | Module | Role |
//! |--------|------|
//! | [`update`] | the `Update` message and its numeric value |
//! | [`serialize`] | CSV / JSON-lines codecs |
//! | [`queue`] | bounded multi-producer delivery queue |
//! | [`device`] | fitness-machine transport seam + simulated treadmill |
//! | [`producer`] | stdin / file / device update sources |
//! | [`intercept`] | interceptor chain and its stages |
//! | [`display`] | display surface and value formatting |
//! | [`session`] | orchestrator, close signal, chain building |
//! | [`config`] | `settings.toml` |
//! | [`app`] | the egui window |

pub mod app;
pub mod config;
pub mod device;
pub mod display;
pub mod intercept;
pub mod producer;
pub mod queue;
pub mod serialize;
pub mod session;
pub mod update;
