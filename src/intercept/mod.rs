//! Interceptor chain: the ordered stages every update passes through.
//!
//! # Model
//!
//! Each stage implements [`Interceptor::intercept`], receiving the update
//! and a [`Next`] continuation that stands for "the rest of the chain".
//! A stage may
//!
//! * call `next.proceed(update)` unchanged,
//! * call it with a modified copy, or
//! * return without calling it, which drops the update for every stage
//!   after it.
//!
//! ```text
//! dispatch(u) ─▶ stage[0].intercept(u, Next[1..])
//!                    └─ next.proceed(u') ─▶ stage[1].intercept(u', Next[2..])
//!                                               └─ ... ─▶ terminal no-op
//! ```
//!
//! Order is exactly the order stages were pushed; a downstream stage only
//! ever sees what upstream stages forwarded.  The session uses
//! logging → resumable → file log → text sink → display.

pub mod display;
pub mod file_log;
pub mod logging;
pub mod resumable;
pub mod sink;

use thiserror::Error;

use crate::update::Update;

pub use display::DisplayInterceptor;
pub use file_log::{CsvFileLog, FileLogInterceptor};
pub use logging::LoggingInterceptor;
pub use resumable::{ResumableInterceptor, DEFAULT_ACCUMULATE_KEYS};
pub use sink::TextSinkInterceptor;

// ---------------------------------------------------------------------------
// ChainError
// ---------------------------------------------------------------------------

/// An unexpected failure while running the chain.  Fatal to the session.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Writing to an output sink failed.
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    /// A stage gave up on an update.
    #[error("interceptor `{stage}` failed: {message}")]
    Stage { stage: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Interceptor trait
// ---------------------------------------------------------------------------

/// One stage of the chain.
///
/// The default `intercept` is a pass-through, so a stage that only needs to
/// observe can override nothing but its name.
pub trait Interceptor: Send {
    /// Short stage name for logs and errors.
    fn name(&self) -> &'static str;

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        next.proceed(update)
    }
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Continuation handed to a stage: the stages still to run.
///
/// Consumed by [`proceed`](Self::proceed), so a stage forwards at most once.
pub struct Next<'a> {
    rest: &'a mut [Box<dyn Interceptor>],
}

impl<'a> Next<'a> {
    /// Run the remaining stages on `update`.  With no stages left this is
    /// the terminal no-op.
    pub fn proceed(self, update: Update) -> Result<(), ChainError> {
        match self.rest.split_first_mut() {
            Some((stage, rest)) => stage.intercept(update, Next { rest }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// InterceptorChain
// ---------------------------------------------------------------------------

/// An ordered list of stages, owned by the session loop.
///
/// ```
/// use treadmill_monitor::intercept::{InterceptorChain, LoggingInterceptor};
/// use treadmill_monitor::update::Update;
///
/// let mut chain = InterceptorChain::new().with(LoggingInterceptor::new(log::Level::Debug));
/// chain.dispatch(Update::untimed("speed_instant", 4.5)).unwrap();
/// assert_eq!(chain.stage_names(), vec!["logging"]);
/// ```
#[derive(Default)]
pub struct InterceptorChain {
    stages: Vec<Box<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; builder form.
    pub fn with(mut self, stage: impl Interceptor + 'static) -> Self {
        self.push(stage);
        self
    }

    /// Append a stage after all existing ones.
    pub fn push(&mut self, stage: impl Interceptor + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Run `update` through every stage, in order, to completion.
    pub fn dispatch(&mut self, update: Update) -> Result<(), ChainError> {
        Next {
            rest: &mut self.stages,
        }
        .proceed(update)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
