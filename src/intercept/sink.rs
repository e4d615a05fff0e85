//! Writes each update as one serialized line to a text sink.
//!
//! The writer is flushed after every line so nothing is lost if the
//! process is killed.  Typical sink: stdout, so the monitor can be piped
//! into another tool.

use std::io::Write;
use std::sync::Arc;

use crate::serialize::UpdateSerializer;
use crate::update::Update;

use super::{ChainError, Interceptor, Next};

pub struct TextSinkInterceptor {
    serializer: Arc<dyn UpdateSerializer>,
    writer: Box<dyn Write + Send>,
}

impl TextSinkInterceptor {
    pub fn new(serializer: Arc<dyn UpdateSerializer>, writer: Box<dyn Write + Send>) -> Self {
        Self { serializer, writer }
    }

    /// Sink writing to the process's standard output.
    pub fn stdout(serializer: Arc<dyn UpdateSerializer>) -> Self {
        Self::new(serializer, Box::new(std::io::stdout()))
    }
}

impl Interceptor for TextSinkInterceptor {
    fn name(&self) -> &'static str {
        "text_sink"
    }

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        let line = self.serializer.serialize(&update);
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        next.proceed(update)
    }
}
