//! Pushes each post-chain value to the display surface.

use std::sync::Arc;

use crate::display::DisplaySurface;
use crate::update::Update;

use super::{ChainError, Interceptor, Next};

pub struct DisplayInterceptor {
    surface: Arc<dyn DisplaySurface>,
}

impl DisplayInterceptor {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self { surface }
    }
}

impl Interceptor for DisplayInterceptor {
    fn name(&self) -> &'static str {
        "display"
    }

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        self.surface.set_state(&update.key, update.value);
        log::trace!("display: {} = {}", update.key, update.value);
        next.proceed(update)
    }
}
