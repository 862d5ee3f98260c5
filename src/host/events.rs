//! Lifecycle events and the handlers subscribed to them

use std::fmt;

use tracing::{debug, error};

use super::loader::LoadedConfig;
use crate::error::Result;

/// Host lifecycle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Configuration is fully merged and safe to read
    Connect,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Connect => write!(f, "connect"),
        }
    }
}

type Handler = Box<dyn Fn(&LoadedConfig) -> Result<()>>;

/// Owns the loaded configuration and dispatches lifecycle events.
pub struct Printer {
    config: LoadedConfig,
    handlers: Vec<(Event, Handler)>,
}

impl Printer {
    pub fn new(config: LoadedConfig) -> Self {
        Self {
            config,
            handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    pub fn register_event_handler<F>(&mut self, event: Event, handler: F)
    where
        F: Fn(&LoadedConfig) -> Result<()> + 'static,
    {
        self.handlers.push((event, Box::new(handler)));
    }

    /// Run every handler registered for `event`, in registration order.
    ///
    /// A failing handler is logged and does not stop the rest. Returns the
    /// number of handlers that failed.
    pub fn send_event(&self, event: Event) -> usize {
        let mut failed = 0;
        for (_, handler) in self.handlers.iter().filter(|(e, _)| *e == event) {
            if let Err(e) = handler(&self.config) {
                error!(%event, "event handler failed: {e}");
                failed += 1;
            }
        }
        debug!(%event, failed, "event dispatched");
        failed
    }
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
