/// Crossterm backend implementation.
pub mod crossterm;
use std::fmt::Debug;

use crate::error::Result;

/// A handle for taking over and releasing the terminal.
pub trait BackendControl: Debug {
    /// Take over the terminal.
    fn start(&mut self) -> Result<()>;

    /// Release the terminal, restoring its previous state.
    fn stop(&mut self) -> Result<()>;
}

/// Guard that pairs a backend start with exactly one stop, even when the
/// runloop exits early with an error.
#[derive(Debug)]
pub struct TerminalSession {
    /// The controlled backend.
    backend: Box<dyn BackendControl>,
    /// Whether the backend is currently started.
    active: bool,
}

impl TerminalSession {
    /// Start the backend and wrap it in a guard.
    pub fn new(mut backend: Box<dyn BackendControl>) -> Result<Self> {
        backend.start()?;
        Ok(Self {
            backend,
            active: true,
        })
    }

    /// Stop the backend if the session is active.
    pub fn stop(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            self.backend.stop()?;
        }
        Ok(())
    }

    /// Is the backend started?
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            drop(self.backend.stop());
        }
    }
}
