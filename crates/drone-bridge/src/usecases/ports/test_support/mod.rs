mod mock_process;
mod mock_serial;

use std::sync::Arc;
use std::sync::Mutex;

pub use mock_process::{MockServerHandle, MockUiLauncher};
pub use mock_serial::MockSerialBackend;

/// Ordered record of side effects shared between test doubles.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}
