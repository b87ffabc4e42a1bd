//! Test doubles for the UI process and the control server handle.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::EventLog;
use crate::usecases::ports::LaunchError;
use crate::usecases::ports::ServerHandle;
use crate::usecases::ports::UiLauncher;
use crate::usecases::ports::UiProcess;

pub struct MockUiLauncher {
    events: EventLog,
    running: Arc<AtomicBool>,
    fail: bool,
    exits_on_terminate: bool,
}

impl MockUiLauncher {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            running: Arc::new(AtomicBool::new(false)),
            fail: false,
            exits_on_terminate: true,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// The launched process ignores SIGTERM and has to be killed.
    pub fn ignoring_terminate(mut self) -> Self {
        self.exits_on_terminate = false;
        self
    }

    /// Shared liveness flag; clearing it simulates the UI exiting.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

impl UiLauncher for MockUiLauncher {
    fn launch(&self) -> Result<Box<dyn UiProcess>, LaunchError> {
        if self.fail {
            return Err(LaunchError::UiSpawn {
                command: "mock-ui".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        self.running.store(true, Ordering::SeqCst);
        self.events.push("ui launch");
        Ok(Box::new(MockUiProcess {
            events: self.events.clone(),
            running: Arc::clone(&self.running),
            exits_on_terminate: self.exits_on_terminate,
        }))
    }
}

struct MockUiProcess {
    events: EventLog,
    running: Arc<AtomicBool>,
    exits_on_terminate: bool,
}

impl UiProcess for MockUiProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn is_running(&mut self) -> io::Result<bool> {
        Ok(self.running.load(Ordering::SeqCst))
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.events.push("ui terminate");
        if self.exits_on_terminate {
            self.running.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.events.push("ui kill");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockServerHandle {
    events: EventLog,
}

impl MockServerHandle {
    pub fn new(events: EventLog) -> Self {
        Self { events }
    }
}

impl ServerHandle for MockServerHandle {
    fn stop(self: Box<Self>) {
        self.events.push("server stop");
    }
}
