//! Startup, liveness polling and ordered teardown of the bridge.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::domain::SupervisorPhase;
use crate::usecases::SerialLink;
use crate::usecases::ports::LaunchError;
use crate::usecases::ports::ServerHandle;
use crate::usecases::ports::UiLauncher;
use crate::usecases::ports::UiProcess;

pub struct ProcessSupervisor {
    link: Arc<SerialLink>,
    launcher: Option<Arc<dyn UiLauncher>>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
    grace_period: Duration,
    phase: SupervisorPhase,
}

impl ProcessSupervisor {
    /// `launcher` is `None` when the bridge runs headless; the supervisor
    /// then waits only for the shutdown flag.
    pub fn new(
        link: Arc<SerialLink>,
        launcher: Option<Arc<dyn UiLauncher>>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            link,
            launcher,
            shutdown,
            poll_interval: Duration::from_millis(100),
            grace_period: Duration::from_secs(5),
            phase: SupervisorPhase::Idle,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phase
    }

    fn enter(&mut self, phase: SupervisorPhase) {
        debug!(from = %self.phase, to = %phase, "Supervisor phase change");
        self.phase = phase;
    }

    /// Runs the bridge until the UI exits or shutdown is requested.
    ///
    /// A server that fails to start aborts before anything else is touched.
    /// A UI that fails to launch still goes through the full teardown.
    pub fn run<F>(&mut self, start_server: F) -> Result<(), LaunchError>
    where
        F: FnOnce() -> Result<Box<dyn ServerHandle>, LaunchError>,
    {
        let server = start_server()?;
        self.enter(SupervisorPhase::ServerStarted);

        let mut ui = match self.launcher.as_ref().map(|launcher| launcher.launch()) {
            Some(Ok(process)) => Some(process),
            Some(Err(err)) => {
                error!(error = %err, "Failed to launch UI process");
                self.enter(SupervisorPhase::ShuttingDown);
                self.teardown(server, None);
                return Err(err);
            }
            None => None,
        };
        self.enter(SupervisorPhase::UiRunning);

        self.monitor(ui.as_deref_mut());

        self.enter(SupervisorPhase::ShuttingDown);
        self.teardown(server, ui);
        Ok(())
    }

    fn monitor(&self, mut ui: Option<&mut (dyn UiProcess + 'static)>) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                return;
            }
            if let Some(process) = ui.as_deref_mut() {
                match process.is_running() {
                    Ok(true) => {}
                    Ok(false) => {
                        info!(pid = ?process.pid(), "UI process exited");
                        return;
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to poll UI process; shutting down");
                        return;
                    }
                }
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Stops the server, releases the serial link and only then stops the
    /// UI. Every step runs even if an earlier one failed.
    fn teardown(&mut self, server: Box<dyn ServerHandle>, ui: Option<Box<dyn UiProcess>>) {
        self.shutdown.store(true, Ordering::SeqCst);
        server.stop();

        if self.link.close() {
            info!("Serial link released");
        }

        if let Some(process) = ui {
            self.stop_ui(process);
        }
        self.enter(SupervisorPhase::Stopped);
        info!("Bridge stopped");
    }

    fn stop_ui(&self, mut process: Box<dyn UiProcess>) {
        let pid = process.pid();
        if let Err(err) = process.terminate() {
            warn!(pid = ?pid, error = %err, "Failed to terminate UI process");
        }

        let deadline = Instant::now() + self.grace_period;
        loop {
            match process.is_running() {
                Ok(false) => {
                    info!(pid = ?pid, "UI process stopped");
                    return;
                }
                Ok(true) if Instant::now() < deadline => thread::sleep(self.poll_interval),
                Ok(true) => break,
                Err(err) => {
                    warn!(pid = ?pid, error = %err, "Failed to poll UI process");
                    break;
                }
            }
        }

        warn!(
            pid = ?pid,
            grace_ms = self.grace_period.as_millis() as u64,
            "UI process still running after grace period; killing"
        );
        if let Err(err) = process.kill() {
            error!(pid = ?pid, error = %err, "Failed to kill UI process");
        }
    }
}
