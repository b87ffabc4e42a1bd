//! SIGINT/SIGTERM handling.

use signal_hook::consts::SIGINT;
use signal_hook::consts::SIGTERM;
use signal_hook::iterator::Handle;
use signal_hook::iterator::Signals;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use tracing::{debug, info};

use crate::usecases::ports::LaunchError;

/// Raises the shared shutdown flag on the first interrupt.
pub struct SignalHandler {
    signals: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalHandler {
    pub fn setup(shutdown: Arc<AtomicBool>) -> Result<Self, LaunchError> {
        let mut signals = Signals::new([SIGINT, SIGTERM])
            .map_err(|e| LaunchError::SignalSetup(e.to_string()))?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "Received signal, shutting down bridge");
                    shutdown.store(true, Ordering::SeqCst);
                }
            })
            .map_err(|e| LaunchError::SignalSetup(format!("failed to spawn listener: {e}")))?;

        Ok(Self {
            signals: handle,
            thread: Some(thread),
        })
    }

    /// Stops the listener thread.
    pub fn close(mut self) {
        self.signals.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("Signal listener thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::Instant;

    #[test]
    fn test_sigterm_raises_shutdown_flag() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler = SignalHandler::setup(Arc::clone(&shutdown)).unwrap();

        signal_hook::low_level::raise(SIGTERM).unwrap();

        let started = Instant::now();
        while !shutdown.load(Ordering::SeqCst) && started.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(shutdown.load(Ordering::SeqCst));
        handler.close();
    }
}
