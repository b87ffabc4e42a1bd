//! Ownership of the single serial link shared by the server and supervisor.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};

use crate::common::mutex_lock_or_recover;
use crate::domain::LinkStatus;
use crate::domain::PortDescriptor;
use crate::usecases::ports::LinkError;
use crate::usecases::ports::SerialBackend;
use crate::usecases::ports::SerialDevice;

/// A device opened at a specific rate. Only reachable through
/// [`SerialLink::exchange`] so callers hold the link lock while using it.
pub struct OpenLink {
    port: String,
    baud_rate: u32,
    device: Box<dyn SerialDevice>,
}

impl OpenLink {
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.device
            .write_all(bytes)
            .map_err(|e| LinkError::io("write", e))
    }

    pub fn flush(&mut self) -> Result<(), LinkError> {
        self.device.flush().map_err(|e| LinkError::io("flush", e))
    }

    pub fn bytes_pending(&mut self) -> Result<usize, LinkError> {
        self.device
            .bytes_pending()
            .map_err(|e| LinkError::io("read", e))
    }

    pub fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, LinkError> {
        self.device
            .read_line(timeout)
            .map_err(|e| LinkError::io("read", e))
    }
}

/// Process-wide holder of at most one open link.
///
/// `snapshot` mirrors the link state and is only written while `current` is
/// held, so status reads never wait behind an in-flight query.
pub struct SerialLink {
    backend: Arc<dyn SerialBackend>,
    current: Mutex<Option<OpenLink>>,
    snapshot: Mutex<LinkStatus>,
}

impl SerialLink {
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
            snapshot: Mutex::new(LinkStatus::disconnected()),
        }
    }

    fn publish(&self, status: LinkStatus) {
        *mutex_lock_or_recover(&self.snapshot) = status;
    }

    pub fn list_ports(&self) -> Result<Vec<PortDescriptor>, LinkError> {
        self.backend.list_ports()
    }

    /// Opens `port`, releasing any previously open link first.
    ///
    /// The lock is held across close and open so no request can observe a
    /// half-switched link.
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<LinkStatus, LinkError> {
        if baud_rate == 0 {
            return Err(LinkError::Connection {
                port: port.to_string(),
                reason: "baud rate must be positive".to_string(),
            });
        }

        let mut current = mutex_lock_or_recover(&self.current);
        if let Some(previous) = current.take() {
            info!(port = %previous.port, "Closing previous serial link");
            drop(previous);
            self.publish(LinkStatus::disconnected());
        }

        let device = self.backend.open(port, baud_rate)?;
        info!(port = %port, baudrate = baud_rate, "Serial link opened");
        *current = Some(OpenLink {
            port: port.to_string(),
            baud_rate,
            device,
        });
        let status = LinkStatus {
            connected: true,
            port: Some(port.to_string()),
            baudrate: Some(baud_rate),
        };
        self.publish(status.clone());
        Ok(status)
    }

    /// Runs `f` with exclusive access to the open link.
    pub fn exchange<R>(
        &self,
        f: impl FnOnce(&mut OpenLink) -> Result<R, LinkError>,
    ) -> Result<R, LinkError> {
        let mut current = mutex_lock_or_recover(&self.current);
        match current.as_mut() {
            Some(link) => f(link),
            None => Err(LinkError::NotConnected),
        }
    }

    pub fn write(&self, bytes: &[u8]) -> Result<(), LinkError> {
        self.exchange(|link| link.write(bytes))
    }

    pub fn read_line(&self, timeout: Duration) -> Result<Option<String>, LinkError> {
        self.exchange(|link| link.read_line(timeout))
    }

    /// Releases the link. Returns whether one was open.
    pub fn close(&self) -> bool {
        let mut current = mutex_lock_or_recover(&self.current);
        match current.take() {
            Some(link) => {
                info!(port = %link.port, baudrate = link.baud_rate, "Serial link closed");
                self.publish(LinkStatus::disconnected());
                true
            }
            None => {
                debug!("Serial link already closed");
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        mutex_lock_or_recover(&self.current).is_some()
    }

    /// Last published link state. Does not wait for the link lock.
    pub fn status(&self) -> LinkStatus {
        mutex_lock_or_recover(&self.snapshot).clone()
    }
}
