use std::io;
use std::time::Duration;

use crate::domain::PortDescriptor;
use crate::usecases::ports::LinkError;

/// An open byte channel to the device. Dropping it releases the port.
pub trait SerialDevice: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Bytes received but not yet returned by `read_line`.
    fn bytes_pending(&mut self) -> io::Result<usize>;

    /// Returns the next complete line, or `None` once `timeout` passes
    /// without one. Lines are trimmed of surrounding whitespace.
    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;
}

pub trait SerialBackend: Send + Sync {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>, LinkError>;

    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, LinkError>;
}
