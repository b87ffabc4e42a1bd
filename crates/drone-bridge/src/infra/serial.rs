//! Serial transport backed by the `serialport` crate.

use std::io;
use std::io::Read;
use std::io::Write;
use std::time::Duration;
use std::time::Instant;

use serialport::SerialPort;
use serialport::SerialPortInfo;
use serialport::SerialPortType;
use tracing::debug;

use crate::domain::PortDescriptor;
use crate::usecases::ports::LinkError;
use crate::usecases::ports::SerialBackend;
use crate::usecases::ports::SerialDevice;

/// Upper bound on a single OS read so line polling stays responsive.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 256;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialBackend;

impl SerialBackend for SystemSerialBackend {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>, LinkError> {
        let ports =
            serialport::available_ports().map_err(|e| LinkError::Enumeration(e.to_string()))?;
        debug!(count = ports.len(), "Enumerated serial ports");
        Ok(ports.into_iter().map(describe_port).collect())
    }

    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, LinkError> {
        let handle = serialport::new(port, baud_rate)
            .timeout(PORT_READ_TIMEOUT)
            .open()
            .map_err(|e| LinkError::Connection {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SystemSerialDevice {
            port: handle,
            pending: Vec::new(),
        }))
    }
}

pub fn describe_port(info: SerialPortInfo) -> PortDescriptor {
    let (description, hwid) = match info.port_type {
        SerialPortType::UsbPort(usb) => {
            let description = usb
                .product
                .or(usb.manufacturer)
                .unwrap_or_else(|| "n/a".to_string());
            let mut hwid = format!("USB VID:PID={:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(serial) = usb.serial_number {
                hwid.push_str(&format!(" SER={serial}"));
            }
            (description, hwid)
        }
        SerialPortType::PciPort => ("n/a".to_string(), "PCI".to_string()),
        SerialPortType::BluetoothPort => ("n/a".to_string(), "BLUETOOTH".to_string()),
        SerialPortType::Unknown => ("n/a".to_string(), "n/a".to_string()),
    };
    PortDescriptor {
        port: info.port_name,
        description,
        hwid,
    }
}

struct SystemSerialDevice {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialDevice for SystemSerialDevice {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn bytes_pending(&mut self) -> io::Result<usize> {
        let queued = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(self.pending.len() + queued as usize)
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(line) = take_line(&mut self.pending) {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            match self.port.read(&mut chunk) {
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Removes the first `\n`-terminated line from `buffer`, decoded lossily and
/// trimmed.
fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let end = buffer.iter().position(|b| *b == b'\n')?;
    let raw: Vec<u8> = buffer.drain(..=end).collect();
    Some(String::from_utf8_lossy(&raw).trim().to_string())
}
