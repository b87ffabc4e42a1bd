//! Simulated serial device for link and server tests.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use std::time::Instant;

use super::EventLog;
use crate::domain::PortDescriptor;
use crate::usecases::ports::LinkError;
use crate::usecases::ports::SerialBackend;
use crate::usecases::ports::SerialDevice;

pub struct MockSerialBackend {
    ports: Vec<PortDescriptor>,
    list_error: Option<String>,
    open_error: Option<String>,
    replies: HashMap<String, Vec<(Duration, String)>>,
    fail_writes: bool,
    events: EventLog,
    opened: Mutex<Vec<(String, u32)>>,
    open_devices: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<String>>>,
}

impl Default for MockSerialBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerialBackend {
    pub fn new() -> Self {
        Self {
            ports: Vec::new(),
            list_error: None,
            open_error: None,
            replies: HashMap::new(),
            fail_writes: false,
            events: EventLog::new(),
            opened: Mutex::new(Vec::new()),
            open_devices: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_port(mut self, port: &str, description: &str, hwid: &str) -> Self {
        self.ports.push(PortDescriptor {
            port: port.to_string(),
            description: description.to_string(),
            hwid: hwid.to_string(),
        });
        self
    }

    pub fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn with_open_error(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    /// Lines the device sends back right after receiving `command`.
    pub fn with_reply(self, command: &str, lines: &[&str]) -> Self {
        self.with_delayed_reply(command, Duration::ZERO, lines)
    }

    /// Lines that arrive `delay` after `command` is written, queued behind
    /// any earlier reply for the same command.
    pub fn with_delayed_reply(mut self, command: &str, delay: Duration, lines: &[&str]) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .extend(lines.iter().map(|l| (delay, l.to_string())));
        self
    }

    pub fn with_write_failure(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_devices(&self) -> usize {
        self.open_devices.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }
}

impl SerialBackend for MockSerialBackend {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>, LinkError> {
        match &self.list_error {
            Some(message) => Err(LinkError::Enumeration(message.clone())),
            None => Ok(self.ports.clone()),
        }
    }

    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, LinkError> {
        if let Some(reason) = &self.open_error {
            return Err(LinkError::Connection {
                port: port.to_string(),
                reason: reason.clone(),
            });
        }
        self.opened
            .lock()
            .unwrap()
            .push((port.to_string(), baud_rate));
        self.open_devices.fetch_add(1, Ordering::SeqCst);
        self.events.push(format!("link open {port}"));
        Ok(Box::new(MockSerialDevice {
            port: port.to_string(),
            replies: self.replies.clone(),
            rx: VecDeque::new(),
            fail_writes: self.fail_writes,
            events: self.events.clone(),
            open_devices: Arc::clone(&self.open_devices),
            written: Arc::clone(&self.written),
        }))
    }
}

struct MockSerialDevice {
    port: String,
    replies: HashMap<String, Vec<(Duration, String)>>,
    rx: VecDeque<(Instant, String)>,
    fail_writes: bool,
    events: EventLog,
    open_devices: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<String>>>,
}

impl SerialDevice for MockSerialDevice {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            ));
        }
        let line = String::from_utf8_lossy(bytes)
            .trim_end_matches('\n')
            .to_string();
        if let Some(reply) = self.replies.get(&line) {
            let written_at = Instant::now();
            self.rx.extend(
                reply
                    .iter()
                    .map(|(delay, text)| (written_at + *delay, text.clone())),
            );
        }
        self.written.lock().unwrap().push(line);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Only lines whose arrival time has passed count as received.
    fn bytes_pending(&mut self) -> io::Result<usize> {
        let now = Instant::now();
        Ok(self
            .rx
            .iter()
            .take_while(|(arrives_at, _)| *arrives_at <= now)
            .map(|(_, line)| line.len() + 1)
            .sum())
    }

    fn read_line(&mut self, _timeout: Duration) -> io::Result<Option<String>> {
        match self.rx.front() {
            Some((arrives_at, _)) if *arrives_at <= Instant::now() => Ok(self
                .rx
                .pop_front()
                .map(|(_, line)| line.trim().to_string())),
            _ => Ok(None),
        }
    }
}

impl Drop for MockSerialDevice {
    fn drop(&mut self) {
        self.open_devices.fetch_sub(1, Ordering::SeqCst);
        self.events.push(format!("link closed {}", self.port));
    }
}
