use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::Command;
use crate::domain::CommandOutcome;
use crate::domain::LinkStatus;
use crate::domain::PortDescriptor;
use crate::usecases::collector::ResponseCollector;
use crate::usecases::link::SerialLink;
use crate::usecases::ports::LinkError;

/// Request-level operations of the control server.
pub struct SerialBridge {
    link: Arc<SerialLink>,
    collector: ResponseCollector,
}

impl SerialBridge {
    pub fn new(link: Arc<SerialLink>, collector: ResponseCollector) -> Self {
        Self { link, collector }
    }

    pub fn link(&self) -> &Arc<SerialLink> {
        &self.link
    }

    pub fn list_ports(&self) -> Result<Vec<PortDescriptor>, LinkError> {
        self.link.list_ports()
    }

    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<LinkStatus, LinkError> {
        self.link.connect(port, baud_rate)
    }

    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }

    /// Writes one command line. Queries wait for a reply batch; everything
    /// else is flushed and acknowledged immediately.
    pub fn send_command(&self, raw: &str) -> Result<CommandOutcome, LinkError> {
        let command = Command::parse(raw);
        let result = self.link.exchange(|link| {
            link.write(&command.to_wire())?;
            if !command.is_query() {
                link.flush()?;
                return Ok(CommandOutcome::Sent {
                    command: command.text().trim().to_string(),
                });
            }
            let batch = self.collector.collect(link)?;
            if batch.is_complete() {
                Ok(CommandOutcome::Replied {
                    lines: batch.into_lines(),
                })
            } else {
                Ok(CommandOutcome::NoResponse)
            }
        });

        match &result {
            Ok(outcome) => debug!(
                command = %command.text(),
                kind = %command.kind(),
                ?outcome,
                "Command sent"
            ),
            Err(err) => warn!(
                command = %command.text(),
                operation = err.operation(),
                error = %err,
                "Command failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::ports::test_support::MockSerialBackend;
    use std::time::Duration;
    use std::time::Instant;

    fn bridge(
        backend: MockSerialBackend,
        deadline: Duration,
    ) -> (SerialBridge, Arc<MockSerialBackend>) {
        let backend = Arc::new(backend);
        let link = Arc::new(SerialLink::new(backend.clone()));
        (
            SerialBridge::new(link, ResponseCollector::new(deadline)),
            backend,
        )
    }

    #[test]
    fn test_fire_and_forget_returns_without_waiting() {
        let (bridge, backend) = bridge(MockSerialBackend::new(), Duration::from_secs(5));
        bridge.connect("/dev/ttyUSB0", 115_200).unwrap();

        let started = Instant::now();
        let outcome = bridge.send_command("ARM").unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Sent {
                command: "ARM".to_string()
            }
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(backend.written(), vec!["ARM".to_string()]);
    }

    #[test]
    fn test_sent_command_is_reported_trimmed() {
        let (bridge, _backend) = bridge(MockSerialBackend::new(), Duration::from_millis(50));
        bridge.connect("/dev/ttyUSB0", 115_200).unwrap();

        let outcome = bridge.send_command("  LAND \r\n").unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Sent {
                command: "LAND".to_string()
            }
        );
    }

    #[test]
    fn test_query_returns_reply_lines() {
        let (bridge, _backend) = bridge(
            MockSerialBackend::new().with_reply("STATUS?", &["OK", "READY"]),
            Duration::from_millis(500),
        );
        bridge.connect("/dev/ttyUSB0", 115_200).unwrap();

        assert_eq!(
            bridge.send_command("STATUS?").unwrap(),
            CommandOutcome::Replied {
                lines: vec!["OK".to_string(), "READY".to_string()]
            }
        );
    }

    #[test]
    fn test_silent_query_is_no_response() {
        let deadline = Duration::from_millis(60);
        let (bridge, _backend) = bridge(MockSerialBackend::new(), deadline);
        bridge.connect("/dev/ttyUSB0", 115_200).unwrap();

        let started = Instant::now();
        let outcome = bridge.send_command("ALT?").unwrap();

        assert_eq!(outcome, CommandOutcome::NoResponse);
        assert!(started.elapsed() >= deadline);
    }

    #[test]
    fn test_send_without_connect_is_not_connected() {
        let (bridge, backend) = bridge(MockSerialBackend::new(), Duration::from_millis(50));

        let err = bridge.send_command("ARM").unwrap_err();

        assert!(err.is_client_error());
        assert!(backend.written().is_empty());
    }
}
