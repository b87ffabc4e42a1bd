//! Domain types shared by the serial bridge and the supervisor.

use std::fmt;

use serde::Serialize;

/// Character that marks a command as expecting a reply from the device.
pub const QUERY_MARKER: char = '?';

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A serial device visible to the host at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    pub port: String,
    pub description: String,
    pub hwid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Query,
    FireAndForget,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::FireAndForget => "fire_and_forget",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of text destined for the device.
///
/// Line breaks inside the text are dropped so that a single command always
/// occupies exactly one line on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    kind: CommandKind,
}

impl Command {
    pub fn parse(raw: &str) -> Self {
        let text: String = raw.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        let kind = if text.contains(QUERY_MARKER) {
            CommandKind::Query
        } else {
            CommandKind::FireAndForget
        };
        Self { text, kind }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn is_query(&self) -> bool {
        self.kind == CommandKind::Query
    }

    /// Bytes written to the link: the text followed by a single `\n`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len() + 1);
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.push(b'\n');
        bytes
    }
}

/// Reply lines gathered for a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBatch {
    lines: Vec<String>,
    complete: bool,
}

impl ResponseBatch {
    pub fn complete(lines: Vec<String>) -> Self {
        Self {
            lines,
            complete: true,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            lines: Vec::new(),
            complete: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Outcome of sending a command over the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Sent { command: String },
    Replied { lines: Vec<String> },
    NoResponse,
}

/// Snapshot of the link for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    pub port: Option<String>,
    pub baudrate: Option<u32>,
}

impl LinkStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            port: None,
            baudrate: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorPhase {
    Idle,
    ServerStarted,
    UiRunning,
    ShuttingDown,
    Stopped,
}

impl SupervisorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ServerStarted => "server_started",
            Self::UiRunning => "ui_running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SupervisorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
