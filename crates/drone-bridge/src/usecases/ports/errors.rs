use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Serial port not connected")]
    NotConnected,
    #[error("Failed to open {port}: {reason}")]
    Connection { port: String, reason: String },
    #[error("Serial {operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to list ports: {0}")]
    Enumeration(String),
}

impl LinkError {
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        LinkError::Io { operation, source }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            LinkError::NotConnected => "send",
            LinkError::Connection { .. } => "connect",
            LinkError::Io { operation, .. } => *operation,
            LinkError::Enumeration(_) => "list_ports",
        }
    }

    /// True when the caller can fix the request without the device changing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, LinkError::NotConnected)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Invalid path: {0}")]
    OutsideRoot(String),
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to bind control server on {listen}: {reason}")]
    Bind { listen: String, reason: String },
    #[error("Control server thread failed: {0}")]
    ServerThread(String),
    #[error("Invalid UI command '{command}': {reason}")]
    InvalidUiCommand { command: String, reason: String },
    #[error("Failed to launch UI process '{command}': {reason}")]
    UiSpawn { command: String, reason: String },
    #[error("Failed to setup signal handler: {0}")]
    SignalSetup(String),
}
