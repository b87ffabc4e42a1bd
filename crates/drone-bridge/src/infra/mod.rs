pub mod config;
pub mod process;
pub mod serial;
#[cfg(unix)]
pub mod signal_handler;

pub use config::BridgeConfig;
pub use process::CommandUiLauncher;
pub use serial::SystemSerialBackend;
