pub mod errors;
pub mod process;
pub mod serial;
#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{LaunchError, LinkError, PathError};
pub use process::{ServerHandle, UiLauncher, UiProcess};
pub use serial::{SerialBackend, SerialDevice};
