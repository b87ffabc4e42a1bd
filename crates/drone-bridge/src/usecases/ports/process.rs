use std::io;

use crate::usecases::ports::LaunchError;

/// Handle to the companion UI process. Only liveness is observed.
pub trait UiProcess: Send {
    fn pid(&self) -> Option<u32>;

    fn is_running(&mut self) -> io::Result<bool>;

    /// Politely asks the process to exit.
    fn terminate(&mut self) -> io::Result<()>;

    fn kill(&mut self) -> io::Result<()>;
}

pub trait UiLauncher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn UiProcess>, LaunchError>;
}

/// A running control server that can be asked to stop accepting work.
pub trait ServerHandle: Send {
    fn stop(self: Box<Self>);
}
