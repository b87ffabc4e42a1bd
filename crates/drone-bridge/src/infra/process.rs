//! Companion UI process spawned from a configurable command line.

use std::io;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;

use tracing::{debug, info};

use crate::usecases::ports::LaunchError;
use crate::usecases::ports::UiLauncher;
use crate::usecases::ports::UiProcess;

pub const DEFAULT_UI_COMMAND: &str = "npx electron .";

#[cfg(unix)]
fn send_sigterm(pid: u32) -> io::Result<()> {
    let pid_t: libc::pid_t = pid
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    let result = unsafe { libc::kill(pid_t, libc::SIGTERM) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[derive(Debug, Clone)]
pub struct CommandUiLauncher {
    command_line: String,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandUiLauncher {
    /// Splits `line` with shell quoting rules; the first word is the program.
    pub fn from_command_line(
        line: &str,
        working_dir: impl Into<PathBuf>,
    ) -> Result<Self, LaunchError> {
        let invalid = |reason: String| LaunchError::InvalidUiCommand {
            command: line.to_string(),
            reason,
        };
        let words = shell_words::split(line).map_err(|e| invalid(e.to_string()))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| invalid("command is empty".to_string()))?;

        Ok(Self {
            command_line: line.to_string(),
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.into(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl UiLauncher for CommandUiLauncher {
    fn launch(&self) -> Result<Box<dyn UiProcess>, LaunchError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::UiSpawn {
                command: self.command_line.clone(),
                reason: e.to_string(),
            })?;

        info!(
            pid = child.id(),
            command = %self.command_line,
            cwd = %self.working_dir.display(),
            "UI process launched"
        );
        Ok(Box::new(ChildUiProcess { child }))
    }
}

pub struct ChildUiProcess {
    child: Child,
}

impl ChildUiProcess {
    fn has_exited(&mut self) -> io::Result<bool> {
        match self.child.try_wait()? {
            Some(status) => {
                debug!(pid = self.child.id(), %status, "UI process exited");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl UiProcess for ChildUiProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn is_running(&mut self) -> io::Result<bool> {
        Ok(!self.has_exited()?)
    }

    fn terminate(&mut self) -> io::Result<()> {
        // A reaped pid may already belong to another process.
        if self.has_exited()? {
            return Ok(());
        }
        terminate_child(&mut self.child)
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        self.child.wait()?;
        Ok(())
    }
}

#[cfg(unix)]
fn terminate_child(child: &mut Child) -> io::Result<()> {
    send_sigterm(child.id())
}

#[cfg(not(unix))]
fn terminate_child(child: &mut Child) -> io::Result<()> {
    child.kill()
}
