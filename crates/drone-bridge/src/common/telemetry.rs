#![expect(clippy::print_stderr, reason = "Tracing not initialized yet")]

//! Tracing subscriber setup.
//!
//! `RUST_LOG` selects the filter. `DRONE_BRIDGE_LOG` redirects output to a
//! file, `DRONE_BRIDGE_LOG_FORMAT=json` switches to JSON lines and
//! `DRONE_BRIDGE_LOG_STREAM=stdout` moves console output off stderr.

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Keeps the background log writer alive; drop it only at process exit.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogStream {
    Stderr,
    Stdout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    file: Option<PathBuf>,
    format: LogFormat,
    stream: LogStream,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let normalized = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
        };
        let format = match normalized("DRONE_BRIDGE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let stream = match normalized("DRONE_BRIDGE_LOG_STREAM").as_deref() {
            Some("stdout") => LogStream::Stdout,
            _ => LogStream::Stderr,
        };
        let file = lookup("DRONE_BRIDGE_LOG")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        Self {
            file,
            format,
            stream,
        }
    }
}

fn console_writer(stream: LogStream) -> (BoxMakeWriter, bool) {
    match stream {
        LogStream::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            std::io::stdout().is_terminal(),
        ),
        LogStream::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    }
}

pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let settings = LogSettings::from_env();

    let (writer, guard, ansi) = match settings.file.as_ref() {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to open log file {}: {}",
                    path.display(),
                    err
                );
                let (writer, ansi) = console_writer(settings.stream);
                (writer, None, ansi)
            }
        },
        None => {
            let (writer, ansi) = console_writer(settings.stream);
            (writer, None, ansi)
        }
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .json()
                .with_writer(writer)
                .finish(),
        ),
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_thread_names(true)
                .with_ansi(ansi)
                .with_writer(writer)
                .finish(),
        ),
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return TelemetryGuard { _guard: None };
    }

    TelemetryGuard { _guard: guard }
}
