#![expect(clippy::print_stdout, reason = "CLI output is emitted here")]
#![expect(clippy::print_stderr, reason = "CLI output is emitted here")]

//! CLI application layer and composition root wiring.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

pub mod commands;
pub mod daemon;

use crate::app::commands::Cli;
use crate::app::commands::Commands;
use crate::app::commands::OutputFormat;
use crate::app::commands::RunArgs;
use crate::app::daemon::start_bridge;
use crate::common::telemetry;
use crate::domain::PortDescriptor;
use crate::infra::BridgeConfig;
use crate::infra::SystemSerialBackend;
use crate::usecases::ports::LaunchError;
use crate::usecases::ports::LinkError;
use crate::usecases::ports::SerialBackend;

const PROGRAM_NAME: &str = "drone-bridge";

/// Exit codes following sysexits.h.
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const UNAVAILABLE: i32 = 69;
    pub const IOERR: i32 = 74;
    pub const CONFIG: i32 = 78;
}

pub struct Application;

impl Application {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self) -> Result<i32> {
        let cli = Cli::parse();
        let _telemetry = telemetry::init_tracing(if cli.verbose { "debug" } else { "info" });
        let command = cli.command_or_default();
        debug!(command = ?command, "CLI command parsed");

        let exit_code = match command {
            Commands::Run(args) => match start_bridge(bridge_config(args.clone()), !args.no_ui) {
                Ok(()) => exit_codes::SUCCESS,
                Err(err) => {
                    eprintln!("{}: Error: {}", PROGRAM_NAME, err);
                    exit_code_for_launch_error(&err)
                }
            },
            Commands::Ports { format } => match print_ports(&SystemSerialBackend, format) {
                Ok(()) => exit_codes::SUCCESS,
                Err(err) => {
                    eprintln!("{}: Error: {}", PROGRAM_NAME, err);
                    exit_code_for_link_error(&err)
                }
            },
        };
        Ok(exit_code)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment first, then command-line flags on top.
fn bridge_config(args: RunArgs) -> BridgeConfig {
    let mut config = BridgeConfig::from_env();
    if let Some(listen) = args.listen {
        config = config.with_listen(listen);
    }
    if let Some(root) = args.root {
        config = config.with_document_root(root);
    }
    if let Some(ui_command) = args.ui_command {
        config = config.with_ui_command(ui_command);
    }
    config
}

fn print_ports(backend: &dyn SerialBackend, format: OutputFormat) -> Result<(), LinkError> {
    let ports = backend.list_ports()?;
    println!("{}", render_ports(&ports, format));
    Ok(())
}

fn render_ports(ports: &[PortDescriptor], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(ports).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text if ports.is_empty() => "No serial ports found".to_string(),
        OutputFormat::Text => ports
            .iter()
            .map(|p| format!("{}\t{}\t{}", p.port, p.description, p.hwid))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn exit_code_for_launch_error(error: &LaunchError) -> i32 {
    match error {
        LaunchError::Bind { .. } => exit_codes::UNAVAILABLE,
        LaunchError::InvalidUiCommand { .. } => exit_codes::CONFIG,
        LaunchError::UiSpawn { .. } => exit_codes::UNAVAILABLE,
        LaunchError::ServerThread(_) | LaunchError::SignalSetup(_) => exit_codes::GENERAL_ERROR,
    }
}

fn exit_code_for_link_error(error: &LinkError) -> i32 {
    match error {
        LinkError::Enumeration(_) | LinkError::Io { .. } => exit_codes::IOERR,
        _ => exit_codes::GENERAL_ERROR,
    }
}
