use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap::ValueHint;
use std::path::PathBuf;

const LONG_ABOUT: &str = "\
Bridge a serial-attached drone controller to a local HTTP API.\n\
\n\
The bridge serves a small JSON API and the UI's static files, starts the\n\
companion UI process and tears everything down when the UI exits.";

const AFTER_LONG_HELP: &str = r#"API:
    GET  /list_ports      Serial devices visible to the host
    POST /connect         {"port": "/dev/ttyUSB0", "baudrate": 115200}
    POST /send_command    {"command": "STATUS?"}  (a '?' waits for a reply)
    GET  /status          Current link state
    POST /shutdown        Stop the bridge

ENVIRONMENT:
    DRONE_BRIDGE_LISTEN               Listen address (default 127.0.0.1:5000)
    DRONE_BRIDGE_ROOT                 Document root (default: current directory)
    DRONE_BRIDGE_RESPONSE_TIMEOUT_MS  Reply deadline for queries (default 1000)
    DRONE_BRIDGE_POLL_INTERVAL_MS     UI liveness poll interval (default 100)
    DRONE_BRIDGE_UI_GRACE_SECS        Wait before killing the UI (default 5)
    DRONE_BRIDGE_UI_COMMAND           UI command line (default "npx electron .")
    DRONE_BRIDGE_LOG                  Write logs to this file
    DRONE_BRIDGE_LOG_FORMAT           text or json
    RUST_LOG                          Log filter (default info)

EXAMPLES:
    drone-bridge
    drone-bridge run --no-ui --listen 127.0.0.1:8080
    drone-bridge ports --format json"#;

#[derive(Parser)]
#[command(name = "drone-bridge")]
#[command(author, version, propagate_version = true)]
#[command(about = "Serial-to-HTTP bridge for drone ground control")]
#[command(long_about = LONG_ABOUT)]
#[command(after_long_help = AFTER_LONG_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, help_heading = "Debug Options")]
    pub verbose: bool,
}

impl Cli {
    /// Bare `drone-bridge` behaves like `drone-bridge run`.
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Serve the API and supervise the UI (default)
    Run(RunArgs),

    /// List serial ports and exit
    Ports {
        /// Output format (text or json)
        #[arg(
            short,
            long,
            value_enum,
            value_name = "FORMAT",
            default_value_t = OutputFormat::Text
        )]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Address for the HTTP API [env: DRONE_BRIDGE_LISTEN]
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Directory served as the UI document root [env: DRONE_BRIDGE_ROOT]
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Do not start the companion UI; run until interrupted
    #[arg(long)]
    pub no_ui: bool,

    /// Command line used to start the UI [env: DRONE_BRIDGE_UI_COMMAND]
    #[arg(long, value_name = "CMD", conflicts_with = "no_ui")]
    pub ui_command: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
