//! Composition of the long-running bridge: serial link, control server,
//! companion UI and signal handling.

pub mod http_api;
pub mod supervisor;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use crate::infra::BridgeConfig;
use crate::infra::CommandUiLauncher;
use crate::infra::SystemSerialBackend;
use crate::usecases::ResponseCollector;
use crate::usecases::SerialBridge;
use crate::usecases::SerialLink;
use crate::usecases::ports::LaunchError;
use crate::usecases::ports::ServerHandle;
use crate::usecases::ports::UiLauncher;

use http_api::ApiConfig;
use http_api::start_api_server;
use supervisor::ProcessSupervisor;

pub fn start_bridge(config: BridgeConfig, with_ui: bool) -> Result<(), LaunchError> {
    let shutdown = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    let signal_handler = crate::infra::signal_handler::SignalHandler::setup(Arc::clone(&shutdown))?;

    let link = Arc::new(SerialLink::new(Arc::new(SystemSerialBackend)));
    let bridge = Arc::new(SerialBridge::new(
        Arc::clone(&link),
        ResponseCollector::new(config.response_timeout()),
    ));

    let launcher: Option<Arc<dyn UiLauncher>> = if with_ui {
        Some(Arc::new(CommandUiLauncher::from_command_line(
            config.ui_command(),
            config.document_root(),
        )?))
    } else {
        None
    };

    info!(
        listen = %config.listen(),
        root = %config.document_root().display(),
        ui = with_ui,
        pid = std::process::id(),
        "Starting drone bridge"
    );

    let api_config = ApiConfig::new(config.listen(), config.document_root());
    let server_shutdown = Arc::clone(&shutdown);
    let mut supervisor = ProcessSupervisor::new(link, launcher, shutdown)
        .with_poll_interval(config.poll_interval())
        .with_grace_period(config.ui_grace_period());

    let result = supervisor.run(move || {
        let listen = api_config.listen().to_string();
        let handle = start_api_server(bridge, server_shutdown, api_config)
            .map_err(|e| e.into_launch_error(&listen))?;
        info!(addr = %handle.local_addr(), "Control server ready");
        Ok(Box::new(handle) as Box<dyn ServerHandle>)
    });

    #[cfg(unix)]
    signal_handler.close();

    result
}
