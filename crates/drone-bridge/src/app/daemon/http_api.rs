//! HTTP control surface consumed by the UI.

use axum::Json;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info, warn};

use crate::domain::CommandOutcome;
use crate::domain::DEFAULT_BAUD_RATE;
use crate::domain::LinkStatus;
use crate::domain::PortDescriptor;
use crate::usecases::SerialBridge;
use crate::usecases::ports::ServerHandle;

mod error;
mod static_files;

pub(crate) use error::ApiError;
pub(crate) use error::ApiServerError;
use static_files::content_type_for;
use static_files::resolve_static_path;

const API_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const SHUTDOWN_FLAG_POLL: Duration = Duration::from_millis(100);
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);
const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

#[derive(Debug, Clone)]
pub(crate) struct ApiConfig {
    listen: String,
    document_root: PathBuf,
}

impl ApiConfig {
    pub fn new(listen: impl Into<String>, document_root: impl Into<PathBuf>) -> Self {
        Self {
            listen: listen.into(),
            document_root: document_root.into(),
        }
    }

    pub fn listen(&self) -> &str {
        &self.listen
    }
}

pub(crate) struct ApiServerHandle {
    shutdown_tx: Option<watch::Sender<bool>>,
    join: Option<thread::JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl ApiServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits, bounded, for in-flight
    /// requests to finish.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(join) = self.join.take() {
            let (done_tx, done_rx) = std_mpsc::channel();
            let _ = thread::Builder::new()
                .name("bridge-api-shutdown".to_string())
                .spawn(move || {
                    let _ = join.join();
                    let _ = done_tx.send(());
                });
            if done_rx.recv_timeout(API_SHUTDOWN_TIMEOUT * 2).is_err() {
                warn!("Control server did not stop within shutdown timeout");
            } else {
                info!("Control server stopped");
            }
        }
    }
}

impl ServerHandle for ApiServerHandle {
    fn stop(self: Box<Self>) {
        (*self).shutdown();
    }
}

struct ApiState {
    bridge: Arc<SerialBridge>,
    shutdown: Arc<AtomicBool>,
    document_root: PathBuf,
}

#[derive(Deserialize)]
struct ConnectRequest {
    port: String,
    #[serde(default = "default_baud_rate")]
    baudrate: u32,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

#[derive(Deserialize)]
struct SendCommandRequest {
    command: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum SendCommandResponse {
    Sent {
        status: &'static str,
        command: String,
    },
    Replied {
        response: Vec<String>,
    },
    NoResponse {
        error: &'static str,
    },
}

impl From<CommandOutcome> for SendCommandResponse {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Sent { command } => SendCommandResponse::Sent {
                status: "sent",
                command,
            },
            CommandOutcome::Replied { lines } => SendCommandResponse::Replied { response: lines },
            CommandOutcome::NoResponse => SendCommandResponse::NoResponse {
                error: "No response",
            },
        }
    }
}

/// Binds `config.listen` and serves the API on a dedicated thread.
///
/// Binding happens on the caller's thread so an unusable address fails
/// startup instead of a background thread.
pub(crate) fn start_api_server(
    bridge: Arc<SerialBridge>,
    shutdown_flag: Arc<AtomicBool>,
    config: ApiConfig,
) -> Result<ApiServerHandle, ApiServerError> {
    let (listener, local_addr) = bind_listener(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = build_router(
        bridge,
        Arc::clone(&shutdown_flag),
        config.document_root.clone(),
    );
    let shutdown_tx_for_thread = shutdown_tx.clone();

    let join = thread::Builder::new()
        .name("bridge-api".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("bridge-api-worker")
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    error!(error = %err, "Failed to build control server runtime");
                    shutdown_flag.store(true, Ordering::SeqCst);
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match TcpListener::from_std(listener) {
                    Ok(l) => l,
                    Err(err) => {
                        error!(error = %err, "Failed to create async listener");
                        shutdown_flag.store(true, Ordering::SeqCst);
                        return;
                    }
                };
                info!(addr = %local_addr, "Control server listening");
                let mut shutdown_rx_server = shutdown_rx.clone();
                let mut shutdown_rx_wait = shutdown_rx.clone();
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx_server.changed().await;
                });
                let mut server_task = tokio::spawn(async move { server.await });

                let flag = Arc::clone(&shutdown_flag);
                let flag_task = tokio::spawn(async move {
                    while !flag.load(Ordering::Relaxed) {
                        tokio::time::sleep(SHUTDOWN_FLAG_POLL).await;
                    }
                    let _ = shutdown_tx_for_thread.send(true);
                });

                tokio::select! {
                    join_result = &mut server_task => {
                        match join_result {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => error!(error = %err, "Control server failed"),
                            Err(err) => error!(error = %err, "Control server task failed"),
                        }
                        shutdown_flag.store(true, Ordering::SeqCst);
                    }
                    changed = shutdown_rx_wait.changed() => {
                        if changed.is_err() {
                            warn!("Control server shutdown channel closed");
                        }
                        match tokio::time::timeout(API_SHUTDOWN_TIMEOUT, &mut server_task).await {
                            Ok(_) => debug!("In-flight requests drained"),
                            Err(_) => {
                                warn!(
                                    timeout_ms = API_SHUTDOWN_TIMEOUT.as_millis() as u64,
                                    "Control server shutdown timed out; aborting"
                                );
                                server_task.abort();
                            }
                        }
                    }
                }
                flag_task.abort();
            });
            runtime.shutdown_timeout(API_SHUTDOWN_TIMEOUT);
        })
        .map_err(|e| ApiServerError::Io {
            operation: "spawn server thread",
            source: e,
        })?;

    Ok(ApiServerHandle {
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
        local_addr,
    })
}

fn build_router(
    bridge: Arc<SerialBridge>,
    shutdown: Arc<AtomicBool>,
    document_root: PathBuf,
) -> axum::Router {
    let state = Arc::new(ApiState {
        bridge,
        shutdown,
        document_root,
    });

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    axum::Router::new()
        .route(
            "/list_ports",
            get(list_ports_handler).options(preflight_handler).fallback(not_found_handler),
        )
        .route(
            "/connect",
            post(connect_handler).options(preflight_handler).fallback(not_found_handler),
        )
        .route(
            "/send_command",
            post(send_command_handler)
                .options(preflight_handler)
                .fallback(not_found_handler),
        )
        .route(
            "/status",
            get(status_handler).options(preflight_handler).fallback(not_found_handler),
        )
        .route(
            "/shutdown",
            post(shutdown_handler).options(preflight_handler).fallback(not_found_handler),
        )
        .fallback(static_handler)
        .layer(cors)
        // Preflight headers on every response, not only OPTIONS.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .with_state(state)
}

async fn list_ports_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<PortDescriptor>>, ApiError> {
    let bridge = Arc::clone(&state.bridge);
    let ports = run_blocking(move || Ok(bridge.list_ports()?)).await?;
    debug!(count = ports.len(), "Listed serial ports");
    Ok(Json(ports))
}

async fn connect_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let request: ConnectRequest = parse_body(&body)?;
    let bridge = Arc::clone(&state.bridge);
    run_blocking(move || Ok(bridge.connect(&request.port, request.baudrate)?)).await?;
    Ok(Json(StatusResponse {
        status: "connected",
    }))
}

async fn send_command_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SendCommandResponse>, ApiError> {
    let request: SendCommandRequest = parse_body(&body)?;
    let bridge = Arc::clone(&state.bridge);
    let outcome = run_blocking(move || Ok(bridge.send_command(&request.command)?)).await?;
    Ok(Json(outcome.into()))
}

async fn status_handler(State(state): State<Arc<ApiState>>) -> Json<LinkStatus> {
    Json(state.bridge.status())
}

async fn shutdown_handler(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    info!("Shutdown requested over HTTP");
    state.shutdown.store(true, Ordering::SeqCst);
    Json(StatusResponse {
        status: "shutting_down",
    })
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

async fn static_handler(
    State(state): State<Arc<ApiState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    let path = match resolve_static_path(&state.document_root, uri.path()) {
        Ok(path) => path,
        Err(err) => {
            warn!(path = %uri.path(), "Rejected static path outside document root");
            return Err(err.into());
        }
    };

    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        error!(path = %path.display(), error = %err, "Failed to read static file");
        ApiError::Internal(format!("Failed to read {}: {}", uri.path(), err))
    })?;
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(bytes)
    };
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], body).into_response())
}

/// Decodes a JSON body; an empty body counts as `{}`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value: serde_json::Value = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidBody("Invalid JSON".to_string()))?
    };
    serde_json::from_value(value).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

/// Runs serial work on the blocking pool. A panic becomes a 500 response.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "Serial task failed");
            Err(ApiError::Internal("Internal server error".to_string()))
        }
    }
}

fn bind_listener(
    config: &ApiConfig,
) -> Result<(std::net::TcpListener, SocketAddr), ApiServerError> {
    let invalid = |message: String| ApiServerError::InvalidListen {
        listen: config.listen.clone(),
        message,
    };
    let addr = config
        .listen
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no resolved address".to_string()))?;

    let listener = std::net::TcpListener::bind(addr).map_err(|e| ApiServerError::Io {
        operation: "bind",
        source: e,
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|e| ApiServerError::Io {
            operation: "set non-blocking",
            source: e,
        })?;
    let local_addr = listener.local_addr().map_err(|e| ApiServerError::Io {
        operation: "read local address",
        source: e,
    })?;
    Ok((listener, local_addr))
}
