#![allow(dead_code, reason = "Test harness helpers are used selectively.")]

//! Test harness exports.

use assert_cmd::Command;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;
use std::time::Instant;

pub const BRIDGE_BIN: &str = env!("CARGO_BIN_EXE_drone-bridge");

/// Bridge command with logging and configuration isolated from the host.
pub fn drone_bridge_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("drone-bridge"));
    isolate_env(&mut cmd, root);
    cmd
}

pub fn isolate_env(cmd: &mut Command, root: &Path) {
    cmd.env_remove("DRONE_BRIDGE_LISTEN")
        .env_remove("DRONE_BRIDGE_UI_COMMAND")
        .env_remove("DRONE_BRIDGE_LOG")
        .env("DRONE_BRIDGE_ROOT", root)
        .env("RUST_LOG", "warn");
}

/// A loopback address nothing is listening on at the time of the call.
pub fn free_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr")
}

/// Sends a bare HTTP/1.1 request and returns the raw response text.
pub fn http_request(addr: SocketAddr, method: &str, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect to bridge");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set read timeout");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).expect("write request");
    let mut response = String::new();
    stream.read_to_string(&mut response).expect("read response");
    response
}

pub fn wait_for_listener(addr: SocketAddr, within: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < within {
        if TcpStream::connect(addr).is_ok() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}
