#![cfg(feature = "cli")]

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use hvaclink::frame::{FrameConfig, Packet};
use hvaclink::server::Client;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind");
    listener.local_addr().expect("local addr").port()
}

fn wait_for_connect(addr: SocketAddr, timeout: Duration) -> io::Result<Client> {
    let start = Instant::now();
    loop {
        match Client::connect_addr(addr, FrameConfig::default()) {
            Ok(client) => return Ok(client),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

struct ServeProcess {
    child: Child,
    addr: SocketAddr,
}

impl ServeProcess {
    fn start(extra: &[&str]) -> Self {
        let port = free_port();
        let child = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
            .args(["--log-level", "error", "serve", "--host", "127.0.0.1"])
            .args(["--port", &port.to_string()])
            .args(extra)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("serve command should start");
        Self {
            child,
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
        }
    }
}

impl Drop for ServeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn serve_answers_zone_requests() {
    let server = ServeProcess::start(&["--set-temperature", "21"]);
    let mut client =
        wait_for_connect(server.addr, Duration::from_secs(5)).expect("client should connect");

    client.send("GZ1", "19").expect("send");
    let reply = client.recv(Some(Duration::from_secs(3))).expect("GZ1 reply");
    assert_eq!(reply, Packet::new("GZ1", "21"));

    client.send_raw(b"noise*GZ2||&").expect("send");
    let reply = client.recv(Some(Duration::from_secs(3))).expect("GZ2 reply");
    assert_eq!(reply, Packet::new("GZ2", "10"));
}

#[test]
fn send_prints_raw_response() {
    let server = ServeProcess::start(&[]);
    drop(wait_for_connect(server.addr, Duration::from_secs(5)).expect("server should listen"));

    let output = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
        .args(["--format", "raw", "--log-level", "error", "send"])
        .arg(server.addr.to_string())
        .args(["--command", "GZ1", "--data", "18", "--wait"])
        .output()
        .expect("send command should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "*GZ1|10|&");
}

#[test]
fn send_json_output_has_fields() {
    let server = ServeProcess::start(&[]);
    drop(wait_for_connect(server.addr, Duration::from_secs(5)).expect("server should listen"));

    let output = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
        .args(["--format", "json", "--log-level", "error", "send"])
        .arg(server.addr.to_string())
        .args(["-c", "GZ2", "--wait"])
        .output()
        .expect("send command should run");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["command"], "GZ2");
    assert_eq!(value["data"], "10");
}

#[test]
fn send_wait_times_out_on_unknown_command() {
    let server = ServeProcess::start(&[]);
    drop(wait_for_connect(server.addr, Duration::from_secs(5)).expect("server should listen"));

    let status = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
        .args(["--log-level", "error", "send"])
        .arg(server.addr.to_string())
        .args(["-c", "NOPE", "--wait", "--wait-timeout", "300ms"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("send command should run");

    assert_eq!(status.code(), Some(124));
}

#[test]
fn serve_rejects_empty_host() {
    let status = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
        .args(["--log-level", "error", "serve", "--host", ""])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("serve command should run");
    assert_eq!(status.code(), Some(64));
}

#[test]
fn serve_rejects_out_of_range_ports() {
    for port in ["0", "-1", "65536"] {
        let status = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
            .args(["--log-level", "error", "serve", "--port", port])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .expect("serve command should run");
        assert_eq!(status.code(), Some(64), "port {port}");
    }
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_hvaclink"))
        .arg("version")
        .output()
        .expect("version command should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("hvaclink {}", env!("CARGO_PKG_VERSION"))
    );
}
