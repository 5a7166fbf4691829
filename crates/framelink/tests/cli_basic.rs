#![cfg(all(unix, feature = "cli"))]

use std::net::{SocketAddr, TcpListener};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use framelink_channel::Channel;

/// Pick a currently-free loopback port. Slightly racy, but the acceptor
/// sets SO_REUSEADDR so the immediate rebind succeeds.
fn free_loopback_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("probe bind should succeed");
    listener.local_addr().expect("local addr should resolve")
}

fn connect_with_retry(channel: &Channel, addr: SocketAddr, timeout: Duration) {
    let start = Instant::now();
    loop {
        match channel.connect(addr) {
            Ok(()) => return,
            Err(err) => {
                assert!(
                    start.elapsed() < timeout,
                    "connect to CLI listener timed out: {err}"
                );
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

#[test]
fn listen_prints_received_payload_as_json() {
    let addr = free_loopback_addr();

    let mut listener = Command::new(env!("CARGO_BIN_EXE_framelink"))
        .args([
            "listen",
            &addr.to_string(),
            "--count",
            "1",
            "--format",
            "json",
            "--log-level",
            "off",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listener should spawn");

    let sender = Channel::new(free_loopback_addr());
    connect_with_retry(&sender, addr, Duration::from_secs(10));
    sender.send(b"123456");

    let output = listener
        .wait_with_output()
        .expect("listener should exit after one message");
    sender.close();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("json output should be utf-8");
    let record: serde_json::Value =
        serde_json::from_str(stdout.lines().next().expect("one json line")).expect("valid json");
    assert_eq!(record["size"], 6);
    assert_eq!(record["payload"], "123456");
}

#[test]
fn send_exits_nonzero_when_nothing_listens() {
    let addr = free_loopback_addr();

    let status = Command::new(env!("CARGO_BIN_EXE_framelink"))
        .args(["send", &addr.to_string(), "--data", "x", "--log-level", "off"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("send should run");

    assert!(!status.success());
}

#[test]
fn version_prints_and_succeeds() {
    let output = Command::new(env!("CARGO_BIN_EXE_framelink"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.starts_with("framelink "));
}
