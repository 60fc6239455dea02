#![cfg(unix)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(15);

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe socket");
    listener.local_addr().unwrap().port()
}

fn spawn_server(source: &str, port: u16) -> (Child, Receiver<String>) {
    let listen = format!("127.0.0.1:{}", port);
    let mut child = Command::new(env!("CARGO_BIN_EXE_bildumilo"))
        .args([source, "-p", listen.as_str()])
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to start server");

    let stdout = child.stdout.take().expect("stdout is piped");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    (child, rx)
}

fn wait_for_line(lines: &Receiver<String>, needle: &str) -> bool {
    wait_for_line_within(lines, needle, TIMEOUT)
}

fn wait_for_line_within(lines: &Receiver<String>, needle: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match lines.recv_timeout(left) {
            Ok(line) if line.contains(needle) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

fn get(port: u16, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok()?;
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
    stream.write_all(request.as_bytes()).ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).ok()?;
    Some(response)
}

fn wait_for_page(port: u16, needle: &str) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if get(port, "/").is_some_and(|body| body.contains(needle)) {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

fn interrupt(child: &Child) {
    let pid = child.id().to_string();
    let status = Command::new("kill")
        .args(["-INT", pid.as_str()])
        .status()
        .expect("Failed to run kill");
    assert!(status.success());
}

#[test]
fn test_serve_regenerates_and_exits_on_interrupt() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = temp.path().join("live.rst");
    fs::write(&source, "Live\n====\n\nFirst version\n").unwrap();
    let port = free_port();

    let (mut child, lines) = spawn_server(source.to_str().unwrap(), port);
    assert!(wait_for_line(&lines, &format!("Serving HTTP on 127.0.0.1 port {}", port)));
    assert!(wait_for_page(port, "First version"));
    assert!(temp.path().join("live").join("index.html").is_file());

    let missing = get(port, "/missing.css").expect("server stopped answering");
    assert!(missing.starts_with("HTTP/1.1 404"));

    assert!(wait_for_line(&lines, "Presentation generated."));
    // The watches are armed shortly after the first build, so keep editing
    let deadline = Instant::now() + TIMEOUT;
    let mut updated = false;
    while !updated && Instant::now() < deadline {
        fs::write(&source, "Live\n====\n\nSecond version\n").unwrap();
        updated = wait_for_line_within(&lines, "update presentation", Duration::from_secs(1))
            && wait_for_page(port, "Second version");
    }
    assert!(updated);

    interrupt(&child);
    assert!(wait_for_line(&lines, "Keyboard interrupt received, exiting."));
    let status = child.wait().expect("Failed to wait for server");
    assert!(status.success());
}
