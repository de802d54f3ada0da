//! Process-level tests for the stdio binary

#![cfg(unix)]

use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

fn spawn_stdio_server() -> Child {
    Command::new(env!("CARGO_BIN_EXE_karmada-mcp-server"))
        .args(["--shutdown-grace-secs", "1", "stdio"])
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap()
}

/// Block until the transport is reading, then keep stderr drained
async fn wait_until_serving(child: &mut Child) {
    let mut stderr = BufReader::new(child.stderr.take().unwrap()).lines();
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(line) = stderr.next_line().await.unwrap() {
            if line.contains("Starting MCP stdio transport") {
                return;
            }
        }
        panic!("server exited before serving");
    })
    .await
    .expect("server did not start");
    tokio::spawn(async move { while let Ok(Some(_)) = stderr.next_line().await {} });
}

#[tokio::test]
async fn test_sigint_exits_while_stdin_stays_open() {
    let mut child = spawn_stdio_server();
    let _stdin = child.stdin.take().unwrap();
    wait_until_serving(&mut child).await;

    let pid = child.id().unwrap().to_string();
    let sent = std::process::Command::new("kill")
        .args(["-INT", &pid])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("still running after SIGINT")
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

#[tokio::test]
async fn test_stdin_eof_exits_after_answering() {
    let mut child = spawn_stdio_server();
    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    wait_until_serving(&mut child).await;

    stdin
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
        .await
        .unwrap();
    drop(stdin);

    let mut lines = BufReader::new(stdout).lines();
    let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("no response")
        .unwrap()
        .unwrap();
    let response: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"], serde_json::json!({}));

    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("still running after stdin closed")
        .unwrap();
    assert_eq!(status.code(), Some(0));
}
