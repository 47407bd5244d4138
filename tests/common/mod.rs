//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use rag_gateway::audit::AuditRecord;
use rag_gateway::auth::TokenIssuer;
use rag_gateway::config::GatewayConfig;
use rag_gateway::http::HttpServer;
use rag_gateway::lifecycle::Shutdown;

pub const SECRET: &str = "integration-secret-at-least-32-bytes";

/// A gateway running on an ephemeral port. Shuts down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    /// Feeds the server's config-update channel, as the file watcher would.
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Defaults with the test secret and a small request timeout.
pub fn base_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.secret = SECRET.to_string();
    config.timeouts.request_secs = 10;
    config.generation.request_timeout_secs = 2;
    config
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (update_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    TestGateway {
        addr,
        config_updates: update_tx,
        shutdown,
    }
}

pub fn mint_token(subject: &str) -> String {
    TokenIssuer::new(SECRET, 600)
        .issue(subject, Some("clinician@example.com"), Some("physician"))
        .unwrap()
        .access_token
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Parse the JSON-lines audit file.
pub fn read_audit_file(path: &Path) -> Vec<AuditRecord> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Read one HTTP request (headers plus `Content-Length` body) off the socket.
async fn drain_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            return;
        }
    }
}

/// JSON body of a successful `generateContent` call.
pub fn provider_answer(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

/// Start a programmable mock generation provider; returns its base URL.
pub async fn start_mock_provider<F, Fut>(f: F) -> String
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        drain_request(&mut socket).await;
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    format!("http://{}", addr)
}
