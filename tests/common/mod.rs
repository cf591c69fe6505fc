//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_gateway::config::{BackendConfig, GatewayConfig};
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::load_balancer::BackendRegistry;
use edge_gateway::HttpServer;

/// A mock backend's answer for one request: status, body, extra headers.
pub type MockResponse = (u16, String, Vec<(&'static str, &'static str)>);

/// Start a mock backend that returns a fixed 200 response.
pub async fn spawn_backend(body: &'static str) -> SocketAddr {
    spawn_backend_with(move |_path| (200, body.to_string(), Vec::new())).await
}

/// Start a path-aware programmable mock backend on an ephemeral port.
pub async fn spawn_backend_with<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_mock(listener, handler);
    addr
}

/// Start a path-aware programmable mock backend on a specific address.
pub async fn spawn_backend_at<F>(addr: SocketAddr, handler: F)
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_mock(listener, handler);
}

fn serve_mock<F>(listener: TcpListener, handler: F)
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                loop {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                            if read == buf.len() {
                                break;
                            }
                        }
                        Err(_) => return,
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]).into_owned();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body, extra_headers) = handler(&path);

                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let mut response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    status_text,
                    body.len()
                );
                for (name, value) in extra_headers {
                    response.push_str(&format!("{name}: {value}\r\n"));
                }
                response.push_str("\r\n");
                response.push_str(&body);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Reserve an ephemeral port that nothing listens on.
pub async fn unused_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Backend config entry pointing at a mock backend.
pub fn backend(id: &str, addr: SocketAddr) -> BackendConfig {
    BackendConfig {
        id: id.to_string(),
        url: format!("http://{addr}"),
        weight: 1,
    }
}

/// Baseline gateway config for tests: probes off, `/api` proxied.
pub fn gateway_config(backends: Vec<BackendConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backends = backends;
    config.health_check.enabled = false;
    config.proxy.path_prefix = "/api".to_string();
    config
}

/// A gateway running in the background.
pub struct GatewayHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub registry: Arc<BackendRegistry>,
    pub config_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl GatewayHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the gateway on an ephemeral port and wait until it accepts.
pub async fn start_gateway(config: GatewayConfig) -> GatewayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let registry = server.registry();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_rx, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    GatewayHandle {
        addr,
        shutdown,
        registry,
        config_tx,
    }
}

/// HTTP client that never follows redirects and never pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
